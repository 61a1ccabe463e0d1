//! Location identifiers for text-bearing positions in an XML tree.
//!
//! An identifier is a root-to-node chain of `(name, ordinal)` segments,
//! rendered getpath-style: `/rss/channel/item[2]/title`. The ordinal counts
//! same-name siblings in document order and is written only when the parent
//! holds more than one; names are resolved through in-scope namespace
//! declarations, so the canonical spelling of a namespaced segment is Clark
//! notation (`{uri}local`), never a prefix. Trailing text (character data
//! between a child and its next sibling) is the child's identifier plus
//! `#tail`; anchoring to the child's own ordinal keeps trailing positions of
//! same-tag siblings distinct.
//!
//! Identifiers are a pure function of structural position. Content never
//! participates, so an unchanged skeleton always reproduces the same set.

use crate::xml::tree::{split_qname, NamespaceScope, XmlElement, XmlNode};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("empty location identifier")]
    Empty,

    #[error("invalid location identifier '{input}': {message}")]
    Invalid { input: String, message: String },
}

impl PathError {
    fn invalid(input: &str, message: impl Into<String>) -> Self {
        PathError::Invalid {
            input: input.to_string(),
            message: message.into(),
        }
    }
}

/// One spelling of a segment name. `compute` emits `Clark` or `Local`;
/// `Prefixed` appears only in identifiers written by serializers that can
/// only express prefixes, and is resolved against the declarations in scope
/// during descent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentName {
    Clark { uri: String, local: String },
    Prefixed { prefix: String, local: String },
    Local(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub name: SegmentName,
    /// 1-based position among same-name siblings.
    pub ordinal: usize,
}

/// Whether the identifier addresses an element's own text or the text
/// trailing it inside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSlot {
    Owned,
    Trailing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePath {
    pub segments: Vec<PathSegment>,
    pub slot: TextSlot,
}

impl NodePath {
    pub fn parse(input: &str) -> Result<Self, PathError> {
        if input.is_empty() {
            return Err(PathError::Empty);
        }

        let (body, slot) = match input.strip_suffix("#tail") {
            Some(body) => (body, TextSlot::Trailing),
            None => (input, TextSlot::Owned),
        };

        if !body.starts_with('/') {
            return Err(PathError::invalid(input, "identifier must start with '/'"));
        }

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut in_braces = false;

        for ch in body[1..].chars() {
            match ch {
                '{' if !in_braces => {
                    in_braces = true;
                    current.push(ch);
                }
                '}' if in_braces => {
                    in_braces = false;
                    current.push(ch);
                }
                '/' if !in_braces => {
                    segments.push(parse_segment(input, &current)?);
                    current.clear();
                }
                other => current.push(other),
            }
        }

        if in_braces {
            return Err(PathError::invalid(input, "unterminated namespace brace"));
        }
        segments.push(parse_segment(input, &current)?);

        Ok(Self { segments, slot })
    }
}

fn parse_segment(input: &str, raw: &str) -> Result<PathSegment, PathError> {
    if raw.is_empty() {
        return Err(PathError::invalid(input, "empty path segment"));
    }

    let (name_part, ordinal) = match raw.strip_suffix(']') {
        Some(rest) => {
            let open = rest
                .rfind('[')
                .ok_or_else(|| PathError::invalid(input, "unmatched ']' in segment"))?;
            let ordinal: usize = rest[open + 1..]
                .parse()
                .map_err(|_| PathError::invalid(input, "ordinal is not a number"))?;
            if ordinal == 0 {
                return Err(PathError::invalid(input, "ordinals are 1-based"));
            }
            (&rest[..open], ordinal)
        }
        None => (raw, 1),
    };

    if name_part.is_empty() {
        return Err(PathError::invalid(input, "segment has no name"));
    }

    let name = if let Some(rest) = name_part.strip_prefix('{') {
        let (uri, local) = rest
            .split_once('}')
            .ok_or_else(|| PathError::invalid(input, "unterminated namespace brace"))?;
        if local.is_empty() {
            return Err(PathError::invalid(input, "namespaced segment has no local name"));
        }
        SegmentName::Clark {
            uri: uri.to_string(),
            local: local.to_string(),
        }
    } else {
        match split_qname(name_part) {
            (Some(prefix), local) => SegmentName::Prefixed {
                prefix: prefix.to_string(),
                local: local.to_string(),
            },
            (None, local) => SegmentName::Local(local.to_string()),
        }
    };

    Ok(PathSegment { name, ordinal })
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/")?;
            match &segment.name {
                SegmentName::Clark { uri, local } => write!(f, "{{{uri}}}{local}")?,
                SegmentName::Prefixed { prefix, local } => write!(f, "{prefix}:{local}")?,
                SegmentName::Local(local) => write!(f, "{local}")?,
            }
            if segment.ordinal != 1 {
                write!(f, "[{}]", segment.ordinal)?;
            }
        }
        if self.slot == TextSlot::Trailing {
            write!(f, "#tail")?;
        }
        Ok(())
    }
}

/// Canonical rendering of one computed segment, used by the selector walk.
pub fn render_segment(uri: Option<&str>, local: &str, ordinal: usize, ambiguous: bool) -> String {
    let mut out = String::new();
    match uri {
        Some(uri) => {
            out.push('{');
            out.push_str(uri);
            out.push('}');
            out.push_str(local);
        }
        None => out.push_str(local),
    }
    if ambiguous {
        out.push('[');
        out.push_str(&ordinal.to_string());
        out.push(']');
    }
    out
}

/// A resolved read-only text position.
pub enum ResolvedText<'a> {
    Owned(&'a XmlElement),
    Trailing {
        parent: &'a XmlElement,
        child_index: usize,
    },
}

/// A resolved mutable text position.
pub enum ResolvedTextMut<'a> {
    Owned(&'a mut XmlElement),
    Trailing {
        parent: &'a mut XmlElement,
        child_index: usize,
    },
}

/// Locate the element a path addresses as a chain of indices into each
/// ancestor's `children` vector. `None` when the path does not match the
/// tree. This is the single matching algorithm both resolve flavors and id
/// canonicalization share.
pub fn locate(root: &XmlElement, path: &NodePath) -> Option<Vec<usize>> {
    let first = path.segments.first()?;

    let mut scope = NamespaceScope::new();
    if !segment_matches(first, root, &scope) || first.ordinal != 1 {
        return None;
    }
    scope.push(root);

    let mut indices = Vec::with_capacity(path.segments.len() - 1);
    let mut current = root;

    for segment in &path.segments[1..] {
        let mut seen = 0usize;
        let mut found = None;
        for (index, child) in current.child_elements() {
            if segment_matches(segment, child, &scope) {
                seen += 1;
                if seen == segment.ordinal {
                    found = Some((index, child));
                    break;
                }
            }
        }
        let (index, child) = found?;
        indices.push(index);
        scope.push(child);
        current = child;
    }

    Some(indices)
}

fn segment_matches(segment: &PathSegment, element: &XmlElement, scope: &NamespaceScope) -> bool {
    let (element_uri, element_local) = scope.resolve_child(element);
    match &segment.name {
        SegmentName::Clark { uri, local } => {
            element_uri == Some(uri.as_str()) && element_local == local.as_str()
        }
        SegmentName::Local(local) => element_uri.is_none() && element_local == local.as_str(),
        SegmentName::Prefixed { prefix, local } => {
            if element_local != local.as_str() {
                return false;
            }
            // Resolve the identifier's prefix through the declarations in
            // scope (the element's own included); fall back to a textual
            // prefix match when the prefix is declared nowhere.
            let mut lookup = NamespaceScope::new();
            lookup.push(element);
            let segment_uri = lookup
                .resolve_prefix(Some(prefix))
                .or_else(|| scope.resolve_prefix(Some(prefix)));
            match segment_uri {
                Some(uri) => element_uri == Some(uri),
                None => split_qname(&element.name).0 == Some(prefix.as_str()),
            }
        }
    }
}

/// Resolve a path against a tree. The contract: for any position the
/// selector computed from an unchanged tree, resolution returns exactly
/// that position.
pub fn resolve<'a>(root: &'a XmlElement, path: &NodePath) -> Option<ResolvedText<'a>> {
    let indices = locate(root, path)?;
    match path.slot {
        TextSlot::Owned => {
            let mut current = root;
            for &index in &indices {
                current = match &current.children[index] {
                    XmlNode::Element(element) => element,
                    _ => return None,
                };
            }
            Some(ResolvedText::Owned(current))
        }
        TextSlot::Trailing => {
            let (&last, ancestors) = indices.split_last()?;
            let mut current = root;
            for &index in ancestors {
                current = match &current.children[index] {
                    XmlNode::Element(element) => element,
                    _ => return None,
                };
            }
            Some(ResolvedText::Trailing {
                parent: current,
                child_index: last,
            })
        }
    }
}

pub fn resolve_mut<'a>(root: &'a mut XmlElement, path: &NodePath) -> Option<ResolvedTextMut<'a>> {
    let indices = locate(root, path)?;
    match path.slot {
        TextSlot::Owned => {
            let mut current = root;
            for &index in &indices {
                current = match &mut current.children[index] {
                    XmlNode::Element(element) => element,
                    _ => return None,
                };
            }
            Some(ResolvedTextMut::Owned(current))
        }
        TextSlot::Trailing => {
            let (&last, ancestors) = indices.split_last()?;
            let mut current = root;
            for &index in ancestors {
                current = match &mut current.children[index] {
                    XmlNode::Element(element) => element,
                    _ => return None,
                };
            }
            Some(ResolvedTextMut::Trailing {
                parent: current,
                child_index: last,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::tree::XmlDocument;

    fn parse_doc(source: &str) -> XmlDocument {
        XmlDocument::parse(source.as_bytes()).expect("parse")
    }

    #[test]
    fn parse_plain_segments() {
        let path = NodePath::parse("/rss/channel/item[2]/title").unwrap();
        assert_eq!(path.segments.len(), 4);
        assert_eq!(path.slot, TextSlot::Owned);
        assert_eq!(path.segments[2].ordinal, 2);
        assert_eq!(path.segments[3].ordinal, 1);
        assert_eq!(path.segments[3].name, SegmentName::Local("title".to_string()));
    }

    #[test]
    fn parse_clark_segment_keeps_slashes_in_uri() {
        let path =
            NodePath::parse("/rss/item/{http://purl.org/rss/1.0/modules/content/}encoded").unwrap();
        assert_eq!(path.segments.len(), 3);
        assert_eq!(
            path.segments[2].name,
            SegmentName::Clark {
                uri: "http://purl.org/rss/1.0/modules/content/".to_string(),
                local: "encoded".to_string(),
            }
        );
    }

    #[test]
    fn parse_trailing_variant() {
        let path = NodePath::parse("/root/p/a[2]#tail").unwrap();
        assert_eq!(path.slot, TextSlot::Trailing);
        assert_eq!(path.segments.last().unwrap().ordinal, 2);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(NodePath::parse("").is_err());
        assert!(NodePath::parse("relative/path").is_err());
        assert!(NodePath::parse("/a//b").is_err());
        assert!(NodePath::parse("/a/b[0]").is_err());
        assert!(NodePath::parse("/a/b[x]").is_err());
        assert!(NodePath::parse("/a/{urn:open").is_err());
    }

    #[test]
    fn display_round_trips() {
        for id in [
            "/rss/channel/item[2]/title",
            "/a/{urn:ns}b[3]",
            "/root/p/a[2]#tail",
            "/doc/content:encoded",
        ] {
            let path = NodePath::parse(id).unwrap();
            assert_eq!(path.to_string(), id);
        }
    }

    #[test]
    fn resolve_by_ordinal() {
        let doc = parse_doc("<a><b>one</b><b>two</b></a>");
        let path = NodePath::parse("/a/b[2]").unwrap();
        match resolve(&doc.root, &path) {
            Some(ResolvedText::Owned(element)) => {
                assert_eq!(element.owned_text().as_deref(), Some("two"));
            }
            _ => panic!("expected owned resolution"),
        }
    }

    #[test]
    fn missing_ordinal_reads_as_one() {
        let doc = parse_doc("<a><b>one</b><b>two</b></a>");
        let path = NodePath::parse("/a/b").unwrap();
        match resolve(&doc.root, &path) {
            Some(ResolvedText::Owned(element)) => {
                assert_eq!(element.owned_text().as_deref(), Some("one"));
            }
            _ => panic!("expected owned resolution"),
        }
    }

    #[test]
    fn resolve_clark_and_prefixed_spellings_agree() {
        let doc = parse_doc(
            "<rss xmlns:content=\"http://purl.org/rss/1.0/modules/content/\">\
             <item><content:encoded>body</content:encoded></item></rss>",
        );

        let clark =
            NodePath::parse("/rss/item/{http://purl.org/rss/1.0/modules/content/}encoded").unwrap();
        let prefixed = NodePath::parse("/rss/item/content:encoded").unwrap();

        for path in [clark, prefixed] {
            match resolve(&doc.root, &path) {
                Some(ResolvedText::Owned(element)) => {
                    assert_eq!(element.owned_text().as_deref(), Some("body"));
                }
                _ => panic!("expected owned resolution for {path}"),
            }
        }
    }

    #[test]
    fn ordinals_count_by_resolved_name_not_prefix() {
        // Two prefixes bound to the same URI are the same name.
        let doc = parse_doc(
            "<r xmlns:a=\"urn:x\" xmlns:b=\"urn:x\">\
             <a:k>first</a:k><b:k>second</b:k></r>",
        );
        let path = NodePath::parse("/r/{urn:x}k[2]").unwrap();
        match resolve(&doc.root, &path) {
            Some(ResolvedText::Owned(element)) => {
                assert_eq!(element.owned_text().as_deref(), Some("second"));
            }
            _ => panic!("expected owned resolution"),
        }
    }

    #[test]
    fn trailing_resolves_to_parent_and_index() {
        let doc = parse_doc("<p><a>x</a>one<a>y</a>two</p>");
        let path = NodePath::parse("/p/a[2]#tail").unwrap();
        match resolve(&doc.root, &path) {
            Some(ResolvedText::Trailing {
                parent,
                child_index,
            }) => {
                assert_eq!(parent.trailing_text(child_index).as_deref(), Some("two"));
            }
            _ => panic!("expected trailing resolution"),
        }
    }

    #[test]
    fn unknown_paths_do_not_resolve() {
        let doc = parse_doc("<a><b>Hello</b><c>World</c></a>");
        for id in ["/a/z[1]", "/x/b", "/a/b[2]", "/a/b/c"] {
            let path = NodePath::parse(id).unwrap();
            assert!(resolve(&doc.root, &path).is_none(), "{id} resolved");
        }
    }
}
