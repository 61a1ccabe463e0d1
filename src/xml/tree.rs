//! Lossless XML document tree.
//!
//! Parsing goes through quick-xml's event reader; the tree keeps everything
//! the serializer needs to reproduce the input: raw qualified names, attribute
//! order, CDATA vs escaped text, comments, processing instructions, the
//! declaration/doctype prolog, and self-closing form. Serialization is
//! hand-written so none of that is renormalized behind our back.

use crate::error::ParseError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// A node outside the root element: declaration, doctype, comments, PIs, and
/// the whitespace between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Misc {
    Declaration(String),
    DocType(String),
    Comment(String),
    Instruction(String),
    Whitespace(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
    Instruction(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// Qualified name exactly as written (`content:encoded`).
    pub name: String,
    /// Attributes in document order, values unescaped.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    /// Parsed from `<tag/>`; serialized back the same way while childless.
    pub self_closing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub prolog: Vec<Misc>,
    pub root: XmlElement,
    pub epilog: Vec<Misc>,
}

impl XmlDocument {
    pub fn parse(source: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(source).map_err(|err| ParseError::InvalidUtf8 {
            message: err.to_string(),
        })?;

        let mut reader = Reader::from_str(text);
        let mut prolog: Vec<Misc> = Vec::new();
        let mut epilog: Vec<Misc> = Vec::new();
        let mut root: Option<XmlElement> = None;
        let mut stack: Vec<XmlElement> = Vec::new();

        loop {
            let event = reader
                .read_event()
                .map_err(|err| ParseError::invalid_xml(err.to_string()))?;

            match event {
                Event::Decl(e) => {
                    let raw = String::from_utf8_lossy(&e).into_owned();
                    prolog.push(Misc::Declaration(raw));
                }
                Event::DocType(e) => {
                    let raw = String::from_utf8_lossy(&e).into_owned();
                    prolog.push(Misc::DocType(raw));
                }
                Event::PI(e) => {
                    let raw = String::from_utf8_lossy(&e).into_owned();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(XmlNode::Instruction(raw)),
                        None if root.is_none() => prolog.push(Misc::Instruction(raw)),
                        None => epilog.push(Misc::Instruction(raw)),
                    }
                }
                Event::Comment(e) => {
                    let raw = String::from_utf8_lossy(&e).into_owned();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(XmlNode::Comment(raw)),
                        None if root.is_none() => prolog.push(Misc::Comment(raw)),
                        None => epilog.push(Misc::Comment(raw)),
                    }
                }
                Event::Text(e) => {
                    let unescaped = e
                        .unescape()
                        .map_err(|err| ParseError::invalid_xml(err.to_string()))?
                        .into_owned();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(XmlNode::Text(unescaped)),
                        None => {
                            if !unescaped.trim().is_empty() {
                                return Err(ParseError::invalid_xml(
                                    "character data outside the document root",
                                ));
                            }
                            if root.is_none() {
                                prolog.push(Misc::Whitespace(unescaped));
                            } else {
                                epilog.push(Misc::Whitespace(unescaped));
                            }
                        }
                    }
                }
                Event::CData(e) => {
                    let raw = String::from_utf8_lossy(&e).into_owned();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(XmlNode::CData(raw)),
                        None => {
                            return Err(ParseError::invalid_xml(
                                "CDATA section outside the document root",
                            ));
                        }
                    }
                }
                Event::Start(e) => {
                    if root.is_some() && stack.is_empty() {
                        return Err(ParseError::invalid_xml("multiple root elements"));
                    }
                    stack.push(element_from_start(&e)?);
                }
                Event::Empty(e) => {
                    if root.is_some() && stack.is_empty() {
                        return Err(ParseError::invalid_xml("multiple root elements"));
                    }
                    let mut element = element_from_start(&e)?;
                    element.self_closing = true;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(XmlNode::Element(element)),
                        None => root = Some(element),
                    }
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| ParseError::invalid_xml("unexpected closing tag"))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(XmlNode::Element(element)),
                        None => root = Some(element),
                    }
                }
                Event::Eof => break,
            }
        }

        if let Some(open) = stack.last() {
            return Err(ParseError::invalid_xml(format!(
                "unclosed element: {}",
                open.name
            )));
        }

        let root = root.ok_or_else(|| ParseError::invalid_xml("no root element"))?;

        Ok(Self {
            prolog,
            root,
            epilog,
        })
    }

    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        for misc in &self.prolog {
            write_misc(&mut out, misc);
        }
        write_element(&mut out, &self.root);
        for misc in &self.epilog {
            write_misc(&mut out, misc);
        }
        out
    }
}

fn element_from_start(event: &BytesStart) -> Result<XmlElement, ParseError> {
    let name = String::from_utf8_lossy(event.name().as_ref()).into_owned();
    let mut attributes = Vec::new();

    for attribute in event.attributes() {
        let attribute = attribute.map_err(|err| ParseError::invalid_xml(err.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|err| ParseError::invalid_xml(err.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }

    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
        self_closing: false,
    })
}

impl XmlElement {
    /// Length of the run of character-data nodes before the first non-text
    /// child. Comments and PIs terminate the run so edits never swallow them.
    fn leading_text_len(&self) -> usize {
        self.children
            .iter()
            .take_while(|child| matches!(child, XmlNode::Text(_) | XmlNode::CData(_)))
            .count()
    }

    fn text_run_at(&self, start: usize) -> usize {
        self.children[start..]
            .iter()
            .take_while(|child| matches!(child, XmlNode::Text(_) | XmlNode::CData(_)))
            .count()
    }

    /// Character data before the first non-text child, if any exists.
    pub fn owned_text(&self) -> Option<String> {
        let len = self.leading_text_len();
        if len == 0 {
            return None;
        }
        Some(concat_text(&self.children[..len]))
    }

    pub fn owned_text_uses_cdata(&self) -> bool {
        let len = self.leading_text_len();
        self.children[..len]
            .iter()
            .any(|child| matches!(child, XmlNode::CData(_)))
    }

    /// Replace the element's leading character data.
    pub fn set_owned_text(&mut self, text: &str, verbatim: bool) {
        let len = self.leading_text_len();
        let node = make_text_node(text, verbatim);
        self.children.splice(0..len, std::iter::once(node));
        self.self_closing = false;
    }

    /// Character data following the child at `child_index`, up to the next
    /// non-text sibling.
    pub fn trailing_text(&self, child_index: usize) -> Option<String> {
        let start = child_index + 1;
        if start > self.children.len() {
            return None;
        }
        let len = self.text_run_at(start);
        if len == 0 {
            return None;
        }
        Some(concat_text(&self.children[start..start + len]))
    }

    pub fn trailing_text_uses_cdata(&self, child_index: usize) -> bool {
        let start = child_index + 1;
        if start > self.children.len() {
            return false;
        }
        let len = self.text_run_at(start);
        self.children[start..start + len]
            .iter()
            .any(|child| matches!(child, XmlNode::CData(_)))
    }

    /// Replace the character data following the child at `child_index`.
    pub fn set_trailing_text(&mut self, child_index: usize, text: &str, verbatim: bool) {
        let start = child_index + 1;
        if start > self.children.len() {
            return;
        }
        let len = self.text_run_at(start);
        let node = make_text_node(text, verbatim);
        self.children.splice(start..start + len, std::iter::once(node));
    }

    /// Child elements with their indices into `children`.
    pub fn child_elements(&self) -> impl Iterator<Item = (usize, &XmlElement)> {
        self.children
            .iter()
            .enumerate()
            .filter_map(|(index, child)| match child {
                XmlNode::Element(element) => Some((index, element)),
                _ => None,
            })
    }
}

fn concat_text(nodes: &[XmlNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            XmlNode::Text(t) | XmlNode::CData(t) => out.push_str(t),
            _ => {}
        }
    }
    out
}

fn make_text_node(text: &str, verbatim: bool) -> XmlNode {
    if verbatim {
        XmlNode::CData(text.to_string())
    } else {
        XmlNode::Text(text.to_string())
    }
}

/// Split a qualified name into (prefix, local part).
pub fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() => (Some(prefix), local),
        _ => (None, name),
    }
}

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// In-scope namespace declarations along a descent path.
///
/// One frame per element; a frame holds the element's own `xmlns`/`xmlns:p`
/// declarations. An empty URI undeclares (per Namespaces in XML 1.1 for
/// prefixes, and the default-namespace reset of 1.0).
#[derive(Debug, Default)]
pub struct NamespaceScope {
    frames: Vec<Vec<(String, String)>>,
}

impl NamespaceScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, element: &XmlElement) {
        let mut frame = Vec::new();
        for (key, value) in &element.attributes {
            if key == "xmlns" {
                frame.push((String::new(), value.clone()));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                frame.push((prefix.to_string(), value.clone()));
            }
        }
        self.frames.push(frame);
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    /// Resolve a prefix (`None` = default namespace) to a URI.
    pub fn resolve_prefix(&self, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NS);
        }
        let wanted = prefix.unwrap_or("");
        for frame in self.frames.iter().rev() {
            for (declared, uri) in frame.iter().rev() {
                if declared == wanted {
                    if uri.is_empty() {
                        return None;
                    }
                    return Some(uri);
                }
            }
        }
        None
    }

    /// Resolved name of a child element that has not been pushed yet: the
    /// child's own declarations take precedence over the current scope.
    pub fn resolve_child<'a>(&'a self, child: &'a XmlElement) -> (Option<&'a str>, &'a str) {
        let (prefix, local) = split_qname(&child.name);
        if prefix == Some("xml") {
            return (Some(XML_NS), local);
        }
        let wanted = prefix.unwrap_or("");
        for (key, value) in child.attributes.iter().rev() {
            let declared = if key == "xmlns" {
                ""
            } else if let Some(p) = key.strip_prefix("xmlns:") {
                p
            } else {
                continue;
            };
            if declared == wanted {
                if value.is_empty() {
                    return (None, local);
                }
                return (Some(value.as_str()), local);
            }
        }
        (self.resolve_prefix(prefix), local)
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_attr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn write_misc(out: &mut String, misc: &Misc) {
    match misc {
        Misc::Declaration(raw) => {
            out.push_str("<?");
            out.push_str(raw);
            out.push_str("?>");
        }
        Misc::DocType(raw) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(raw);
            out.push('>');
        }
        Misc::Comment(raw) => {
            out.push_str("<!--");
            out.push_str(raw);
            out.push_str("-->");
        }
        Misc::Instruction(raw) => {
            out.push_str("<?");
            out.push_str(raw);
            out.push_str("?>");
        }
        Misc::Whitespace(raw) => out.push_str(raw),
    }
}

fn write_element(out: &mut String, element: &XmlElement) {
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }

    if element.children.is_empty() && element.self_closing {
        out.push_str("/>");
        return;
    }

    out.push('>');
    for child in &element.children {
        match child {
            XmlNode::Element(child) => write_element(out, child),
            XmlNode::Text(text) => out.push_str(&escape_text(text)),
            XmlNode::CData(text) => write_cdata(out, text),
            XmlNode::Comment(raw) => {
                out.push_str("<!--");
                out.push_str(raw);
                out.push_str("-->");
            }
            XmlNode::Instruction(raw) => {
                out.push_str("<?");
                out.push_str(raw);
                out.push_str("?>");
            }
        }
    }
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

/// Write a CDATA block; a `]]>` inside the text splits it into adjacent
/// sections so the output stays well-formed.
fn write_cdata(out: &mut String, text: &str) {
    out.push_str("<![CDATA[");
    out.push_str(&text.replace("]]>", "]]]]><![CDATA[>"));
    out.push_str("]]>");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> XmlDocument {
        XmlDocument::parse(source.as_bytes()).expect("parse")
    }

    #[test]
    fn round_trips_declaration_and_attributes() {
        let source = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<root b=\"2\" a=\"1\"><leaf/></root>";
        let doc = parse(source);
        assert_eq!(doc.to_xml_string(), source);
    }

    #[test]
    fn round_trips_comments_and_instructions() {
        let source = "<!-- header --><root><?target data?><a>x</a><!-- inner --></root>";
        let doc = parse(source);
        assert_eq!(doc.to_xml_string(), source);
    }

    #[test]
    fn round_trips_cdata() {
        let source = "<root><body><![CDATA[<b>raw</b>]]></body></root>";
        let doc = parse(source);
        assert_eq!(doc.to_xml_string(), source);
    }

    #[test]
    fn owned_and_trailing_text() {
        let doc = parse("<p>lead<b>x</b>tail<c>y</c></p>");
        assert_eq!(doc.root.owned_text().as_deref(), Some("lead"));

        let (b_index, b) = doc.root.child_elements().next().unwrap();
        assert_eq!(b.name, "b");
        assert_eq!(doc.root.trailing_text(b_index).as_deref(), Some("tail"));

        let (c_index, _) = doc.root.child_elements().nth(1).unwrap();
        assert_eq!(doc.root.trailing_text(c_index), None);
    }

    #[test]
    fn set_owned_text_replaces_leading_run_only() {
        let mut doc = parse("<p>lead<b>x</b>tail</p>");
        doc.root.set_owned_text("LEAD", false);
        assert_eq!(doc.root.owned_text().as_deref(), Some("LEAD"));
        assert_eq!(doc.to_xml_string(), "<p>LEAD<b>x</b>tail</p>");
    }

    #[test]
    fn set_trailing_text_targets_one_sibling_gap() {
        let mut doc = parse("<p><b>x</b>one<b>y</b>two</p>");
        let indices: Vec<usize> = doc.root.child_elements().map(|(i, _)| i).collect();
        doc.root.set_trailing_text(indices[1], "TWO", false);
        assert_eq!(doc.to_xml_string(), "<p><b>x</b>one<b>y</b>TWO</p>");
    }

    #[test]
    fn cdata_split_stays_well_formed() {
        let mut out = String::new();
        write_cdata(&mut out, "a]]>b");
        assert_eq!(out, "<![CDATA[a]]]]><![CDATA[>b]]>");
    }

    #[test]
    fn text_entities_unescape_and_reescape() {
        let source = "<a>fish &amp; chips &lt;now&gt;</a>";
        let doc = parse(source);
        assert_eq!(
            doc.root.owned_text().as_deref(),
            Some("fish & chips <now>")
        );
        assert_eq!(doc.to_xml_string(), source);
    }

    #[test]
    fn namespace_scope_resolves_nested_defaults() {
        let doc = parse("<root xmlns=\"urn:a\"><child xmlns=\"urn:b\"/><plain/></root>");
        let mut scope = NamespaceScope::new();
        scope.push(&doc.root);
        assert_eq!(scope.resolve_prefix(None), Some("urn:a"));

        let (_, child) = doc.root.child_elements().next().unwrap();
        let (uri, local) = scope.resolve_child(child);
        assert_eq!(uri, Some("urn:b"));
        assert_eq!(local, "child");

        let (_, plain) = doc.root.child_elements().nth(1).unwrap();
        let (uri, _) = scope.resolve_child(plain);
        assert_eq!(uri, Some("urn:a"));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(XmlDocument::parse(b"<xml><broken>").is_err());
        assert!(XmlDocument::parse(b"no markup at all").is_err());
        assert!(XmlDocument::parse(b"<a></a><b></b>").is_err());
    }

    #[test]
    fn self_closing_is_preserved_until_text_is_added() {
        let mut doc = parse("<root><empty/></root>");
        assert_eq!(doc.to_xml_string(), "<root><empty/></root>");

        if let XmlNode::Element(empty) = &mut doc.root.children[0] {
            empty.set_owned_text("filled", false);
        }
        assert_eq!(doc.to_xml_string(), "<root><empty>filled</empty></root>");
    }
}
