//! Safe zones: the structural patterns marking which text positions an
//! external editor may touch.
//!
//! A profile is evaluated once per document in a single pre-order walk
//! (parent before children, children in sibling order), producing the
//! ordered position list both extraction and injection replay. Positions
//! whose text is empty or all-whitespace are invisible.

use crate::xml::path::{render_segment, NodePath, PathSegment, SegmentName, TextSlot};
use crate::xml::tree::{NamespaceScope, XmlDocument, XmlElement};
use std::collections::HashMap;

/// How a position's text serializes on injection.
///
/// `Verbatim` positions always serialize as a CDATA block, whatever the new
/// text looks like. `Escaped` positions keep the encoding the skeleton
/// already used there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatHint {
    Escaped,
    Verbatim,
}

/// One structural pattern: (namespace URI, local name), matched at any depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeZonePattern {
    pub namespace: Option<String>,
    pub local: String,
    pub hint: FormatHint,
}

impl SafeZonePattern {
    pub fn new(namespace: Option<&str>, local: &str, hint: FormatHint) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            local: local.to_string(),
            hint,
        }
    }
}

pub const CONTENT_NS: &str = "http://purl.org/rss/1.0/modules/content/";
pub const EXCERPT_NS: &str = "http://wordpress.org/export/1.2/excerpt/";
pub const WP_NS: &str = "http://wordpress.org/export/1.2/";

/// A safe-zone profile for one document family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Profile {
    /// Every element's owned text plus every trailing text, any tag.
    Generic,
    /// A fixed pattern list; owned text only.
    Patterns(Vec<SafeZonePattern>),
}

impl Profile {
    /// The WordPress export schema: titles, post bodies, excerpts, and meta
    /// values. Bodies and excerpts are CDATA-encoded by the exporter and must
    /// stay that way.
    pub fn wordpress() -> Self {
        Profile::Patterns(vec![
            SafeZonePattern::new(None, "title", FormatHint::Escaped),
            SafeZonePattern::new(Some(CONTENT_NS), "encoded", FormatHint::Verbatim),
            SafeZonePattern::new(Some(EXCERPT_NS), "encoded", FormatHint::Verbatim),
            SafeZonePattern::new(Some(WP_NS), "meta_value", FormatHint::Escaped),
        ])
    }

    fn includes_trailing(&self) -> bool {
        matches!(self, Profile::Generic)
    }

    fn hint_for(&self, uri: Option<&str>, local: &str) -> Option<FormatHint> {
        match self {
            Profile::Generic => Some(FormatHint::Escaped),
            Profile::Patterns(patterns) => patterns
                .iter()
                .find(|pattern| pattern.namespace.as_deref() == uri && pattern.local == local)
                .map(|pattern| pattern.hint),
        }
    }
}

/// One eligible text position, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPosition {
    pub id: String,
    pub path: NodePath,
    pub context: String,
    /// Raw text at the position, untrimmed.
    pub text: String,
    pub hint: FormatHint,
    /// Whether the skeleton currently encodes this position as CDATA.
    pub uses_cdata: bool,
}

/// Evaluate a profile over a document.
pub fn select(document: &XmlDocument, profile: &Profile) -> Vec<TextPosition> {
    let mut walker = Walker {
        profile,
        scope: NamespaceScope::new(),
        out: Vec::new(),
    };

    let scope = NamespaceScope::new();
    let (root_uri, root_local) = scope.resolve_child(&document.root);
    let root_id = format!("/{}", render_segment(root_uri, root_local, 1, false));
    let root_segment = PathSegment {
        name: segment_name(root_uri, root_local),
        ordinal: 1,
    };
    let root_uri = root_uri.map(str::to_string);
    let root_local = root_local.to_string();

    let mut ancestors: Vec<&XmlElement> = Vec::new();
    walker.visit(
        &document.root,
        root_uri.as_deref(),
        &root_local,
        root_id,
        vec![root_segment],
        &mut ancestors,
    );
    walker.out
}

struct Walker<'p> {
    profile: &'p Profile,
    scope: NamespaceScope,
    out: Vec<TextPosition>,
}

impl<'p> Walker<'p> {
    fn visit<'a>(
        &mut self,
        element: &'a XmlElement,
        uri: Option<&str>,
        local: &str,
        id: String,
        segments: Vec<PathSegment>,
        ancestors: &mut Vec<&'a XmlElement>,
    ) {
        self.scope.push(element);

        if let Some(hint) = self.profile.hint_for(uri, local) {
            if let Some(text) = element.owned_text() {
                if !text.trim().is_empty() {
                    let context = owned_context(local, ancestors, self.profile);
                    self.out.push(TextPosition {
                        id: id.clone(),
                        path: NodePath {
                            segments: segments.clone(),
                            slot: TextSlot::Owned,
                        },
                        context,
                        text,
                        hint,
                        uses_cdata: element.owned_text_uses_cdata(),
                    });
                }
            }
        }

        // Resolved names of all child elements up front: ordinals count by
        // (namespace, local), and `[n]` is rendered only for names a parent
        // holds more than once.
        let child_names: Vec<(Option<String>, String)> = element
            .child_elements()
            .map(|(_, child)| {
                let (uri, local) = self.scope.resolve_child(child);
                (uri.map(str::to_string), local.to_string())
            })
            .collect();

        let mut totals: HashMap<&(Option<String>, String), usize> = HashMap::new();
        for name in &child_names {
            *totals.entry(name).or_insert(0) += 1;
        }
        let mut seen: HashMap<&(Option<String>, String), usize> = HashMap::new();

        ancestors.push(element);

        for (position, (index, child)) in element.child_elements().enumerate() {
            let name = &child_names[position];
            let counter = seen.entry(name).or_insert(0);
            *counter += 1;
            let ordinal = *counter;
            let ambiguous = totals[name] > 1;

            let child_id = format!(
                "{id}/{}",
                render_segment(name.0.as_deref(), &name.1, ordinal, ambiguous)
            );
            let mut child_segments = segments.clone();
            child_segments.push(PathSegment {
                name: segment_name(name.0.as_deref(), &name.1),
                ordinal,
            });

            self.visit(
                child,
                name.0.as_deref(),
                &name.1,
                child_id.clone(),
                child_segments.clone(),
                ancestors,
            );

            if self.profile.includes_trailing() {
                if let Some(text) = element.trailing_text(index) {
                    if !text.trim().is_empty() {
                        self.out.push(TextPosition {
                            id: format!("{child_id}#tail"),
                            path: NodePath {
                                segments: child_segments,
                                slot: TextSlot::Trailing,
                            },
                            context: format!("after {}", name.1),
                            text,
                            hint: FormatHint::Escaped,
                            uses_cdata: element.trailing_text_uses_cdata(index),
                        });
                    }
                }
            }
        }

        ancestors.pop();
        self.scope.pop();
    }
}

fn segment_name(uri: Option<&str>, local: &str) -> SegmentName {
    match uri {
        Some(uri) => SegmentName::Clark {
            uri: uri.to_string(),
            local: local.to_string(),
        },
        None => SegmentName::Local(local.to_string()),
    }
}

/// Display context: the local name, qualified by the nearest titled
/// ancestor. The WordPress profile only consults the enclosing `<item>`.
fn owned_context(local: &str, ancestors: &[&XmlElement], profile: &Profile) -> String {
    let wordpress_style = matches!(profile, Profile::Patterns(_));

    for ancestor in ancestors.iter().rev() {
        if wordpress_style {
            let (_, ancestor_local) = crate::xml::tree::split_qname(&ancestor.name);
            if ancestor_local != "item" {
                continue;
            }
        }
        if let Some(title) = titled(ancestor) {
            return format!("{local} in: {}", truncate(&title, 50));
        }
        if wordpress_style {
            break;
        }
    }

    local.to_string()
}

fn titled(element: &XmlElement) -> Option<String> {
    for (_, child) in element.child_elements() {
        let (_, local) = crate::xml::tree::split_qname(&child.name);
        if local == "title" {
            let text = child.owned_text()?;
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }
            return Some(trimmed.to_string());
        }
    }
    None
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
