//! Extraction, injection, and validation over XML skeletons.

use crate::adapter::DocumentAdapter;
use crate::differ::{self, AddressEntry};
use crate::error::ParseError;
use crate::item::{EditSet, ExtractionItem};
use crate::report::{IssueKind, ValidationReport};
use crate::xml::path::{locate, resolve_mut, NodePath, ResolvedTextMut};
use crate::xml::safezone::{select, FormatHint, Profile, TextPosition};
use crate::xml::tree::XmlDocument;
use std::collections::{HashMap, HashSet};

/// One adapter per XML profile; the profile is the only state, so the
/// adapter is freely shared across concurrent calls.
#[derive(Debug, Clone)]
pub struct XmlAdapter {
    profile: Profile,
}

impl XmlAdapter {
    /// Document-agnostic profile: every non-blank text position.
    pub fn generic() -> Self {
        Self {
            profile: Profile::Generic,
        }
    }

    /// WordPress export profile.
    pub fn wordpress() -> Self {
        Self {
            profile: Profile::wordpress(),
        }
    }

    pub fn with_profile(profile: Profile) -> Self {
        Self { profile }
    }

    /// Map an identifier in a foreign spelling (prefixed segments, explicit
    /// `[1]` ordinals) onto the canonical id of the position it resolves to.
    fn canonicalize(
        &self,
        document: &XmlDocument,
        positions: &[TextPosition],
        id: &str,
    ) -> Option<String> {
        let path = NodePath::parse(id).ok()?;
        let target = locate(&document.root, &path)?;
        positions
            .iter()
            .find(|position| {
                position.path.slot == path.slot
                    && locate(&document.root, &position.path).as_ref() == Some(&target)
            })
            .map(|position| position.id.clone())
    }
}

impl DocumentAdapter for XmlAdapter {
    fn extract(&self, source: &[u8]) -> Result<Vec<ExtractionItem>, ParseError> {
        let document = XmlDocument::parse(source)?;
        let positions = select(&document, &self.profile);
        Ok(positions
            .into_iter()
            .map(|position| ExtractionItem::new(position.id, position.context, position.text))
            .collect())
    }

    fn inject(&self, skeleton: &[u8], edits: &EditSet) -> Result<Vec<u8>, ParseError> {
        let mut document = XmlDocument::parse(skeleton)?;
        let positions = select(&document, &self.profile);

        let canonical: HashSet<&str> = positions.iter().map(|p| p.id.as_str()).collect();
        let mut pending: HashMap<String, &str> = HashMap::new();
        for (id, text) in edits.iter() {
            if canonical.contains(id) {
                pending.insert(id.to_string(), text);
            } else if let Some(canon) = self.canonicalize(&document, &positions, id) {
                // Prefixed or ordinal-padded spelling of a known position.
                pending.entry(canon).or_insert(text);
            }
            // Anything else is an unknown address: skipped by design, so an
            // editor may submit a partial or stale edit set.
        }

        for position in &positions {
            let new_text = match pending.get(&position.id) {
                Some(text) => *text,
                None => continue,
            };
            let verbatim = position.hint == FormatHint::Verbatim || position.uses_cdata;
            match resolve_mut(&mut document.root, &position.path) {
                Some(ResolvedTextMut::Owned(element)) => {
                    element.set_owned_text(new_text, verbatim);
                }
                Some(ResolvedTextMut::Trailing {
                    parent,
                    child_index,
                }) => {
                    parent.set_trailing_text(child_index, new_text, verbatim);
                }
                None => {}
            }
        }

        Ok(document.to_xml_string().into_bytes())
    }

    fn validate(&self, skeleton: &[u8], modifications: &[u8]) -> ValidationReport {
        let document = match XmlDocument::parse(skeleton) {
            Ok(document) => document,
            Err(err) => {
                return ValidationReport::parse_failure(IssueKind::InvalidXml, err.to_string());
            }
        };
        let positions = select(&document, &self.profile);

        let mut records = match differ::parse_modifications(modifications) {
            Ok(records) => records,
            Err(err) => {
                return ValidationReport::parse_failure(IssueKind::InvalidJson, err.to_string());
            }
        };

        // Recognize foreign spellings before reconciliation so they match
        // the canonical address set instead of reading as unknown.
        let canonical: HashSet<&str> = positions.iter().map(|p| p.id.as_str()).collect();
        for record in &mut records {
            if let Some(id) = &record.id {
                if !canonical.contains(id.as_str()) {
                    if let Some(canon) = self.canonicalize(&document, &positions, id) {
                        record.id = Some(canon);
                    }
                }
            }
        }

        let addresses: Vec<AddressEntry> = positions
            .into_iter()
            .map(|position| AddressEntry {
                id: position.id,
                context: position.context,
                text: position.text,
            })
            .collect();

        differ::reconcile(&addresses, &records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::flat_map;

    const ARTICLE: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
        <article>\n    <title>The Future of AI</title>\n    <author>John Doe</author>\n    \
        <content>\n        <paragraph>First paragraph.</paragraph>\n        \
        <paragraph>Second paragraph.</paragraph>\n    </content>\n</article>";

    #[test]
    fn extraction_is_deterministic() {
        let adapter = XmlAdapter::generic();
        let first = adapter.extract(ARTICLE.as_bytes()).unwrap();
        let second = adapter.extract(ARTICLE.as_bytes()).unwrap();
        assert_eq!(first, second);
        assert_eq!(flat_map(&first), flat_map(&second));
    }

    #[test]
    fn extracts_in_document_order_with_contexts() {
        let adapter = XmlAdapter::generic();
        let items = adapter.extract(ARTICLE.as_bytes()).unwrap();
        let ids: Vec<&str> = items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "/article/title",
                "/article/author",
                "/article/content/paragraph[1]",
                "/article/content/paragraph[2]",
            ]
        );
        assert_eq!(items[2].context, "paragraph in: The Future of AI");
        assert_eq!(items[2].original_text, "First paragraph.");
    }

    #[test]
    fn targeted_edit_changes_exactly_one_position() {
        let adapter = XmlAdapter::generic();
        let before = adapter.extract(ARTICLE.as_bytes()).unwrap();

        let mut edits = EditSet::new();
        edits.insert("/article/content/paragraph[2]", "Edited.");
        let output = adapter.inject(ARTICLE.as_bytes(), &edits).unwrap();

        let after = adapter.extract(&output).unwrap();
        assert_eq!(after.len(), before.len());
        for (b, a) in before.iter().zip(&after) {
            assert_eq!(b.id, a.id);
            if b.id == "/article/content/paragraph[2]" {
                assert_eq!(a.original_text, "Edited.");
            } else {
                assert_eq!(a.original_text, b.original_text);
            }
        }
    }

    #[test]
    fn unknown_addresses_are_skipped() {
        let adapter = XmlAdapter::generic();
        let mut edits = EditSet::new();
        edits.insert("/article/missing", "x");
        edits.insert("not-even-a-path", "y");
        let output = adapter.inject(ARTICLE.as_bytes(), &edits).unwrap();
        let after = adapter.extract(&output).unwrap();
        let before = adapter.extract(ARTICLE.as_bytes()).unwrap();
        assert_eq!(flat_map(&before), flat_map(&after));
    }

    #[test]
    fn parse_error_carries_detail() {
        let adapter = XmlAdapter::generic();
        let err = adapter.extract(b"<xml><broken>").unwrap_err();
        assert!(matches!(err, ParseError::InvalidXml { .. }));
    }
}
