//! Reconciliation of a skeleton's address set against proposed modifications.
//!
//! This is the format-independent half of validation: the adapters produce
//! the authoritative address set (in document order) and hand it here
//! together with the parsed modification records. Reconciliation is a pure
//! function; it never touches a document tree.

use crate::item::ModificationRecord;
use crate::report::{
    ChangeItem, DiffStats, IssueKind, ReportStatus, ValidationIssue, ValidationReport,
};
use std::collections::{BTreeSet, HashMap};

/// One addressable position of the skeleton, with its current text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressEntry {
    pub id: String,
    pub context: String,
    pub text: String,
}

/// Parse a modifications payload: a JSON array of item-shaped records.
pub fn parse_modifications(payload: &[u8]) -> Result<Vec<ModificationRecord>, serde_json::Error> {
    serde_json::from_slice(payload)
}

/// Reconcile modification records against the authoritative address set.
///
/// Records without an id yield `missing_id`; ids outside the address set
/// yield `unknown_id`; addressed positions never mentioned yield one
/// `missing_modification` each, in document order. A change is recorded iff
/// `edited_text` is present and differs from the skeleton's current text.
pub fn reconcile(addresses: &[AddressEntry], records: &[ModificationRecord]) -> ValidationReport {
    let by_id: HashMap<&str, &AddressEntry> = addresses
        .iter()
        .map(|entry| (entry.id.as_str(), entry))
        .collect();

    let mut errors = Vec::new();
    let mut changes = Vec::new();
    let mut provided: BTreeSet<&str> = BTreeSet::new();

    for record in records {
        let id = match &record.id {
            Some(id) => id.as_str(),
            None => {
                errors.push(
                    ValidationIssue::new(IssueKind::MissingId)
                        .with_message("modification record has no id")
                        .with_item(record.clone()),
                );
                continue;
            }
        };

        provided.insert(id);

        let entry = match by_id.get(id) {
            Some(entry) => entry,
            None => {
                errors.push(
                    ValidationIssue::new(IssueKind::UnknownId)
                        .with_message(format!("id not present in skeleton: {id}"))
                        .with_id(id),
                );
                continue;
            }
        };

        if let Some(new_text) = &record.edited_text {
            if *new_text != entry.text {
                changes.push(ChangeItem {
                    id: entry.id.clone(),
                    context: entry.context.clone(),
                    original_text: entry.text.clone(),
                    new_text: new_text.clone(),
                });
            }
        }
    }

    let mut missing = 0usize;
    for entry in addresses {
        if !provided.contains(entry.id.as_str()) {
            missing += 1;
            errors.push(
                ValidationIssue::new(IssueKind::MissingModification)
                    .with_message(format!("skeleton id has no modification: {}", entry.id))
                    .with_id(entry.id.clone()),
            );
        }
    }

    let unknown_ids = errors
        .iter()
        .filter(|issue| issue.kind == IssueKind::UnknownId)
        .count();

    let status = if errors.is_empty() {
        ReportStatus::Valid
    } else {
        ReportStatus::Error
    };

    ValidationReport {
        status,
        diff_stats: DiffStats {
            total_items: addresses.len(),
            modified_items: changes.len(),
            unchanged_items: addresses.len() - changes.len(),
            modifications_provided: provided.len(),
            missing_modifications: missing,
            unknown_ids,
        },
        changes,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, text: &str) -> AddressEntry {
        AddressEntry {
            id: id.to_string(),
            context: id.trim_start_matches('/').to_string(),
            text: text.to_string(),
        }
    }

    fn record(id: &str, edited: Option<&str>) -> ModificationRecord {
        ModificationRecord {
            id: Some(id.to_string()),
            edited_text: edited.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn clean_reconciliation_is_valid() {
        let addresses = vec![entry("/a/b", "Hello"), entry("/a/c", "World")];
        let records = vec![record("/a/b", Some("Hola")), record("/a/c", Some("World"))];

        let report = reconcile(&addresses, &records);
        assert_eq!(report.status, ReportStatus::Valid);
        assert_eq!(report.diff_stats.total_items, 2);
        assert_eq!(report.diff_stats.modified_items, 1);
        assert_eq!(report.diff_stats.unchanged_items, 1);
        assert_eq!(report.changes.len(), 1);
        assert_eq!(report.changes[0].id, "/a/b");
        assert_eq!(report.changes[0].original_text, "Hello");
        assert_eq!(report.changes[0].new_text, "Hola");
        assert!(report.errors.is_empty());
    }

    #[test]
    fn unknown_id_is_reported_with_the_offending_id() {
        let addresses = vec![entry("/a/b", "Hello"), entry("/a/c", "World")];
        let records = vec![
            record("/a/b", Some("x")),
            record("/a/c", None),
            record("/a/z[1]", Some("x")),
        ];

        let report = reconcile(&addresses, &records);
        assert_eq!(report.status, ReportStatus::Error);
        assert_eq!(report.diff_stats.unknown_ids, 1);
        let unknown: Vec<_> = report
            .errors
            .iter()
            .filter(|e| e.kind == IssueKind::UnknownId)
            .collect();
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].id.as_deref(), Some("/a/z[1]"));
    }

    #[test]
    fn missing_modifications_follow_document_order() {
        let addresses = vec![entry("/a/b", "Hello"), entry("/a/c", "World")];
        let records = vec![record("/a/b", Some("Hola"))];

        let report = reconcile(&addresses, &records);
        assert_eq!(report.status, ReportStatus::Error);
        assert_eq!(report.diff_stats.missing_modifications, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, IssueKind::MissingModification);
        assert_eq!(report.errors[0].id.as_deref(), Some("/a/c"));
    }

    #[test]
    fn record_without_id_attaches_the_record() {
        let addresses = vec![entry("/a/b", "Hello")];
        let records = vec![
            ModificationRecord {
                edited_text: Some("orphan".to_string()),
                ..Default::default()
            },
            record("/a/b", None),
        ];

        let report = reconcile(&addresses, &records);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, IssueKind::MissingId);
        assert!(report.errors[0].item.is_some());
    }

    #[test]
    fn duplicate_ids_count_once_toward_provided() {
        let addresses = vec![entry("/a/b", "Hello")];
        let records = vec![record("/a/b", None), record("/a/b", Some("Hola"))];

        let report = reconcile(&addresses, &records);
        assert_eq!(report.diff_stats.modifications_provided, 1);
        assert_eq!(report.diff_stats.missing_modifications, 0);
    }
}
