use crate::item::ModificationRecord;
use serde::{Deserialize, Serialize};

/// Outcome of a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Valid,
    Error,
}

/// Classification of a validation discrepancy.
///
/// `invalid_xml` / `invalid_json` mark unparsable inputs; the rest are soft
/// data-quality errors the caller decides how to treat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    InvalidXml,
    InvalidJson,
    MissingId,
    UnknownId,
    MissingModification,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    #[serde(rename = "error")]
    pub kind: IssueKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<ModificationRecord>,
}

impl ValidationIssue {
    pub fn new(kind: IssueKind) -> Self {
        Self {
            kind,
            message: None,
            id: None,
            item: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_item(mut self, item: ModificationRecord) -> Self {
        self.item = Some(item);
        self
    }
}

/// One position whose proposed text differs from the skeleton's current text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeItem {
    pub id: String,
    pub context: String,
    pub original_text: String,
    pub new_text: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub total_items: usize,
    pub modified_items: usize,
    pub unchanged_items: usize,
    pub modifications_provided: usize,
    pub missing_modifications: usize,
    pub unknown_ids: usize,
}

/// Complete diff report. Pure data; validation never raises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub status: ReportStatus,
    pub diff_stats: DiffStats,
    pub changes: Vec<ChangeItem>,
    pub errors: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.status == ReportStatus::Valid
    }

    /// Report for an input that failed to parse: a single issue, all stats
    /// zero, no partial processing.
    pub fn parse_failure(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            status: ReportStatus::Error,
            diff_stats: DiffStats::default(),
            changes: Vec::new(),
            errors: vec![ValidationIssue::new(kind).with_message(message)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_kind_serializes_snake_case() {
        let issue = ValidationIssue::new(IssueKind::UnknownId).with_id("/a/z[1]");
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["error"], "unknown_id");
        assert_eq!(json["id"], "/a/z[1]");
        assert!(json.get("message").is_none());
    }

    #[test]
    fn parse_failure_has_zero_stats() {
        let report = ValidationReport::parse_failure(IssueKind::InvalidJson, "bad payload");
        assert_eq!(report.status, ReportStatus::Error);
        assert_eq!(report.diff_stats, DiffStats::default());
        assert_eq!(report.errors.len(), 1);
        assert!(report.changes.is_empty());
    }
}
