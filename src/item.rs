use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One extracted text position, as exchanged with the external editor.
///
/// The extraction payload is a JSON array of these, in document order.
/// `edited_text` is serialized as `null` and populated by the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionItem {
    pub id: String,
    pub context: String,
    pub original_text: String,
    pub edited_text: Option<String>,
}

impl ExtractionItem {
    pub fn new(
        id: impl Into<String>,
        context: impl Into<String>,
        original_text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            context: context.into(),
            original_text: original_text.into(),
            edited_text: None,
        }
    }
}

/// An item-shaped record as the validator accepts it: every field optional,
/// so records missing an id can be classified rather than rejected wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModificationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_text: Option<String>,
}

/// The edits handed to injection: id -> replacement text.
///
/// Records without an `edited_text` contribute nothing; injection of an id
/// absent from the skeleton is a silent no-op, so an editor may submit a
/// partial set.
#[derive(Debug, Clone, Default)]
pub struct EditSet {
    edits: BTreeMap<String, String>,
}

impl EditSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an edited extraction payload, keeping only populated edits.
    pub fn from_records(records: &[ModificationRecord]) -> Self {
        let mut edits = BTreeMap::new();
        for record in records {
            if let (Some(id), Some(text)) = (&record.id, &record.edited_text) {
                edits.insert(id.clone(), text.clone());
            }
        }
        Self { edits }
    }

    pub fn from_items(items: &[ExtractionItem]) -> Self {
        let mut edits = BTreeMap::new();
        for item in items {
            if let Some(text) = &item.edited_text {
                edits.insert(item.id.clone(), text.clone());
            }
        }
        Self { edits }
    }

    pub fn insert(&mut self, id: impl Into<String>, text: impl Into<String>) {
        self.edits.insert(id.into(), text.into());
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.edits.get(id).map(String::as_str)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.edits.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edits
            .iter()
            .map(|(id, text)| (id.as_str(), text.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }
}

impl FromIterator<(String, String)> for EditSet {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            edits: iter.into_iter().collect(),
        }
    }
}

/// Flat id -> original_text view of an extraction payload.
pub fn flat_map(items: &[ExtractionItem]) -> BTreeMap<String, String> {
    items
        .iter()
        .map(|item| (item.id.clone(), item.original_text.clone()))
        .collect()
}
