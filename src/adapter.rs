//! The capability interface over document formats, and the format-tag
//! lookup that selects an implementation.

use crate::error::ParseError;
use crate::item::{EditSet, ExtractionItem};
use crate::json::JsonAdapter;
use crate::report::ValidationReport;
use crate::xml::XmlAdapter;
use std::fmt;
use std::str::FromStr;

/// The three engine operations, implemented once per format/profile.
///
/// Adapters are stateless: every call parses its own tree and drops it on
/// return, so a single adapter may serve any number of concurrent calls.
pub trait DocumentAdapter: Send + Sync {
    /// Produce the extraction payload: one item per safe-zone position, in
    /// document order, ids unique.
    fn extract(&self, source: &[u8]) -> Result<Vec<ExtractionItem>, ParseError>;

    /// Rebuild the document with edited text merged in. Unknown addresses
    /// are skipped; positions without an edit keep their original text.
    fn inject(&self, skeleton: &[u8], edits: &EditSet) -> Result<Vec<u8>, ParseError>;

    /// Reconcile a modifications payload against the skeleton. Never fails;
    /// unparsable inputs are reported inside the returned report.
    fn validate(&self, skeleton: &[u8], modifications: &[u8]) -> ValidationReport;
}

/// Format tag selecting an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DocumentFormat {
    /// Generic XML: every non-blank text position is editable.
    Xml,
    /// Generic JSON: every string leaf is editable.
    Json,
    /// WordPress export XML: titles, bodies, excerpts, and meta values.
    WordpressXml,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Xml => "xml",
            DocumentFormat::Json => "json",
            DocumentFormat::WordpressXml => "wordpress-xml",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentFormat {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "xml" => Ok(DocumentFormat::Xml),
            "json" => Ok(DocumentFormat::Json),
            "wordpress-xml" => Ok(DocumentFormat::WordpressXml),
            other => Err(format!(
                "unsupported format: {other}. Use 'xml', 'json' or 'wordpress-xml'"
            )),
        }
    }
}

/// Look up the adapter for a format tag.
pub fn adapter_for(format: DocumentFormat) -> Box<dyn DocumentAdapter> {
    match format {
        DocumentFormat::Xml => Box::new(XmlAdapter::generic()),
        DocumentFormat::Json => Box::new(JsonAdapter::new()),
        DocumentFormat::WordpressXml => Box::new(XmlAdapter::wordpress()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_tags_round_trip() {
        for format in [
            DocumentFormat::Xml,
            DocumentFormat::Json,
            DocumentFormat::WordpressXml,
        ] {
            assert_eq!(format.as_str().parse::<DocumentFormat>().unwrap(), format);
        }
    }

    #[test]
    fn unsupported_tag_is_a_caller_error() {
        assert!("yaml".parse::<DocumentFormat>().is_err());
    }

    #[test]
    fn lookup_covers_every_tag() {
        for format in [
            DocumentFormat::Xml,
            DocumentFormat::Json,
            DocumentFormat::WordpressXml,
        ] {
            let adapter = adapter_for(format);
            let report = adapter.validate(b"{", b"[]");
            assert!(!report.is_valid());
        }
    }
}
