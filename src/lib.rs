//! Textguard: structure-preserving text extraction and reinjection.
//!
//! A structural firewall for editing the human-readable text inside XML and
//! JSON documents. Every eligible text position is pulled out into a flat,
//! order-independent payload keyed by a stable location identifier; the
//! payload is edited externally; injection writes the edited values back
//! into a structurally identical copy of the original document.
//!
//! # Architecture
//!
//! Addressing does all the heavy lifting: an identifier is a pure function
//! of structural position (tag names and sibling ordinals from the root,
//! namespace URIs rather than prefixes), never of content. Extraction and
//! injection replay the same safe-zone selection over the same skeleton, so
//! the address sets line up by construction. The validator reconciles a
//! skeleton against a proposed edit set without mutating either.
//!
//! # Safety
//!
//! - An unchanged skeleton always reproduces the identical identifier set
//! - Injection only ever rewrites text at addressed positions; markup,
//!   attributes, namespaces, comments, and CDATA encoding are preserved
//! - Unknown or unedited addresses are skipped, so partial edit sets are fine
//! - Validation never raises; unparsable inputs are reported, not thrown
//!
//! # Example
//!
//! ```
//! use textguard::{adapter_for, DocumentAdapter, DocumentFormat, EditSet};
//!
//! let adapter = adapter_for(DocumentFormat::Xml);
//! let source = b"<a><b>Hello</b><c>World</c></a>";
//!
//! let items = adapter.extract(source).unwrap();
//! assert_eq!(items[0].id, "/a/b");
//!
//! let mut edits = EditSet::new();
//! edits.insert("/a/b", "Hola");
//! let output = adapter.inject(source, &edits).unwrap();
//! assert_eq!(output, b"<a><b>Hola</b><c>World</c></a>");
//! ```

pub mod adapter;
pub mod differ;
pub mod error;
pub mod item;
pub mod json;
pub mod report;
pub mod xml;

// Re-exports
pub use adapter::{adapter_for, DocumentAdapter, DocumentFormat};
pub use error::ParseError;
pub use item::{flat_map, EditSet, ExtractionItem, ModificationRecord};
pub use json::JsonAdapter;
pub use report::{
    ChangeItem, DiffStats, IssueKind, ReportStatus, ValidationIssue, ValidationReport,
};
pub use xml::XmlAdapter;
