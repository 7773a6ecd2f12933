//! # formrelay-catalog
//!
//! The sequence catalog: named, immutable browser-automation documents
//! selected by a `sequence_type` key.
//!
//! The catalog is a pure lookup. It has no knowledge of connections or
//! envelopes, and any [`SequenceCatalog`] implementation can be plugged into
//! the server without changing wire behavior.

#![deny(unsafe_code)]

pub mod builtin;
pub mod naming;
pub mod types;

pub use builtin::BuiltinCatalog;
pub use types::{SequenceDocument, Step, StepAction};

use serde_json::{Map, Value};

/// Sequence type used when a request does not name one.
pub const DEFAULT_SEQUENCE_TYPE: &str = "form_creation";

/// Resolves a sequence type into a document.
pub trait SequenceCatalog: Send + Sync {
    /// Look up the document for `sequence_type`.
    ///
    /// Never fails: unknown types resolve to an empty stub document.
    fn resolve(&self, sequence_type: &str, parameters: &Map<String, Value>) -> SequenceDocument;

    /// Sequence types with a non-stub definition, in sorted order.
    fn known_types(&self) -> Vec<String>;
}

/// Stub document returned for a sequence type the catalog does not define.
pub fn custom_stub(sequence_type: &str) -> SequenceDocument {
    SequenceDocument {
        sequence_id: format!("custom-{sequence_type}-v1"),
        name: format!("Custom {}", naming::title_case(&sequence_type.replace('_', " "))),
        steps: Vec::new(),
    }
}
