//! Error types for segmentation handling
//!
//! A single error enum covers collection bookkeeping, payload decoding and
//! format adapters. We use `thiserror` for `Display` and `Error`.

use crate::integrity::DanglingReference;
use crate::types::Id;
use std::io;
use thiserror::Error;

/// Result type alias for segmentation operations
pub type SffResult<T> = std::result::Result<T, SffError>;

/// Error types for the segmentation model, codecs and adapters
#[derive(Debug, Error)]
pub enum SffError {
    /// An entity with this id is already live in the collection
    #[error("Duplicate {kind} id: {id}")]
    DuplicateIdentifier {
        /// Entity kind (e.g. "segment")
        kind: &'static str,
        /// Colliding id
        id: Id,
    },

    /// Id lookup miss
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entity kind
        kind: &'static str,
        /// Missing id
        id: Id,
    },

    /// Ordinal position past the end of a collection
    #[error("Index {index} out of range for collection of length {len}")]
    IndexOutOfRange {
        /// Requested position
        index: usize,
        /// Current length
        len: usize,
    },

    /// Pop on an empty collection
    #[error("Cannot pop from empty {kind} collection")]
    EmptyCollection {
        /// Entity kind
        kind: &'static str,
    },

    /// Element type tag outside the fixed set
    #[error("Unsupported element type: '{0}'")]
    UnsupportedElementType(String),

    /// Byte order tag other than `big` or `little`
    #[error("Unsupported byte order: '{0}'")]
    UnsupportedByteOrder(String),

    /// Decompression/decode failure, truncated or malformed blob
    #[error("Corrupt payload in {context}{}: {reason}", at_offset(.offset))]
    CorruptPayload {
        /// What was being decoded (e.g. "lattice 3 data")
        context: String,
        /// Byte offset of the failure, when known
        offset: Option<u64>,
        /// Description of the problem
        reason: String,
    },

    /// Tree failed structural validation
    #[error("Schema violation at {path}: {reason}")]
    SchemaViolation {
        /// Slash-separated tag path of the offending node
        path: String,
        /// Description of the problem
        reason: String,
    },

    /// Referential-integrity check failure
    #[error("{} dangling reference(s): {}", .0.len(), describe(.0))]
    DanglingReference(Vec<DanglingReference>),

    /// A persisted segment does not populate exactly one shape representation
    #[error("Ambiguous shape representation for segment {segment_id}: {reason}")]
    AmbiguousShapeRepresentation {
        /// Offending segment
        segment_id: Id,
        /// Description of the problem
        reason: String,
    },

    /// Geometry or array dimensions are inconsistent
    #[error("Invalid {context}: {reason}")]
    InvalidShape {
        /// What was being built (e.g. "lattice", "transform 2")
        context: String,
        /// Description of the problem
        reason: String,
    },

    /// Colour channel outside the unit interval
    #[error("Invalid colour: {channel} = {value} is outside [0, 1]")]
    InvalidColour {
        /// Channel name ("red", "green", "blue" or "alpha")
        channel: &'static str,
        /// Offending value
        value: f32,
    },

    /// Parent id that cannot be persisted; 0 marks a root segment
    #[error("Invalid parent id {parent_id} for segment {}", segment(.segment_id))]
    InvalidParent {
        /// Segment carrying the parent id, when it has one
        segment_id: Option<Id>,
        /// Offending parent id
        parent_id: Id,
    },

    /// One or more pairs of an annotation batch failed; nothing was applied
    #[error("Annotation batch rejected ({} failure(s)): {}", .failures.len(), describe(.failures))]
    AnnotationBatch {
        /// Every failing pair, in request order
        failures: Vec<SffError>,
    },

    /// File extension or format name is not recognised
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Configuration could not be read or parsed
    #[error("Config error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(String),

    /// XML reader/writer error
    #[error("XML error: {0}")]
    Xml(String),
}

fn at_offset(offset: &Option<u64>) -> String {
    match offset {
        Some(offset) => format!(" at byte {}", offset),
        None => String::new(),
    }
}

fn segment(id: &Option<Id>) -> String {
    match id {
        Some(id) => id.to_string(),
        None => "(unassigned)".to_string(),
    }
}

fn describe<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl SffError {
    /// Create a corrupt payload error without a byte offset
    pub fn corrupt(context: impl Into<String>, reason: impl Into<String>) -> Self {
        SffError::CorruptPayload {
            context: context.into(),
            offset: None,
            reason: reason.into(),
        }
    }

    /// Create a corrupt payload error at a byte offset
    pub fn corrupt_at(context: impl Into<String>, offset: u64, reason: impl Into<String>) -> Self {
        SffError::CorruptPayload {
            context: context.into(),
            offset: Some(offset),
            reason: reason.into(),
        }
    }

    /// Create a schema violation error
    pub fn schema(path: impl Into<String>, reason: impl Into<String>) -> Self {
        SffError::SchemaViolation {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid shape error
    pub fn invalid_shape(context: impl Into<String>, reason: impl Into<String>) -> Self {
        SffError::InvalidShape {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(kind: &'static str, id: Id) -> Self {
        SffError::NotFound { kind, id }
    }

    /// Check if this is a lookup miss
    pub fn is_not_found(&self) -> bool {
        matches!(self, SffError::NotFound { .. })
    }
}
