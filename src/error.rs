//! The [`AecrError`] `enum` definition and error messages.
//!
use crate::{model::ObjectId, Position};
use thiserror::Error;

/// The [`AecrError`] defines the standard set of errors that should
/// be passed to the user.
///
/// Only [`AecrError::UserCancelled`] and the request validation errors
/// ever reach the caller of a verb. The per-object variants are raised by
/// field accessors and recovered by the dispatcher, which skips that object
/// and moves on.
#[derive(Debug, Error)]
pub enum AecrError {
    // Per-object errors, recovered locally by the dispatcher
    #[error("No annotation objects matched the filter")]
    NoMatchingObjects,
    #[error("Field '{field}' is not supported for object {object}")]
    FieldUnsupportedForKind { field: String, object: ObjectId },
    #[error("Could not allocate storage while writing field '{0}'")]
    AllocationFailure(String),
    #[error("Sequence '{0}' is empty and cannot carry a feature")]
    EmptySequence(String),

    // Aborts the whole verb
    #[error("Operation cancelled; no changes were made")]
    UserCancelled,

    // Request validation errors, raised before any traversal
    #[error("Invalid field reference: '{0}'")]
    InvalidFieldRef(String),
    #[error("Fields '{0}' and '{1}' cannot be combined in one conversion")]
    IncompatibleFields(String, String),
    #[error("Source and destination field are both '{0}'")]
    IdenticalFields(String),
    #[error("Invalid existing text policy: '{0}'")]
    InvalidPolicy(String),
    #[error("Sequence '{0}' is not in the annotation graph")]
    MissingSequence(String),
    #[error("Interval invalid: start ({0}) must not be greater than stop ({1})")]
    InvalidInterval(Position, Position),
    #[error("Interval [{0}, {1}] is invalid for sequence of length {2}")]
    InvalidIntervalForSequence(Position, Position, Position),

    // IO related errors
    #[error("File reading error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // Command line tool related errors
    #[error("Command line argument error: {0}")]
    ArgumentError(#[from] clap::error::Error),
}

impl AecrError {
    /// Whether this error only concerns one object and may be skipped.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AecrError::NoMatchingObjects
                | AecrError::FieldUnsupportedForKind { .. }
                | AecrError::AllocationFailure(_)
                | AecrError::EmptySequence(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FeatureId;

    #[test]
    fn test_recoverable_errors() {
        let err = AecrError::FieldUnsupportedForKind {
            field: "gene.locus".to_string(),
            object: ObjectId::Feature(FeatureId(3)),
        };
        assert!(err.is_recoverable());
        assert!(AecrError::AllocationFailure("protein.name".to_string()).is_recoverable());
        assert!(AecrError::EmptySequence("prot_0".to_string()).is_recoverable());
        assert!(!AecrError::UserCancelled.is_recoverable());
        assert!(!AecrError::IdenticalFields("gene.locus".to_string()).is_recoverable());
    }

    #[test]
    fn test_error_messages() {
        let err = AecrError::FieldUnsupportedForKind {
            field: "gene.locus".to_string(),
            object: ObjectId::Feature(FeatureId(3)),
        };
        assert_eq!(
            err.to_string(),
            "Field 'gene.locus' is not supported for object feature:3"
        );
    }
}
