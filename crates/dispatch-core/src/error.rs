//! Error types raised while assembling an optimization model.
//!
//! Data quality problems that can be repaired (a malformed number, a
//! missing optional column) never become errors; they are recorded in
//! [`crate::diagnostics::Diagnostics`] instead. [`ModelError`] is reserved
//! for conditions that make the model meaningless, such as a load sitting
//! on a bus that does not exist.
//!
//! # Example
//!
//! ```
//! use dispatch_core::{ModelDraft, ModelError};
//!
//! let draft = ModelDraft::default();
//! let model = draft.build().expect("an empty draft is structurally valid");
//! assert_eq!(model.buses().len(), 0);
//!
//! let err = ModelError::UnknownBusReference {
//!     entity: "Load_node_3".into(),
//!     bus: 3,
//! };
//! assert!(err.to_string().contains("Load_node_3"));
//! ```

use thiserror::Error;

/// Structural errors in a model draft.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// An entity names a bus that was never created
    #[error("{entity} references unknown bus {bus}")]
    UnknownBusReference { entity: String, bus: usize },

    /// Two entities of the same kind share an identifier
    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: usize },

    /// Any other data validation failure (e.g. a branch with zero reactance)
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Convenience type alias for Results using ModelError.
pub type ModelResult<T> = Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ModelError::UnknownBusReference {
            entity: "Generator_node_4_seg1".into(),
            bus: 4,
        };
        assert_eq!(
            err.to_string(),
            "Generator_node_4_seg1 references unknown bus 4"
        );

        let err = ModelError::DuplicateId {
            kind: "bus",
            id: 2,
        };
        assert!(err.to_string().contains("duplicate bus id 2"));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> ModelResult<()> {
            Err(ModelError::Validation("zero reactance".into()))
        }

        fn outer() -> ModelResult<()> {
            inner()?;
            Ok(())
        }

        assert!(matches!(outer(), Err(ModelError::Validation(_))));
    }
}
