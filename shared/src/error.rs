//! Engine error types
//!
//! Every failure the pure calculation layer can report. The backend maps
//! these onto HTTP responses; the WASM bridge turns them into strings.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::validation::ValidationErrors;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or out-of-range input, rejected before any calculation runs
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Missing price or threshold configuration for a fruit type
    #[error("Configuration not found: {0}")]
    ConfigurationNotFound(String),

    /// `original - discount` does not match `final` within tolerance
    #[error(
        "Inconsistent discount: {original} - {discount} does not equal {final_weight} (off by {difference})"
    )]
    Consistency {
        original: Decimal,
        discount: Decimal,
        final_weight: Decimal,
        difference: Decimal,
    },

    #[error("Batch {0} is already completed")]
    BatchAlreadyCompleted(Uuid),
}

impl From<ValidationErrors> for EngineError {
    fn from(errors: ValidationErrors) -> Self {
        EngineError::Validation(errors)
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
