//! Error types for the Toroid SOM engine.

use thiserror::Error;

/// The main error type for SOM operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SomError {
    /// Malformed training data (empty, ragged, or non-finite).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A vector's length does not match the grid's feature dimension.
    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Feature dimension of the grid.
        expected: usize,
        /// Length of the offending vector.
        found: usize,
    },

    /// A step was requested past the end of the decay table.
    #[error("Decay schedule exhausted: step {step} >= {len} entries")]
    ScheduleExhausted {
        /// Position in the decay table of the failed step.
        step: usize,
        /// Number of entries in the decay table.
        len: usize,
    },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for SOM operations.
pub type Result<T> = std::result::Result<T, SomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SomError::DimensionMismatch { expected: 3, found: 2 };
        assert_eq!(err.to_string(), "Dimension mismatch: expected 3, found 2");

        let err = SomError::ScheduleExhausted { step: 5, len: 5 };
        assert!(err.to_string().contains("step 5"));
    }
}
