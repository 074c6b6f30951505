//! Core error types for Income Clarity.
//!
//! Row-level validation problems are not errors: they travel as statuses
//! and messages on import records. This module covers failures that stop
//! an operation as a whole.

use chrono::ParseError as ChronoParseError;
use thiserror::Error;

use crate::import::ImportError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the core crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Import failed: {0}")]
    Import(#[from] ImportError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid configuration value: {0}")]
    InvalidConfigValue(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Validation errors for request input and data parsing.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Failed to parse date/time: {0}")]
    DateTimeParse(#[from] ChronoParseError),
}

// === From implementations for common error types ===

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<ChronoParseError> for Error {
    fn from(err: ChronoParseError) -> Self {
        Error::Validation(ValidationError::DateTimeParse(err))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_error_converts_with_context() {
        let err: Error = ImportError::EmptyInput.into();
        assert!(matches!(err, Error::Import(ImportError::EmptyInput)));
        assert_eq!(
            String::from(err),
            "Import failed: Import input is empty or has no header row"
        );
    }

    #[test]
    fn test_parse_errors_become_validation_errors() {
        let err: Error = serde_json::from_str::<u32>("x").unwrap_err().into();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::InvalidInput(_))
        ));

        let err: Error = chrono::NaiveDate::parse_from_str("nope", "%Y-%m-%d")
            .unwrap_err()
            .into();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::DateTimeParse(_))
        ));
    }
}
