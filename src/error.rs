//! Domain errors for habitat summarization
//!
//! Loading and output glue uses `anyhow` with context; these are the typed
//! failures callers may want to match on.

use thiserror::Error;

/// Errors raised while validating inputs or configuration
#[derive(Debug, Error)]
pub enum HabitatError {
    /// A required column is absent from an input table
    #[error("{context}: missing required column '{column}'. Available columns: {available:?}")]
    MissingColumn {
        context: String,
        column: String,
        available: Vec<String>,
    },

    /// A column exists but cannot be read as the expected type
    #[error("{context}: column '{column}' is not usable as {expected}: {reason}")]
    InvalidColumn {
        context: String,
        column: String,
        expected: &'static str,
        reason: String,
    },

    /// Configuration is internally inconsistent
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A family lists an attribute the catalogue does not define
    #[error("family '{family}' references unknown attribute '{attribute}'")]
    UnknownFamilyAttribute { family: String, attribute: String },

    /// An observation row does not fit the attribute schema or has bad abundance
    #[error("observation {row}: {reason}")]
    MalformedObservation { row: usize, reason: String },

    /// A trait record does not match the trait table's columns
    #[error("trait record for species '{species}': expected {expected} fields, got {actual}")]
    TraitArity {
        species: String,
        expected: usize,
        actual: usize,
    },

    /// An attribute name is declared more than once
    #[error("attribute '{0}' is declared more than once")]
    DuplicateAttribute(String),
}

pub type HabitatResult<T> = std::result::Result<T, HabitatError>;
