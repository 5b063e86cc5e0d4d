//! Typed errors for chain manipulation and form edits

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    /// The requested successor already reaches the step being relinked
    #[error("linking '{from}' to '{to}' would create a cycle")]
    Cycle { from: String, to: String },
}

/// Rejected edits to a form step's view
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("step '{step}' is read-only")]
    ReadOnly { step: String },

    #[error("step '{step}' has no field '{key}'")]
    UnknownField { step: String, key: String },

    #[error("'{value}' is not a valid choice for '{key}' (expected one of: {})", .choices.join(", "))]
    NotAChoice {
        key: String,
        value: String,
        choices: Vec<String>,
    },
}
