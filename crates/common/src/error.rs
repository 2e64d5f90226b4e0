//! Error types for the cable configurator workflow

use thiserror::Error;

use crate::types::Slot;

/// Result type alias using the workflow Error
pub type Result<T> = std::result::Result<T, Error>;

/// Workflow error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("No options rendered on the {surface} surface")]
    NoOptionsFound { surface: String },

    #[error("Cannot pick from an empty option set")]
    EmptyOptionSet,

    #[error("No response matching '{pattern}' within {timeout_ms} ms")]
    ResponseTimeout { pattern: String, timeout_ms: u64 },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Verification mismatch for '{subject}': expected {expected}, got {actual}")]
    VerificationMismatch {
        subject: String,
        expected: u64,
        actual: u64,
    },

    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Empty option list for a slot's selection surface
    pub fn no_options(slot: Slot) -> Self {
        Error::NoOptionsFound {
            surface: slot.to_string(),
        }
    }

    /// Everything except a verification mismatch aborts the workflow.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::VerificationMismatch { .. })
    }
}
