use thiserror::Error;

use crate::search::SearchError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Turn-level faults. Expected policy outcomes (stop reasons, re-prompts)
/// are not errors and never appear here.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error("turn timed out after {elapsed_secs}s")]
    Timeout { elapsed_secs: u64 },
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// User-safe reply for a failed turn. The failed turn never commits
    /// state, so "try again" is always accurate.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Search(_) | Self::Timeout { .. } | Self::Persistence(_) => {
                "I ran into a temporary problem. Please send that message again."
            }
            Self::Domain(_) | Self::Configuration(_) => {
                "An unexpected internal error occurred. Please try again later."
            }
        }
    }
}
