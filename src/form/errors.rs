//! # Form Session Errors

use std::collections::BTreeMap;

use thiserror::Error;

use crate::validation::Violation;

/// Result type for session edits
pub type SessionResult<T> = Result<T, SessionError>;

/// Rejected value edits
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Field '{0}' is derived and cannot be edited")]
    DerivedField(String),
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::UnknownField(_) => "FORM_SESSION_UNKNOWN_FIELD",
            SessionError::DerivedField(_) => "FORM_SESSION_DERIVED_FIELD",
        }
    }
}

/// Submission refused
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    #[error("Form has errors in {} field(s)", .errors.len())]
    Invalid {
        /// Violations keyed by field id, only fields with errors
        errors: BTreeMap<String, Vec<Violation>>,
    },
}
