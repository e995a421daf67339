//! # AppError
//!
//! Centralized error handling for the Vee client.
//! Every record store failure is status coded; `NotFound` is an expected
//! outcome wherever it is used as an existence check.

use thiserror::Error;

/// The primary error type for all vee operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// No matching record (collection, id or filter).
    #[error("{0} not found: {1}")]
    NotFound(String, String),

    /// Validation failure, either client side (username pattern, content
    /// length) or reported by the store for a rejected payload.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Missing or rejected credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A uniqueness constraint rejected the record.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other status-coded store failure.
    #[error("store error ({status}): {message}")]
    Store { status: u16, message: String },

    /// The store could not be reached at all.
    #[error("transport error: {0}")]
    Transport(String),

    /// The control is disabled while a previous activation is in flight.
    #[error("operation already in progress")]
    Busy,

    /// Local failure (template rendering, malformed record).
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(what: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound(what.into(), key.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// The HTTP-style status this error maps to, if it came from the store.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound(..) => Some(404),
            Self::ValidationError(_) => Some(400),
            Self::Unauthorized(_) => Some(401),
            Self::Conflict(_) => Some(409),
            Self::Store { status, .. } => Some(*status),
            Self::Transport(_) | Self::Busy | Self::Internal(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(..))
    }

    /// Text for an inline error next to a form; validation failures carry
    /// their own wording.
    pub fn user_message(&self) -> String {
        match self {
            Self::ValidationError(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("malformed record: {err}"))
    }
}

/// A specialized Result type for Vee logic.
pub type Result<T> = std::result::Result<T, AppError>;
