//! Error types for the prompt document model, generation sessions, and the
//! backend client.

use thiserror::Error;

use crate::catalog::BlockKind;
use crate::document::{BlockId, Validation};

/// Rejections raised by [`crate::PromptDocument`] edits.
///
/// Every variant leaves the document exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("unknown block kind: {0}")]
    UnknownBlockKind(String),

    #[error("a {0} block is already present")]
    DuplicateBlockKind(BlockKind),

    #[error("{0} is a required block and cannot be added")]
    CannotAddRequiredKind(BlockKind),

    #[error("{0} is a required block and cannot be removed")]
    CannotRemoveRequiredBlock(BlockKind),

    #[error("{0} is a required block and cannot change its kind")]
    CannotRetypeRequiredBlock(BlockKind),

    #[error("block {0} not found")]
    BlockNotFound(BlockId),

    #[error("every optional block kind is already in use")]
    NoAvailableBlockKind,
}

/// Reasons a [`crate::GenerationSession`] refuses to start.
///
/// Failures of the generation request itself are not errors: they land the
/// session in [`crate::SessionState::Failed`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("prompt is incomplete: {}", .0.summary())]
    InvalidDocument(Validation),

    #[error("temperature {0} is outside 0.0..=1.0")]
    TemperatureOutOfRange(f32),

    #[error("session has already been started")]
    AlreadyStarted,
}

/// Errors returned by [`crate::BackendClient`].
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("connection error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server rejected the request: {message}")]
    Rejected {
        message: String,
        code: Option<String>,
    },

    #[error("server returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("not logged in")]
    Unauthorized,
}

impl ApiError {
    pub(crate) fn rejected(message: Option<String>, code: Option<String>, fallback: &str) -> Self {
        ApiError::Rejected {
            message: message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string()),
            code,
        }
    }
}
