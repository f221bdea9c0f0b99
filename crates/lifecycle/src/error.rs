use client_core::RequestError;
use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

pub const WRONG_INPUT: &str = "Wrong list or you cant perform such operation";
pub const PRIOR_OPEN: &str = "Previous operations is not closed";
pub const ALREADY_CLOSED: &str = "Operation already closed";
pub const ADMIN_ONLY: &str = "Only ADMIN can perform this operation";
pub const NO_OPERATION: &str = "Cell has no operation in it!";
pub const NO_JOB_CARD: &str = "Cell has no job card link";
pub const NOT_REDRAWN: &str = "Saved, but the sheet could not be updated";

#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A precondition failed before anything was sent.
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Remote(#[from] RequestError),
    #[error("grant lookup failed: {0}")]
    Directory(anyhow::Error),
    #[error("grid access failed: {0}")]
    Grid(anyhow::Error),
}

impl LifecycleError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Short message for the operator; never includes a cause chain.
    pub fn user_message(&self) -> ApiError {
        match self {
            Self::Rejected(message) => ApiError::new(ErrorCode::Rejected, message.clone()),
            Self::Remote(err @ RequestError::ResponseShape { .. }) => {
                ApiError::new(ErrorCode::InvalidResponse, err.to_string())
            }
            Self::Remote(err @ RequestError::Status { status: 401 | 403, .. }) => {
                ApiError::new(ErrorCode::Forbidden, err.to_string())
            }
            Self::Remote(err) => ApiError::new(ErrorCode::Unavailable, err.to_string()),
            Self::Directory(_) | Self::Grid(_) => {
                ApiError::new(ErrorCode::Internal, "Failed to update operation")
            }
        }
    }
}
