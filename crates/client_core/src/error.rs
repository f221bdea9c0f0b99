use thiserror::Error;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("client misconfigured: {0}")]
    Config(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API {status}: {body}")]
    Status { status: u16, body: String },
    #[error("expected JSON but got: {preview}")]
    ResponseShape { status: u16, preview: String },
    #[error("unexpected response payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl RequestError {
    /// HTTP status of the failing response, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } | Self::ResponseShape { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            Self::Config(_) | Self::Json(_) => None,
        }
    }
}
