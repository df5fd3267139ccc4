//! Errors raised while talking to the remote store.

use thiserror::Error;

/// All failures of a remote store call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never got a response (unreachable, timeout, TLS...).
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not match the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// A 2xx response that reports an error in its body.
    #[error("server error: {0}")]
    Server(String),

    /// A destructive bulk action was attempted with the wrong confirmation phrase.
    #[error("confirmation phrase does not match")]
    Confirmation,
}

impl ApiError {
    /// Whether the failure happened before the server could answer.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err)
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
