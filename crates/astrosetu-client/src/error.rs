use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("unparsable response: {0}")]
    InvalidResponse(String),

    #[error("a report generation is already in progress")]
    Busy,

    #[error("client configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Failures a later poll may not see again.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::Server { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Whether a fresh `start` could succeed where this failed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Server { status, .. } => !matches!(status, 400 | 422),
            ClientError::Config(_) => false,
            _ => true,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::InvalidResponse(e.to_string())
        } else {
            ClientError::Transport(e.to_string())
        }
    }
}
