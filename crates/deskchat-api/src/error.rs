use thiserror::Error;

/// Every way a backend call can fail. The dispatcher turns all of them into
/// the same apology entry; the variants exist for logs and CLI output.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request timed out")]
    Timeout,
    #[error("backend unreachable: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("backend reply could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("backend client does not support {0}")]
    Unsupported(&'static str),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else {
            BackendError::Transport(e)
        }
    }
}
