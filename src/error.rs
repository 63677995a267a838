use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single search-report page request.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("invalid response body: {0}")]
    Decode(String),
    #[error("giving up after {attempts} attempts, last error: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

impl FetchError {
    pub fn status(status: StatusCode, body: impl Into<String>) -> Self {
        FetchError::Status {
            status,
            body: body.into(),
        }
    }

    /// Transient failures worth another attempt. Everything else aborts the run.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => {
                matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
            }
            FetchError::Timeout(_) | FetchError::Connect(_) => true,
            FetchError::Transport(_) | FetchError::Decode(_) | FetchError::RetriesExhausted { .. } => {
                false
            }
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::Status { status, .. } if *status == StatusCode::TOO_MANY_REQUESTS)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else if err.is_connect() || err.is_request() || err.is_body() {
            // resets and dropped connections while sending or reading the body
            FetchError::Connect(err.to_string())
        } else if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}
