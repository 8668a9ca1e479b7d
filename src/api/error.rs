use reqwest::StatusCode;
use thiserror::Error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication failed: {0}")]
    AuthenticationFailure(String),

    #[error("access token rejected ({0})")]
    Unauthorized(StatusCode),

    #[error("token refresh failed: {0}")]
    RefreshFailure(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no access token; sign in first")]
    MissingToken,

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Network(err) if err.is_timeout())
    }

    /// Maps a non-success status to the matching variant.
    pub(crate) fn from_status(status: StatusCode, path: &str, body: String) -> Self {
        match status {
            StatusCode::NOT_FOUND => ApiError::NotFound(path.to_string()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized(status),
            _ => ApiError::Status { status, body },
        }
    }
}
