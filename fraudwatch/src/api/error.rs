use thiserror::Error;

/// Errors returned by the backend transport.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The token is missing, expired or rejected (HTTP 401).
    #[error("session expired or missing, please log in again")]
    Unauthenticated,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("http error ({status}): {message}")]
    Http { status: u16, message: String },
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("{0}")]
    InvalidFile(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Builds the error for a non-success status and its body.
    ///
    /// FastAPI wraps messages as `{"detail": "..."}`; when the detail is not
    /// a plain string the raw body is kept instead.
    ///
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
            .unwrap_or_else(|| body.to_string());

        match status {
            400 | 422 => Self::BadRequest(message),
            401 => Self::Unauthenticated,
            404 => Self::NotFound(message),
            500..=599 => Self::Server { status, message },
            _ => Self::Http { status, message },
        }
    }
}
