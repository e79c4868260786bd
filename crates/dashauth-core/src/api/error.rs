use serde::Deserialize;
use thiserror::Error;

use crate::auth::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid username or password")]
    AuthenticationRejected,

    #[error("Refresh token rejected: {0}")]
    TokenRefreshInvalid(String),

    #[error("Unauthorized - session expired")]
    Unauthorized,

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Request failed with status {status}: {detail}")]
    RequestFailed { status: u16, detail: String },

    #[error("Network error: {0}")]
    NetworkError(#[source] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Stored access token is not a valid header value")]
    InvalidToken,

    #[error("Token storage failed: {0}")]
    Store(#[from] StoreError),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error body shapes the backend produces. `detail` comes from raised
/// HTTP exceptions, `message` from the structured error envelope.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Human-readable message the server attached to an error response
    pub fn server_detail(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        let detail = match parsed.detail {
            Some(serde_json::Value::String(s)) => Some(s),
            _ => None,
        };
        detail
            .or(parsed.message)
            .filter(|s| !s.trim().is_empty())
            .map(|s| Self::truncate_body(&s))
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let detail = Self::server_detail(body).unwrap_or_else(|| Self::truncate_body(body));
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden(detail),
            500..=599 => ApiError::ServerError(detail),
            code => ApiError::RequestFailed { status: code, detail },
        }
    }
}
