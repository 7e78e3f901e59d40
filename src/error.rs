// src/error.rs

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Global Client Error Enum.
/// Centralizes error handling for the API client and every store, and maps
/// HTTP responses coming back from the backend into one taxonomy.
#[derive(Debug, Error)]
pub enum AppError {
    // Transport or connectivity failure, nothing reached the server state.
    #[error("network error: {0}")]
    Network(String),

    // 409, or a 400 saying the like/comment/request already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    // Operation forbidden by the entity's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    // 404, entity already gone server-side.
    #[error("not found: {0}")]
    NotFound(String),

    // 400 or local input validation.
    #[error("bad request: {0}")]
    BadRequest(String),

    // 401 / 403, owned by the auth collaborator.
    #[error("authentication error: {0}")]
    AuthError(String),

    // Response body did not match the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    // Missing or malformed startup configuration.
    #[error("configuration error: {0}")]
    Config(String),

    // 5xx and anything else unexpected.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Converts a non-success HTTP response into an `AppError`.
    ///
    /// The backend speaks Django REST Framework, so error bodies are usually
    /// `{"detail": "..."}` or a map of field names to message lists.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = extract_message(body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());

        match status {
            StatusCode::NOT_FOUND => AppError::NotFound(message),
            StatusCode::CONFLICT => AppError::Conflict(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::AuthError(message),
            StatusCode::BAD_REQUEST if looks_like_duplicate(&message) => {
                AppError::Conflict(message)
            }
            s if s.is_client_error() => AppError::BadRequest(message),
            _ => AppError::Internal(format!("{}: {}", status.as_u16(), message)),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::Conflict(_))
    }

    /// Text shown to the user in a notice.
    /// Internal details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Network(_) => {
                "Network error. Please check your connection and try again.".to_string()
            }
            AppError::Internal(msg) | AppError::Decode(msg) => {
                tracing::error!("Internal client error: {}", msg);
                "Something went wrong. Please try again later.".to_string()
            }
            AppError::AuthError(msg) => format!("{}. Please log in again.", msg.trim_end_matches('.')),
            AppError::Conflict(msg)
            | AppError::InvalidState(msg)
            | AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Config(msg) => msg.clone(),
        }
    }
}

fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let value: Value = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        Err(_) => return Some(trimmed.chars().take(200).collect()),
    };

    match value {
        Value::String(s) => Some(s),
        Value::Array(items) => items.into_iter().find_map(|v| v.as_str().map(str::to_owned)),
        Value::Object(map) => {
            for key in ["detail", "error", "message"] {
                if let Some(Value::String(s)) = map.get(key) {
                    return Some(s.clone());
                }
            }
            // Field errors: {"text": ["This field may not be blank."]}
            map.iter().find_map(|(field, v)| {
                let msg = match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Array(items) => items.iter().find_map(|i| i.as_str().map(str::to_owned)),
                    _ => None,
                }?;
                if field == "non_field_errors" {
                    Some(msg)
                } else {
                    Some(format!("{}: {}", field, msg))
                }
            })
        }
        _ => None,
    }
}

fn looks_like_duplicate(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("already") || lower.contains("unique")
}

/// Converts `reqwest::Error` into the matching taxonomy entry.
/// Allows using `?` operator on HTTP calls.
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            AppError::from_status(status, "")
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Decode(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::Config(format!("invalid url: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::AuthError(format!("invalid token: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
