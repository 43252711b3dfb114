//! Error types for Dataverse Web API operations

use serde_json::Value;
use thiserror::Error;

/// Errors raised by the Dataverse client
#[derive(Debug, Error)]
pub enum DataverseError {
    /// The Web API answered with a non-success status
    #[error("Dataverse request failed with status {status}: {message}")]
    Api {
        status: u16,
        message: String,
        body: String,
    },

    /// The payload or arguments were rejected before sending anything
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The multipart `$batch` response could not be decoded
    #[error("Malformed batch response: {0}")]
    BatchParse(String),

    /// A successful response did not have the expected shape
    #[error("Unexpected response from Dataverse: {0}")]
    UnexpectedResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The token provider could not hand out a bearer token
    #[error("Authentication error: {0}")]
    Auth(String),
}

pub type Result<T> = std::result::Result<T, DataverseError>;

impl DataverseError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Build an API error from a status code and raw response body
    pub fn from_response(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let message = extract_error_message(&body).unwrap_or_else(|| format!("HTTP {}", status));
        Self::Api {
            status,
            message,
            body,
        }
    }

    /// HTTP status code for API errors
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Extract a readable message from a Dataverse error body
pub fn extract_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(json) = serde_json::from_str::<Value>(trimmed) {
        // {"error":{"code":"...","message":"..."}}
        if let Some(error) = json.get("error") {
            if let Some(message) = error.get("message").and_then(|m| m.as_str()) {
                let code = error.get("code").and_then(|c| c.as_str()).unwrap_or("Unknown");
                return Some(format!("Dataverse Error [{}]: {}", code, message));
            }
        }

        if let Some(message) = json.get("Message").and_then(|m| m.as_str()) {
            return Some(format!("Dataverse Error: {}", message));
        }

        if json.is_object() {
            return Some(format!("Dataverse Error: {}", trimmed));
        }
    }

    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_message() {
        let body = r#"{"error":{"code":"0x80060888","message":"Bad Request - Error in query syntax."}}"#;
        assert_eq!(
            extract_error_message(body),
            Some("Dataverse Error [0x80060888]: Bad Request - Error in query syntax.".to_string())
        );

        let body = r#"{"Message":"Invalid entity name"}"#;
        assert_eq!(
            extract_error_message(body),
            Some("Dataverse Error: Invalid entity name".to_string())
        );

        assert_eq!(extract_error_message("Not Found"), Some("Not Found".to_string()));
        assert_eq!(extract_error_message("   "), None);
    }

    #[test]
    fn test_from_response_keeps_body_and_status() {
        let err = DataverseError::from_response(404, r#"{"error":{"code":"0x1","message":"missing"}}"#);
        assert_eq!(err.status_code(), Some(404));
        match err {
            DataverseError::Api { message, body, .. } => {
                assert_eq!(message, "Dataverse Error [0x1]: missing");
                assert!(body.contains("missing"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_body_falls_back_to_status() {
        let err = DataverseError::from_response(503, "");
        assert_eq!(
            err.to_string(),
            "Dataverse request failed with status 503: HTTP 503"
        );
    }
}
