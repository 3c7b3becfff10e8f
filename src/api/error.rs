//! Upload-client errors, normalized to one user-facing message each.
//!
//! Callers render `err.to_string()` directly; no variant exposes raw
//! protocol detail through `Display`.

use reqwest::StatusCode;

use crate::models::ErrorEnvelope;

const REQUEST_FAILED: &str = "Request failed. Please try again.";

/// API-level errors with user-facing messages.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request timed out, try again.")]
    Timeout,
    #[error("Check internet connection and try again.")]
    Connection,
    /// No response and no network fault either (request could not be
    /// built, redirect loop).
    #[error("Unable to reach the server. Please try again later.")]
    Unreachable,
    #[error("Something went wrong, try again.")]
    Server { status: u16 },
    /// Non-2xx below 500. Carries the server's `message` when it sent one.
    #[error("{}", rejected_message(.message))]
    Rejected { status: u16, message: Option<String> },
    #[error("Unexpected response from server.")]
    Decode(String),
    #[error("Unable to read the selected image.")]
    Image(#[source] std::io::Error),
    #[error("Unable to start the network client.")]
    Setup(String),
}

fn rejected_message(message: &Option<String>) -> &str {
    message.as_deref().unwrap_or(REQUEST_FAILED)
}

impl ApiError {
    /// Classify a transport failure (no HTTP response available).
    pub(crate) fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_connect() || err.is_request() || err.is_body() {
            ApiError::Connection
        } else {
            ApiError::Unreachable
        }
    }

    /// Classify a non-2xx response from its status and raw body.
    pub(crate) fn from_status(status: StatusCode, body: &[u8]) -> Self {
        if status.is_server_error() {
            return ApiError::Server {
                status: status.as_u16(),
            };
        }

        let message = serde_json::from_slice::<ErrorEnvelope>(body)
            .ok()
            .and_then(|env| env.message)
            .filter(|m| !m.trim().is_empty());

        ApiError::Rejected {
            status: status.as_u16(),
            message,
        }
    }

    /// HTTP status, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status } | ApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_use_generic_message() {
        for code in [500, 502, 503] {
            let err = ApiError::from_status(StatusCode::from_u16(code).unwrap(), b"{}");
            assert_eq!(err.to_string(), "Something went wrong, try again.");
            assert_eq!(err.status(), Some(code));
        }
    }

    #[test]
    fn server_error_ignores_body_message() {
        let err = ApiError::from_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            br#"{"message":"NullPointerException at line 42","status":"error"}"#,
        );
        assert_eq!(err.to_string(), "Something went wrong, try again.");
    }

    #[test]
    fn client_error_surfaces_server_message() {
        let err = ApiError::from_status(
            StatusCode::BAD_REQUEST,
            br#"{"data":null,"message":"Image must be JPEG or PNG","status":"error"}"#,
        );
        assert_eq!(err.to_string(), "Image must be JPEG or PNG");
    }

    #[test]
    fn client_error_without_message_is_generic() {
        let err = ApiError::from_status(StatusCode::NOT_FOUND, b"not json");
        assert_eq!(err.to_string(), "Request failed. Please try again.");

        let err = ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, br#"{"message":"  "}"#);
        assert_eq!(err.to_string(), "Request failed. Please try again.");
    }

    #[test]
    fn transport_messages_are_fixed() {
        assert_eq!(ApiError::Timeout.to_string(), "Request timed out, try again.");
        assert_eq!(
            ApiError::Connection.to_string(),
            "Check internet connection and try again."
        );
        assert_eq!(
            ApiError::Unreachable.to_string(),
            "Unable to reach the server. Please try again later."
        );
        assert_eq!(ApiError::Timeout.status(), None);
    }

    #[test]
    fn decode_error_hides_detail() {
        let err = ApiError::Decode("expected value at line 1 column 1".into());
        assert_eq!(err.to_string(), "Unexpected response from server.");
    }
}
