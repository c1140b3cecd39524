//! Error types for the ClinicCore client SDK

use std::collections::HashMap;

use thiserror::Error;

/// Result type alias for ClinicCore SDK operations
pub type Result<T> = std::result::Result<T, Error>;

/// The closed set of normalized failure categories surfaced by the
/// transport layer. Every non-2xx server reply maps to exactly one of
/// these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    Conflict,
    RateLimited,
    ServerUnavailable,
    Server,
    Unknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Network => "network",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "notFound",
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::RateLimited => "rateLimited",
            Self::ServerUnavailable => "serverUnavailable",
            Self::Server => "server",
            Self::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

/// Error types for the ClinicCore client SDK
#[derive(Error, Debug)]
pub enum Error {
    /// Transport failure: DNS, TCP, TLS, or an exceeded deadline
    #[error("Network error: {0}")]
    Network(String),

    /// Credential missing, expired, or rejected (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authorization failed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error (400/422 with a field map)
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        /// Field name -> human message, passed through from the server
        fields: HashMap<String, String>,
    },

    /// State conflict, e.g. approving an already-approved invoice (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limit exceeded (429)
    #[error("Rate limit exceeded: retry after {retry_after:?}")]
    RateLimited {
        retry_after: Option<std::time::Duration>,
    },

    /// Service unavailable (503)
    #[error("Service unavailable: {0}")]
    ServerUnavailable(String),

    /// Server error (other 5xx)
    #[error("Server error: {0}")]
    Server(String),

    /// The caller aborted the request via a cancel token.
    ///
    /// Deliberately outside the [`ErrorKind`] taxonomy: cancellation is
    /// a caller decision, not a failure. `kind()` returns `None`.
    #[error("Request cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything that defies classification
    #[error("{0}")]
    Unknown(String),
}

impl Error {
    /// The normalized category of this error, or `None` for
    /// cancellation and local configuration mistakes.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Network(_) => Some(ErrorKind::Network),
            Error::Unauthorized(_) => Some(ErrorKind::Unauthorized),
            Error::Forbidden(_) => Some(ErrorKind::Forbidden),
            Error::NotFound(_) => Some(ErrorKind::NotFound),
            Error::Validation { .. } => Some(ErrorKind::Validation),
            Error::Conflict(_) => Some(ErrorKind::Conflict),
            Error::RateLimited { .. } => Some(ErrorKind::RateLimited),
            Error::ServerUnavailable(_) => Some(ErrorKind::ServerUnavailable),
            Error::Server(_) => Some(ErrorKind::Server),
            Error::Unknown(_) => Some(ErrorKind::Unknown),
            Error::Cancelled | Error::Config(_) => None,
        }
    }

    /// Check if the error is retryable for idempotent requests
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Network(_) | Error::ServerUnavailable(_))
    }

    /// Check if the caller aborted the request
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// The validation field map, when present
    pub fn validation_fields(&self) -> Option<&HashMap<String, String>> {
        match self {
            Error::Validation { fields, .. } => Some(fields),
            _ => None,
        }
    }

    /// Create an error from an HTTP status code and response body.
    ///
    /// The body is consulted for `{ message, errors? }`; a 400 with an
    /// `errors` map is treated as validation, a bare 400 as unknown.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let parsed: Option<WireError> = serde_json::from_str(body).ok();
        let message = parsed
            .as_ref()
            .and_then(|e| e.message.clone())
            .unwrap_or_else(|| truncate(body, 200));
        let fields = parsed.and_then(|e| e.errors).unwrap_or_default();

        match status.as_u16() {
            401 => Error::Unauthorized(message),
            403 => Error::Forbidden(message),
            404 => Error::NotFound(message),
            409 => Error::Conflict(message),
            422 => Error::Validation { message, fields },
            400 if !fields.is_empty() => Error::Validation { message, fields },
            429 => Error::RateLimited { retry_after: None },
            503 => Error::ServerUnavailable(message),
            500..=599 => Error::Server(message),
            _ => Error::Unknown(format!("HTTP {status}: {message}")),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            Error::Network(err.to_string())
        } else if err.is_decode() {
            Error::Unknown(format!("response decode failed: {err}"))
        } else {
            Error::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Unknown(format!("JSON error: {err}"))
    }
}

/// Error body shape the remote service uses: `{ message, errors? }`
#[derive(Debug, serde::Deserialize)]
struct WireError {
    message: Option<String>,
    errors: Option<HashMap<String, String>>,
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn status_family_mapping() {
        let cases = [
            (StatusCode::UNAUTHORIZED, ErrorKind::Unauthorized),
            (StatusCode::FORBIDDEN, ErrorKind::Forbidden),
            (StatusCode::NOT_FOUND, ErrorKind::NotFound),
            (StatusCode::CONFLICT, ErrorKind::Conflict),
            (StatusCode::UNPROCESSABLE_ENTITY, ErrorKind::Validation),
            (StatusCode::TOO_MANY_REQUESTS, ErrorKind::RateLimited),
            (StatusCode::SERVICE_UNAVAILABLE, ErrorKind::ServerUnavailable),
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Server),
            (StatusCode::BAD_GATEWAY, ErrorKind::Server),
            (StatusCode::IM_A_TEAPOT, ErrorKind::Unknown),
        ];

        for (status, expected) in cases {
            let err = Error::from_status(status, "{}");
            assert_eq!(err.kind(), Some(expected), "status {status}");
        }
    }

    #[test]
    fn validation_body_carries_field_map() {
        let body = r#"{"message":"Validation failed","errors":{"email":"already exists"}}"#;
        let err = Error::from_status(StatusCode::UNPROCESSABLE_ENTITY, body);
        let fields = err.validation_fields().expect("field map");
        assert_eq!(fields.get("email").map(String::as_str), Some("already exists"));
    }

    #[test]
    fn bad_request_with_errors_is_validation() {
        let body = r#"{"message":"bad","errors":{"name":"required"}}"#;
        let err = Error::from_status(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.kind(), Some(ErrorKind::Validation));
    }

    #[test]
    fn bad_request_without_errors_is_unknown() {
        let err = Error::from_status(StatusCode::BAD_REQUEST, r#"{"message":"bad"}"#);
        assert_eq!(err.kind(), Some(ErrorKind::Unknown));
    }

    #[test]
    fn cancelled_has_no_kind() {
        assert_eq!(Error::Cancelled.kind(), None);
        assert!(Error::Cancelled.is_cancelled());
    }

    #[test]
    fn retryable_set() {
        assert!(Error::Network("refused".into()).is_retryable());
        assert!(Error::ServerUnavailable("maintenance".into()).is_retryable());
        assert!(!Error::Server("boom".into()).is_retryable());
        assert!(!Error::Conflict("stale".into()).is_retryable());
    }

    #[test]
    fn message_falls_back_to_body_excerpt() {
        let err = Error::from_status(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");
        assert!(err.to_string().contains("<html>oops</html>"));
    }
}
