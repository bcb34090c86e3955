//! Error types for the Metabase client.
//!
//! Responses from the server are classified into a small closed set of
//! kinds ([`Error::AuthenticationFailed`], [`Error::NotFound`],
//! [`Error::Api`]), each carrying an [`ApiFailure`] with the HTTP status and
//! whatever structured detail the server returned. Failures that never
//! produced a response are [`Error::Transport`].

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// The unified error type for Metabase client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The server rejected our credentials (HTTP 401), or the local
    /// credential is missing the secret its auth method needs.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(ApiFailure),

    /// The requested resource does not exist (HTTP 404).
    #[error("not found: {0}")]
    NotFound(ApiFailure),

    /// Any other HTTP status >= 400.
    #[error("{0}")]
    Api(ApiFailure),

    /// Network transport errors (connection, timeout, malformed response).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Input validation errors (bad URL, bad JSON argument).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// Configuration file errors.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Local file I/O errors (export and import files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// A locally detected authentication failure, with no HTTP status.
    pub fn authentication(message: impl Into<String>) -> Self {
        Error::AuthenticationFailed(ApiFailure::new(message, None, None))
    }

    /// Returns the HTTP status carried by a classified error.
    pub fn status(&self) -> Option<u16> {
        self.failure().and_then(|f| f.status)
    }

    /// Returns the parsed server response carried by a classified error.
    pub fn detail(&self) -> Option<&Value> {
        self.failure().and_then(|f| f.detail.as_ref())
    }

    /// Returns the classified failure, if this error came from a response
    /// (or a local authentication check).
    pub fn failure(&self) -> Option<&ApiFailure> {
        match self {
            Error::AuthenticationFailed(f) | Error::NotFound(f) | Error::Api(f) => Some(f),
            _ => None,
        }
    }

    /// Check if this is an authentication error.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::AuthenticationFailed(_))
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Stable machine-readable code used in JSON error output.
    pub fn code(&self) -> &'static str {
        match self {
            Error::AuthenticationFailed(_) => "AUTHENTICATION_FAILED",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Api(_) => "API_ERROR",
            Error::Transport(_) => "TRANSPORT_ERROR",
            Error::InvalidInput(_) => "VALIDATION_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Io(_) => "FILE_ERROR",
        }
    }
}

/// A classified failure: message, optional status, optional server detail.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiFailure {
    /// Human-readable message.
    pub message: String,
    /// HTTP status code, when the failure came from a response.
    pub status: Option<u16>,
    /// Parsed JSON body of the response, if it had one.
    pub detail: Option<Value>,
}

impl ApiFailure {
    /// Create a new classified failure.
    pub fn new(message: impl Into<String>, status: Option<u16>, detail: Option<Value>) -> Self {
        Self {
            message: message.into(),
            status,
            detail,
        }
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(status) = self.status {
            write!(f, " (HTTP {})", status)?;
        }
        Ok(())
    }
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The response body could not be decoded.
    #[error("malformed response: {message}")]
    Decode { message: String },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid Metabase base URL.
    #[error("invalid Metabase URL '{value}': {reason}")]
    BaseUrl { value: String, reason: String },

    /// Invalid JSON supplied on the command line or in a file.
    #[error("invalid JSON: {message}")]
    Json { message: String },

    /// Generic invalid input.
    #[error("{message}")]
    Other { message: String },
}

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform has no configuration directory.
    #[error("could not determine config directory")]
    NoConfigDir,

    /// No configuration exists for the profile.
    #[error("not authenticated for profile '{profile}'. Run 'metabase auth login' first or set METABASE_* environment variables")]
    NotConfigured { profile: String },

    /// The config file could not be read.
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    /// The config file is not valid TOML.
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    /// The config file could not be written.
    #[error("failed to write {path}: {message}")]
    Write { path: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classified_errors_expose_status_and_detail() {
        let err = Error::NotFound(ApiFailure::new(
            "Resource not found",
            Some(404),
            Some(json!({"message": "Not found"})),
        ));
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.detail(), Some(&json!({"message": "Not found"})));
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn local_authentication_error_has_no_status() {
        let err = Error::authentication("API key not configured");
        assert!(err.is_authentication());
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "authentication failed: API key not configured");
    }

    #[test]
    fn display_includes_status() {
        let err = Error::Api(ApiFailure::new("boom", Some(500), None));
        assert_eq!(err.to_string(), "boom (HTTP 500)");
    }

    #[test]
    fn transport_errors_have_no_failure() {
        let err = Error::from(TransportError::Timeout { duration_ms: 30_000 });
        assert!(err.failure().is_none());
        assert_eq!(err.code(), "TRANSPORT_ERROR");
    }
}
