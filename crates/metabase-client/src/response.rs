//! Response classification.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use tracing::trace;

use metabase_core::error::{ApiFailure, TransportError};
use metabase_core::{Error, Result};

/// Classify a completed response.
///
/// * `401` becomes [`Error::AuthenticationFailed`]
/// * `404` becomes [`Error::NotFound`]
/// * any other status `>= 400` becomes [`Error::Api`], using the body's
///   `message` field when it has one
/// * a success with an empty body is `Ok(None)`
/// * a success with a body is its parsed JSON
///
/// Error bodies that are not JSON are dropped; the failure carries no
/// detail. A success body that is not JSON is a transport decode error.
pub fn classify(status: StatusCode, body: &[u8]) -> Result<Option<Value>> {
    trace!(status = %status, len = body.len(), "classifying response");

    let is_empty = body.iter().all(u8::is_ascii_whitespace);

    if status.as_u16() >= 400 {
        let detail = if is_empty {
            None
        } else {
            serde_json::from_slice::<Value>(body).ok()
        };
        let code = Some(status.as_u16());

        return Err(match status {
            StatusCode::UNAUTHORIZED => {
                Error::AuthenticationFailed(ApiFailure::new("Authentication failed", code, detail))
            }
            StatusCode::NOT_FOUND => {
                Error::NotFound(ApiFailure::new("Resource not found", code, detail))
            }
            _ => {
                let message = detail
                    .as_ref()
                    .and_then(|d| d.get("message"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("API error: {}", status.as_u16()));
                Error::Api(ApiFailure::new(message, code, detail))
            }
        });
    }

    if is_empty {
        return Ok(None);
    }

    serde_json::from_slice(body).map(Some).map_err(|e| {
        TransportError::Decode {
            message: e.to_string(),
        }
        .into()
    })
}

/// Map a reqwest failure onto the transport taxonomy.
pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration) -> Error {
    let transport = if err.is_timeout() {
        TransportError::Timeout {
            duration_ms: timeout.as_millis() as u64,
        }
    } else if err.is_connect() {
        TransportError::Connection {
            message: err.to_string(),
        }
    } else if err.is_decode() || err.is_body() {
        TransportError::Decode {
            message: err.to_string(),
        }
    } else {
        TransportError::Http {
            message: err.to_string(),
        }
    };
    Error::Transport(transport)
}
