//! Username/password login against `/api/session`.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use metabase_core::error::ApiFailure;
use metabase_core::{BaseUrl, Error, Result, Secret};

use crate::headers::{SESSION_HEADER, sensitive_value};
use crate::response::{classify, transport_error};

pub(crate) const USER_AGENT: &str = concat!("metabase-cli/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Log in with username and password and return the server's session
/// object (`{"id": "<token>", ...}`).
///
/// The request is sent on a fresh client with no authentication header.
///
/// # Errors
///
/// Any status other than `200` is classified as usual (a rejected login is
/// [`Error::AuthenticationFailed`]). Network failures are
/// [`Error::Transport`].
#[instrument(skip(password), fields(base_url = %base_url))]
pub async fn create_session(
    base_url: &BaseUrl,
    username: &str,
    password: &Secret,
    timeout: Duration,
) -> Result<Value> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| transport_error(e, timeout))?;

    let url = base_url.api_url("/session");
    debug!(%url, "creating session");

    let request = CreateSessionRequest {
        username,
        password: password.expose(),
    };

    let response = client
        .post(&url)
        .json(&request)
        .send()
        .await
        .map_err(|e| transport_error(e, timeout))?;

    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| transport_error(e, timeout))?;

    match classify(status, &body)? {
        Some(session) if status == StatusCode::OK => Ok(session),
        _ => Err(Error::Api(ApiFailure::new(
            format!("Login failed: unexpected response (HTTP {})", status.as_u16()),
            Some(status.as_u16()),
            None,
        ))),
    }
}

/// Invalidate a session server-side with `DELETE /api/session`.
///
/// A `401` means the session is already gone and counts as success.
#[instrument(skip(token), fields(base_url = %base_url))]
pub(crate) async fn delete_session(
    base_url: &BaseUrl,
    token: &Secret,
    timeout: Duration,
) -> Result<()> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| transport_error(e, timeout))?;

    let response = client
        .delete(base_url.api_url("/session"))
        .header(CONTENT_TYPE, "application/json")
        .header(SESSION_HEADER, sensitive_value(token)?)
        .send()
        .await
        .map_err(|e| transport_error(e, timeout))?;

    let status = response.status();
    debug!(status = status.as_u16(), "session deleted");
    if status.is_success() || status == StatusCode::UNAUTHORIZED {
        return Ok(());
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| transport_error(e, timeout))?;
    classify(status, &body).map(|_| ())
}

/// Returns the `id` field of a session object when it is a non-empty string.
pub(crate) fn session_id(session: &Value) -> Option<&str> {
    session
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn extracts_session_id() {
        assert_eq!(session_id(&json!({"id": "abc"})), Some("abc"));
        assert_eq!(session_id(&json!({"id": ""})), None);
        assert_eq!(session_id(&json!({"id": 4})), None);
        assert_eq!(session_id(&json!({})), None);
    }

    #[tokio::test]
    async fn posts_username_and_password() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/session"))
            .and(body_json(json!({"username": "alice", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "tok"})))
            .expect(1)
            .mount(&server)
            .await;

        let base = BaseUrl::new(&server.uri()).unwrap();
        let session = create_session(&base, "alice", &Secret::new("pw"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(session_id(&session), Some("tok"));
    }

    #[tokio::test]
    async fn rejected_login_is_authentication_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/session"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"errors": {}})))
            .mount(&server)
            .await;

        let base = BaseUrl::new(&server.uri()).unwrap();
        let err = create_session(&base, "alice", &Secret::new("bad"), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.is_authentication());
    }

    #[tokio::test]
    async fn logout_ignores_expired_session() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/session"))
            .and(header("x-metabase-session", "old"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let base = BaseUrl::new(&server.uri()).unwrap();
        delete_session(&base, &Secret::new("old"), Duration::from_secs(5))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn login_sends_no_auth_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/session"))
            .and(header_exists("x-metabase-session"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "tok"})))
            .mount(&server)
            .await;

        let base = BaseUrl::new(&server.uri()).unwrap();
        let session = create_session(&base, "alice", &Secret::new("pw"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(session["id"], "tok");
    }
}
