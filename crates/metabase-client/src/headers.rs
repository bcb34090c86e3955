//! Authorization header computation.

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};

use metabase_core::{AuthMethod, Credential, Error, Result, Secret};

/// Header carrying a static API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header carrying a session token.
pub const SESSION_HEADER: &str = "x-metabase-session";

/// Compute the default headers for requests made with `credential`.
///
/// This is a pure function of the credential's current fields, so a
/// transport rebuilt after a session refresh always carries the new token.
///
/// # Errors
///
/// Returns [`Error::AuthenticationFailed`] when the secret required by the
/// credential's method is missing or empty. For the `credentials` method
/// this is the state before the first login.
pub fn auth_headers(credential: &Credential) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    match credential.auth_method() {
        AuthMethod::ApiKey => {
            let key = credential
                .api_key_secret()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| Error::authentication("API key not configured"))?;
            headers.insert(API_KEY_HEADER, sensitive_value(key)?);
        }
        AuthMethod::SessionToken | AuthMethod::Credentials => {
            let token = credential
                .session_token_secret()
                .filter(|t| !t.is_empty())
                .ok_or_else(|| Error::authentication("Session ID not available"))?;
            headers.insert(SESSION_HEADER, sensitive_value(token)?);
        }
    }

    Ok(headers)
}

/// Build a header value for a secret, marked sensitive so it is never
/// printed by reqwest's own Debug output.
pub(crate) fn sensitive_value(secret: &Secret) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(secret.expose()).map_err(|_| {
        Error::authentication("credential contains characters not allowed in an HTTP header")
    })?;
    value.set_sensitive(true);
    Ok(value)
}
