//! Credential model: where the server lives and how to authenticate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::secret::Secret;
use crate::types::BaseUrl;

/// Name of the profile used when none is given.
pub const DEFAULT_PROFILE: &str = "default";

/// Supported authentication methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Long-lived static API key, sent as `x-api-key`. Never refreshed.
    ApiKey,
    /// A pre-existing session token. Never refreshed.
    #[serde(alias = "session_id")]
    SessionToken,
    /// Username and password; the session token is obtained by logging in
    /// and re-obtained automatically when the server rejects it.
    Credentials,
}

impl AuthMethod {
    /// Returns the configuration-file spelling of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::ApiKey => "api_key",
            AuthMethod::SessionToken => "session_token",
            AuthMethod::Credentials => "credentials",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api_key" => Ok(AuthMethod::ApiKey),
            "session_token" | "session_id" => Ok(AuthMethod::SessionToken),
            "credentials" => Ok(AuthMethod::Credentials),
            other => Err(Error::authentication(format!(
                "Unknown auth method: {}",
                other
            ))),
        }
    }
}

/// One authenticated identity against one Metabase instance.
///
/// Everything except the session token is fixed at construction. The
/// session token is replaced in place when a `credentials` session is
/// refreshed.
///
/// Whether the secret required by [`AuthMethod`] is actually present is
/// checked when request headers are computed, not here.
///
/// # Example
///
/// ```
/// use metabase_core::{AuthMethod, BaseUrl, Credential};
///
/// let base = BaseUrl::new("https://metabase.example.com").unwrap();
/// let cred = Credential::credentials(base, "alice@example.com", "hunter2")
///     .with_profile("work");
/// assert_eq!(cred.auth_method(), AuthMethod::Credentials);
/// assert!(cred.can_refresh());
/// assert!(!format!("{:?}", cred).contains("hunter2"));
/// ```
#[derive(Debug, Clone)]
pub struct Credential {
    base_url: BaseUrl,
    auth_method: AuthMethod,
    api_key: Option<Secret>,
    session_token: Option<Secret>,
    username: Option<String>,
    password: Option<Secret>,
    profile: String,
}

impl Credential {
    /// Create a credential with no secret material.
    pub fn new(base_url: BaseUrl, auth_method: AuthMethod) -> Self {
        Self {
            base_url,
            auth_method,
            api_key: None,
            session_token: None,
            username: None,
            password: None,
            profile: DEFAULT_PROFILE.to_string(),
        }
    }

    /// Create an API-key credential.
    pub fn api_key(base_url: BaseUrl, api_key: impl Into<Secret>) -> Self {
        Self::new(base_url, AuthMethod::ApiKey).with_api_key(api_key)
    }

    /// Create a credential from an existing session token.
    pub fn session_token(base_url: BaseUrl, token: impl Into<Secret>) -> Self {
        Self::new(base_url, AuthMethod::SessionToken).with_session_token(token)
    }

    /// Create a username/password credential.
    pub fn credentials(
        base_url: BaseUrl,
        username: impl Into<String>,
        password: impl Into<Secret>,
    ) -> Self {
        Self::new(base_url, AuthMethod::Credentials).with_login(username, password)
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<Secret>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the session token.
    pub fn with_session_token(mut self, token: impl Into<Secret>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Set the username and password.
    pub fn with_login(mut self, username: impl Into<String>, password: impl Into<Secret>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the configuration profile this credential belongs to.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Returns the Metabase instance URL.
    pub fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    /// Returns the authentication method.
    pub fn auth_method(&self) -> AuthMethod {
        self.auth_method
    }

    /// Returns the API key, if any.
    pub fn api_key_secret(&self) -> Option<&Secret> {
        self.api_key.as_ref()
    }

    /// Returns the current session token, if any.
    pub fn session_token_secret(&self) -> Option<&Secret> {
        self.session_token.as_ref()
    }

    /// Returns the username, if any.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Returns the password, if any.
    pub fn password(&self) -> Option<&Secret> {
        self.password.as_ref()
    }

    /// Returns the configuration profile name.
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Replace the session token. Callers owning a transport built from
    /// the old token must rebuild it.
    pub fn set_session_token(&mut self, token: impl Into<Secret>) {
        self.session_token = Some(token.into());
    }

    /// Returns the username and password when both are non-empty.
    pub fn login_pair(&self) -> Option<(&str, &Secret)> {
        match (self.username.as_deref(), self.password.as_ref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }

    /// True when an expired session can be re-derived from stored
    /// username and password.
    pub fn can_refresh(&self) -> bool {
        self.auth_method == AuthMethod::Credentials && self.login_pair().is_some()
    }
}
