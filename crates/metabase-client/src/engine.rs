//! The request engine: transport lifecycle, execution and session refresh.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use metabase_core::{Credential, Result, SessionStore};

use crate::headers::auth_headers;
use crate::request::ApiRequest;
use crate::response::{classify, transport_error};
use crate::session::{USER_AGENT, create_session, session_id};

/// Per-request timeout applied to every call, including logins.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated HTTP client and the API root it targets.
struct Transport {
    client: reqwest::Client,
    api_base: String,
}

/// Executes API requests for one credential.
///
/// The engine builds its HTTP transport lazily from the credential's
/// current headers and drops it whenever the session token changes. When
/// a request made with a `credentials` login is answered with `401`, the
/// engine logs in again, persists the new session token through the
/// [`SessionStore`] and resends the request once.
///
/// The engine is used from a single task; methods take `&mut self`.
pub struct Engine {
    credential: Credential,
    store: Arc<dyn SessionStore>,
    transport: Option<Transport>,
    refreshing: AtomicBool,
    timeout: Duration,
}

/// Clears the refresh flag on every exit path.
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Engine {
    /// Create an engine. No network I/O happens until the first request.
    pub fn new(credential: Credential, store: Arc<dyn SessionStore>) -> Self {
        Self {
            credential,
            store,
            transport: None,
            refreshing: AtomicBool::new(false),
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the credential, including any refreshed session token.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// True while a transport is held.
    pub fn has_transport(&self) -> bool {
        self.transport.is_some()
    }

    /// Execute a request and classify the response.
    ///
    /// Returns `Ok(None)` for a successful empty response.
    ///
    /// # Errors
    ///
    /// Header computation failures are returned before any network I/O.
    /// Classified failures follow [`classify`](crate::classify); network
    /// failures are [`Error::Transport`](metabase_core::Error::Transport)
    /// and are never retried.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn execute(&mut self, request: &ApiRequest) -> Result<Option<Value>> {
        let (mut status, mut body) = self.send(request).await?;

        if status == StatusCode::UNAUTHORIZED && self.refresh_session().await {
            debug!("resending request with refreshed session");
            (status, body) = self.send(request).await?;
        }

        classify(status, &body)
    }

    pub async fn get(&mut self, path: &str, query: &[(&str, &str)]) -> Result<Option<Value>> {
        let mut request = ApiRequest::get(path);
        for (key, value) in query {
            request = request.query(*key, value);
        }
        self.execute(&request).await
    }

    pub async fn post(&mut self, path: &str, body: Value) -> Result<Option<Value>> {
        self.execute(&ApiRequest::post(path).body(body)).await
    }

    pub async fn put(&mut self, path: &str, body: Value) -> Result<Option<Value>> {
        self.execute(&ApiRequest::put(path).body(body)).await
    }

    pub async fn delete(&mut self, path: &str) -> Result<Option<Value>> {
        self.execute(&ApiRequest::delete(path)).await
    }

    /// Drop the transport and its pooled connections. The next request
    /// rebuilds it from the credential's current headers.
    pub fn invalidate(&mut self) {
        if self.transport.take().is_some() {
            debug!("transport released");
        }
    }

    /// Release the transport. Also done on drop.
    pub fn close(&mut self) {
        self.invalidate();
    }

    /// Obtain a new session token from the stored username and password.
    ///
    /// Returns `true` when the credential now holds a fresh token. Returns
    /// `false` without network I/O when the credential cannot be refreshed
    /// or a refresh is already in progress, and `false` when the login is
    /// rejected or fails. A successful refresh drops the transport so the
    /// next request carries the new token.
    #[instrument(skip(self), fields(profile = %self.credential.profile()))]
    pub async fn refresh_session(&mut self) -> bool {
        let Some((username, password)) = self
            .credential
            .can_refresh()
            .then(|| self.credential.login_pair())
            .flatten()
            .map(|(user, pass)| (user.to_string(), pass.clone()))
        else {
            debug!("credential cannot be refreshed");
            return false;
        };

        if self.refreshing.swap(true, Ordering::AcqRel) {
            debug!("session refresh already in progress");
            return false;
        }
        let _guard = RefreshGuard(&self.refreshing);

        info!("refreshing session");
        let session = match create_session(
            self.credential.base_url(),
            &username,
            &password,
            self.timeout,
        )
        .await
        {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "session refresh failed");
                return false;
            }
        };

        let Some(token) = session_id(&session).map(str::to_string) else {
            warn!("session refresh response has no id");
            return false;
        };

        self.credential.set_session_token(token.as_str());
        // Same as `self.invalidate()`, borrowing only the transport field
        // while `_guard` holds `&self.refreshing`.
        if self.transport.take().is_some() {
            debug!("transport released");
        }

        if let Err(e) = self
            .store
            .persist_session_token(&token, self.credential.profile())
            .await
        {
            warn!(error = %e, "failed to persist refreshed session");
        }

        info!("session refreshed");
        true
    }

    fn transport(&mut self) -> Result<&Transport> {
        let transport = match self.transport.take() {
            Some(transport) => transport,
            None => self.build_transport()?,
        };
        Ok(self.transport.insert(transport))
    }

    fn build_transport(&self) -> Result<Transport> {
        let headers = auth_headers(&self.credential)?;
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(self.timeout)
            .build()
            .map_err(|e| transport_error(e, self.timeout))?;

        debug!(auth_method = %self.credential.auth_method(), "transport created");
        Ok(Transport {
            client,
            api_base: self.credential.base_url().api_base(),
        })
    }

    async fn send(&mut self, request: &ApiRequest) -> Result<(StatusCode, Vec<u8>)> {
        let timeout = self.timeout;
        let transport = self.transport()?;

        let url = if request.path.starts_with('/') {
            format!("{}{}", transport.api_base, request.path)
        } else {
            format!("{}/{}", transport.api_base, request.path)
        };

        let mut builder = transport.client.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        debug!(status = status.as_u16(), len = body.len(), "response received");
        Ok((status, body.to_vec()))
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("credential", &self.credential)
            .field("has_transport", &self.transport.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}
