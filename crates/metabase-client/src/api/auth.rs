//! Session and current-user endpoints.

use serde_json::Value;
use tracing::{debug, instrument};

use metabase_core::{Result, Secret};

use super::into_value;
use crate::engine::Engine;
use crate::session::{create_session, delete_session};

/// Authentication endpoints.
pub struct Auth<'a> {
    engine: &'a mut Engine,
}

impl<'a> Auth<'a> {
    pub fn new(engine: &'a mut Engine) -> Self {
        Self { engine }
    }

    /// Log in with username and password. Sent without the engine's
    /// authentication headers. Returns the session object; its `id` is
    /// the new session token.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &Secret) -> Result<Value> {
        create_session(
            self.engine.credential().base_url(),
            username,
            password,
            self.engine.timeout(),
        )
        .await
    }

    /// Invalidate a session token server-side. An already expired session
    /// is not an error.
    #[instrument(skip(self, session_token))]
    pub async fn logout(&self, session_token: &Secret) -> Result<()> {
        delete_session(
            self.engine.credential().base_url(),
            session_token,
            self.engine.timeout(),
        )
        .await
    }

    pub async fn session_properties(&mut self) -> Result<Value> {
        self.engine
            .get("/session/properties", &[])
            .await
            .map(into_value)
    }

    pub async fn current_user(&mut self) -> Result<Value> {
        self.engine.get("/user/current", &[]).await.map(into_value)
    }

    /// True when the current credential is accepted by the server.
    pub async fn validate_session(&mut self) -> bool {
        match self.session_properties().await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "session validation failed");
                false
            }
        }
    }
}
