//! Persisted-configuration collaborator.

use async_trait::async_trait;

use crate::{Credential, Result};

/// Durable storage for per-profile credentials.
///
/// The request engine calls [`SessionStore::persist_session_token`] exactly
/// once after each successful session refresh, so that the next process
/// invocation starts with the new token.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the credential configured for a profile, if any.
    async fn load(&self, profile: &str) -> Result<Option<Credential>>;

    /// Durably store a new session token under a profile.
    async fn persist_session_token(&self, token: &str, profile: &str) -> Result<()>;
}
