//! Per-invocation context shared by all commands.

use std::sync::Arc;

use anyhow::{Context, Result};

use metabase_client::Engine;
use metabase_core::Credential;
use metabase_core::error::ConfigError;

use crate::config::ConfigStore;

/// Built once in `main` and passed to every command handler.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub profile: String,
    pub json: bool,
    pub store: Arc<ConfigStore>,
}

impl AppContext {
    pub fn new(profile: impl Into<String>, json: bool, store: ConfigStore) -> Self {
        Self {
            profile: profile.into(),
            json,
            store: Arc::new(store),
        }
    }

    /// The effective credential for the active profile, if configured.
    pub fn credential(&self) -> Result<Option<Credential>> {
        self.store
            .resolve(&self.profile)
            .context("Failed to load configuration")
    }

    /// The effective credential, or a not-configured error.
    pub fn require_credential(&self) -> Result<Credential> {
        self.credential()?.ok_or_else(|| {
            metabase_core::Error::from(ConfigError::NotConfigured {
                profile: self.profile.clone(),
            })
            .into()
        })
    }

    /// An engine for the active profile. Refreshed sessions are written
    /// back to the config store.
    pub fn engine(&self) -> Result<Engine> {
        let credential = self.require_credential()?;
        Ok(self.engine_for(credential))
    }

    /// An engine for an explicit credential.
    pub fn engine_for(&self, credential: Credential) -> Engine {
        Engine::new(credential, self.store.clone())
    }
}
