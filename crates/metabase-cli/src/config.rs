//! Profile configuration persisted as TOML.
//!
//! The file holds one table per profile:
//!
//! ```toml
//! [default]
//! url = "https://metabase.example.com"
//! auth_method = "credentials"
//! username = "alice@example.com"
//! password = "hunter2"
//! session_id = "0b5e..."
//! ```
//!
//! `METABASE_*` environment variables take precedence over the file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use metabase_core::error::ConfigError;
use metabase_core::{AuthMethod, BaseUrl, Credential, Result, SessionStore};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

pub const ENV_URL: &str = "METABASE_URL";
pub const ENV_API_KEY: &str = "METABASE_API_KEY";
pub const ENV_SESSION_ID: &str = "METABASE_SESSION_ID";
pub const ENV_USERNAME: &str = "METABASE_USERNAME";
pub const ENV_PASSWORD: &str = "METABASE_PASSWORD";

/// One profile table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

type ConfigFile = BTreeMap<String, ProfileConfig>;

/// Values taken from `METABASE_*` environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub session_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok();
        Self {
            url: var(ENV_URL),
            api_key: var(ENV_API_KEY),
            session_id: var(ENV_SESSION_ID),
            username: var(ENV_USERNAME),
            password: var(ENV_PASSWORD),
        }
    }
}

/// TOML-backed profile store.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    env: EnvOverrides,
}

impl ConfigStore {
    /// The store at `<config_dir>/metabasecli/config.toml`, with environment
    /// overrides read from the process environment.
    pub fn new() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "metabasecli").ok_or(ConfigError::NoConfigDir)?;
        Ok(Self {
            path: dirs.config_dir().join("config.toml"),
            env: EnvOverrides::from_env(),
        })
    }

    /// A store at an explicit path with no environment overrides.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            env: EnvOverrides::default(),
        }
    }

    pub fn with_env(mut self, env: EnvOverrides) -> Self {
        self.env = env;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve the effective credential for a profile.
    ///
    /// Returns `None` when no URL is configured, or when no secret and no
    /// explicit `auth_method` is available.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed, when the URL is
    /// invalid, or when `auth_method` names an unknown method.
    pub fn resolve(&self, profile: &str) -> Result<Option<Credential>> {
        let file = self.read_file()?.remove(profile).unwrap_or_default();
        let pick = |env: &Option<String>, file: Option<String>| {
            env.clone().or(file).filter(|v| !v.is_empty())
        };

        let Some(url) = pick(&self.env.url, file.url) else {
            return Ok(None);
        };
        let api_key = pick(&self.env.api_key, file.api_key);
        let session_id = pick(&self.env.session_id, file.session_id);
        let username = pick(&self.env.username, file.username);
        let password = pick(&self.env.password, file.password);

        let method = if api_key.is_some() {
            AuthMethod::ApiKey
        } else if username.is_some() && password.is_some() {
            AuthMethod::Credentials
        } else if session_id.is_some() {
            AuthMethod::SessionToken
        } else if let Some(method) = file.auth_method.filter(|m| !m.is_empty()) {
            method.parse()?
        } else {
            return Ok(None);
        };

        let mut credential = Credential::new(BaseUrl::new(&url)?, method).with_profile(profile);
        if let Some(key) = api_key {
            credential = credential.with_api_key(key);
        }
        if let Some(token) = session_id {
            credential = credential.with_session_token(token);
        }
        if let (Some(user), Some(pass)) = (username, password) {
            credential = credential.with_login(user, pass);
        }

        debug!(profile, auth_method = %method, "resolved credential");
        Ok(Some(credential))
    }

    /// Write a credential into its profile table, replacing the table.
    pub fn save(&self, credential: &Credential) -> Result<()> {
        let mut file = self.read_file()?;
        file.insert(credential.profile().to_string(), profile_config(credential));
        self.write_file(&file)
    }

    /// Remove a profile. Deletes the file when no profiles remain.
    /// Returns whether the profile existed.
    pub fn remove_profile(&self, profile: &str) -> Result<bool> {
        let mut file = self.read_file()?;
        if file.remove(profile).is_none() {
            return Ok(false);
        }

        if file.is_empty() {
            fs::remove_file(&self.path).map_err(|e| ConfigError::Write {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;
        } else {
            self.write_file(&file)?;
        }
        Ok(true)
    }

    /// Store a new session token in an existing profile table. Profiles
    /// that exist only in the environment are left alone.
    #[instrument(skip(self, token))]
    pub fn update_session_id(&self, token: &str, profile: &str) -> Result<()> {
        let mut file = self.read_file()?;
        let Some(entry) = file.get_mut(profile) else {
            debug!("profile not in config file, session not persisted");
            return Ok(());
        };
        entry.session_id = Some(token.to_string());
        self.write_file(&file)?;
        debug!("session persisted");
        Ok(())
    }

    fn read_file(&self) -> Result<ConfigFile> {
        if !self.path.exists() {
            return Ok(ConfigFile::new());
        }

        let text = fs::read_to_string(&self.path).map_err(|e| ConfigError::Read {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;
        toml::from_str(&text).map_err(|e| {
            ConfigError::Parse {
                path: self.path.display().to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    fn write_file(&self, file: &ConfigFile) -> Result<()> {
        let write_error = |message: String| ConfigError::Write {
            path: self.path.display().to_string(),
            message,
        };

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| write_error(e.to_string()))?;
        }
        let text = toml::to_string(file).map_err(|e| write_error(e.to_string()))?;
        fs::write(&self.path, text).map_err(|e| write_error(e.to_string()))?;

        #[cfg(unix)]
        {
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&self.path, perms).map_err(|e| write_error(e.to_string()))?;
        }

        Ok(())
    }
}

#[async_trait]
impl SessionStore for ConfigStore {
    async fn load(&self, profile: &str) -> Result<Option<Credential>> {
        self.resolve(profile)
    }

    async fn persist_session_token(&self, token: &str, profile: &str) -> Result<()> {
        self.update_session_id(token, profile)
    }
}

fn profile_config(credential: &Credential) -> ProfileConfig {
    ProfileConfig {
        url: Some(credential.base_url().to_string()),
        auth_method: Some(credential.auth_method().to_string()),
        api_key: credential.api_key_secret().map(|s| s.expose().to_string()),
        session_id: credential
            .session_token_secret()
            .map(|s| s.expose().to_string()),
        username: credential.username().map(str::to_string),
        password: credential.password().map(|s| s.expose().to_string()),
    }
}
