//! Login command implementation.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use metabase_client::Auth;
use metabase_core::{AuthMethod, BaseUrl, Credential, Secret};

use crate::commands::{prompt, prompt_secret};
use crate::context::AppContext;
use crate::output::{self, CliError};

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Metabase instance URL (https:// is assumed when omitted)
    #[arg(long)]
    pub url: Option<String>,

    /// Auth method: api_key, session_id or credentials
    #[arg(long)]
    pub method: Option<String>,

    /// API key (prompted when omitted)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Existing session ID (prompted when omitted)
    #[arg(long)]
    pub session_id: Option<String>,

    /// Username or email (prompted when omitted)
    #[arg(long)]
    pub username: Option<String>,

    /// Password (prompted when omitted)
    #[arg(long)]
    pub password: Option<String>,
}

pub async fn run(args: LoginArgs, ctx: &AppContext) -> Result<()> {
    let url = match args.url {
        Some(url) => url,
        None => prompt("Metabase URL", None)?,
    };
    let base_url = BaseUrl::with_default_scheme(&url).context("Invalid Metabase URL")?;

    let method = match args.method {
        Some(method) => parse_method(&method)?,
        None => prompt_method()?,
    };

    let credential = match method {
        AuthMethod::ApiKey => {
            let key = or_prompt_secret(args.api_key, "API Key")?;
            let credential = Credential::api_key(base_url, key).with_profile(&ctx.profile);
            validate(ctx, credential, "API key").await?
        }
        AuthMethod::SessionToken => {
            let token = or_prompt_secret(args.session_id, "Session ID")?;
            let credential = Credential::session_token(base_url, token).with_profile(&ctx.profile);
            validate(ctx, credential, "session ID").await?
        }
        AuthMethod::Credentials => {
            let username = match args.username {
                Some(username) => username,
                None => prompt("Username (email)", None)?,
            };
            let password = Secret::new(or_prompt_secret(args.password, "Password")?);

            let mut credential = Credential::credentials(base_url, username.clone(), password.clone())
                .with_profile(&ctx.profile);
            if !ctx.json {
                output::note("Authenticating...");
            }
            let mut engine = ctx.engine_for(credential.clone());
            let session = Auth::new(&mut engine)
                .login(&username, &password)
                .await
                .context("Authentication failed")?;
            let id = session
                .get("id")
                .and_then(|v| v.as_str())
                .filter(|id| !id.is_empty())
                .ok_or_else(|| CliError::Coded {
                    code: "AUTHENTICATION_FAILED",
                    message: "No session ID in response".to_string(),
                    details: None,
                })?;
            credential.set_session_token(id);
            credential
        }
    };

    ctx.store.save(&credential).context("Failed to save configuration")?;

    if ctx.json {
        return output::envelope(&json!({
            "profile": ctx.profile,
            "url": credential.base_url().as_str(),
            "auth_method": credential.auth_method().as_str(),
            "config_path": ctx.store.path().display().to_string(),
        }));
    }

    output::success("Logged in successfully");
    println!();
    output::field("Profile", &ctx.profile);
    output::field("Instance", credential.base_url().as_str());
    output::field("Auth method", credential.auth_method().as_str());
    output::field("Saved to", &ctx.store.path().display().to_string());

    Ok(())
}

/// Check a static secret against `/session/properties` before saving it.
async fn validate(ctx: &AppContext, credential: Credential, what: &str) -> Result<Credential> {
    if !ctx.json {
        output::note(&format!("Validating {}...", what));
    }
    let mut engine = ctx.engine_for(credential.clone());
    Auth::new(&mut engine)
        .session_properties()
        .await
        .with_context(|| format!("Invalid {}", what))?;
    Ok(credential)
}

fn parse_method(value: &str) -> Result<AuthMethod> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "api_key" => Ok(AuthMethod::ApiKey),
        "2" | "session_id" | "session_token" => Ok(AuthMethod::SessionToken),
        "3" | "credentials" => Ok(AuthMethod::Credentials),
        other => Err(CliError::validation(format!(
            "Invalid auth method: {}. Use api_key, session_id, or credentials.",
            other
        ))
        .into()),
    }
}

fn prompt_method() -> Result<AuthMethod> {
    eprintln!("Select authentication method:");
    eprintln!("  1. api_key     - Use a Metabase API key");
    eprintln!("  2. session_id  - Use an existing session ID");
    eprintln!("  3. credentials - Use username and password");
    let choice = prompt("Enter choice (1-3)", Some("1"))?;
    parse_method(&choice)
}

fn or_prompt_secret(value: Option<String>, label: &str) -> Result<String> {
    match value.filter(|v| !v.is_empty()) {
        Some(value) => Ok(value),
        None => prompt_secret(label),
    }
}
