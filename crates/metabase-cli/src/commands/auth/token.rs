//! Token command implementation.

use anyhow::Result;
use clap::Args;
use serde_json::json;

use metabase_core::AuthMethod;

use crate::context::AppContext;
use crate::output::{self, CliError};

#[derive(Args, Debug)]
pub struct TokenArgs {}

pub async fn run(_args: TokenArgs, ctx: &AppContext) -> Result<()> {
    let credential = ctx.require_credential()?;

    let (secret, missing) = match credential.auth_method() {
        AuthMethod::ApiKey => (credential.api_key_secret(), "No API key configured"),
        _ => (credential.session_token_secret(), "No session ID available"),
    };
    let token = secret
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CliError::Coded {
            code: "AUTHENTICATION_FAILED",
            message: missing.to_string(),
            details: None,
        })?;

    if ctx.json {
        return output::envelope(&json!({
            "auth_method": credential.auth_method().as_str(),
            "token": token.expose(),
        }));
    }

    println!("{}", token.expose());
    Ok(())
}
