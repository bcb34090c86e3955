//! Logout command implementation.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;
use tracing::debug;

use metabase_client::Auth;
use metabase_core::AuthMethod;

use crate::context::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub async fn run(_args: LogoutArgs, ctx: &AppContext) -> Result<()> {
    let Some(credential) = ctx.credential()? else {
        if ctx.json {
            return output::envelope(&json!({"profile": ctx.profile, "removed": false}));
        }
        output::note("No configuration found for this profile.");
        return Ok(());
    };

    let mut invalidated = false;
    if credential.auth_method() != AuthMethod::ApiKey
        && let Some(token) = credential.session_token_secret().cloned()
    {
        let mut engine = ctx.engine_for(credential.clone());
        match Auth::new(&mut engine).logout(&token).await {
            Ok(()) => invalidated = true,
            Err(e) => debug!(error = %e, "could not invalidate session on server"),
        }
    }

    let removed = ctx
        .store
        .remove_profile(&ctx.profile)
        .context("Failed to update configuration")?;

    if ctx.json {
        return output::envelope(&json!({
            "profile": ctx.profile,
            "session_invalidated": invalidated,
            "removed": removed,
        }));
    }

    if invalidated {
        output::success("Session invalidated on server");
    } else if credential.auth_method() != AuthMethod::ApiKey {
        output::note("Could not invalidate session on server (may already be expired).");
    }
    if removed {
        output::success(&format!("Profile '{}' has been removed", ctx.profile));
    } else {
        output::note(&format!("Profile '{}' not found in config file.", ctx.profile));
    }

    Ok(())
}
