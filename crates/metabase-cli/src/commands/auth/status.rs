//! Status command implementation.

use anyhow::Result;
use clap::Args;
use serde_json::{Value, json};

use metabase_client::Auth;

use crate::context::AppContext;
use crate::output::{self, CliError};

#[derive(Args, Debug)]
pub struct StatusArgs {}

pub async fn run(_args: StatusArgs, ctx: &AppContext) -> Result<()> {
    let Some(credential) = ctx.credential()? else {
        if ctx.json {
            return output::envelope(&json!({"authenticated": false}));
        }
        output::note("Not authenticated. Run 'metabase auth login' to authenticate.");
        return Ok(());
    };

    let url = credential.base_url().as_str().to_string();
    let method = credential.auth_method().as_str();

    let mut engine = ctx.engine_for(credential);
    let user = {
        let mut auth = Auth::new(&mut engine);
        match auth.session_properties().await {
            Ok(_) => auth.current_user().await,
            Err(e) => Err(e),
        }
    };

    let user = match user {
        Ok(user) => user,
        Err(e) if e.is_authentication() => {
            if ctx.json {
                output::envelope(&json!({
                    "authenticated": false,
                    "auth_method": method,
                    "instance_url": url,
                    "error": "Session expired or invalid",
                }))?;
            } else {
                output::error("Session expired or invalid");
                output::field("Instance", &url);
                output::field("Auth method", method);
                output::note("Run 'metabase auth login' to re-authenticate.");
            }
            return Err(CliError::Reported.into());
        }
        Err(e) => return Err(e.into()),
    };

    if ctx.json {
        return output::envelope(&json!({
            "authenticated": true,
            "auth_method": method,
            "user": {
                "id": user.get("id"),
                "email": user.get("email"),
                "first_name": user.get("first_name"),
                "last_name": user.get("last_name"),
                "is_superuser": user.get("is_superuser").and_then(Value::as_bool).unwrap_or(false),
            },
            "instance_url": url,
        }));
    }

    output::success(&format!(
        "Authenticated as {}",
        user.get("email").and_then(Value::as_str).unwrap_or("Unknown")
    ));
    let name = format!(
        "{} {}",
        output::text(&user["first_name"]),
        output::text(&user["last_name"])
    );
    if !name.trim().is_empty() {
        output::field("Name", name.trim());
    }
    output::field("Instance", &url);
    output::field("Auth method", method);
    if user.get("is_superuser").and_then(Value::as_bool).unwrap_or(false) {
        output::field("Role", "superuser");
    }

    Ok(())
}
