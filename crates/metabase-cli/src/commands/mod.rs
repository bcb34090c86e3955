//! Command implementations.

pub mod auth;
pub mod cards;
pub mod collections;
pub mod dashboards;
pub mod databases;
pub mod resolve;
pub mod search;

use anyhow::Result;

use crate::cli::Commands;
use crate::context::AppContext;

pub async fn handle(command: Commands, ctx: &AppContext) -> Result<()> {
    match command {
        Commands::Auth(cmd) => auth::handle(cmd, ctx).await,
        Commands::Databases(cmd) => databases::handle(cmd, ctx).await,
        Commands::Collections(cmd) => collections::handle(cmd, ctx).await,
        Commands::Cards(cmd) => cards::handle(cmd, ctx).await,
        Commands::Dashboards(cmd) => dashboards::handle(cmd, ctx).await,
        Commands::Search(args) => search::run(args, ctx).await,
        Commands::Resolve(args) => resolve::run(args, ctx).await,
    }
}

/// Ask a yes/no question on stderr. Anything but `y`/`yes` is a no.
pub(crate) fn confirm(prompt: &str) -> Result<bool> {
    use std::io::{BufRead, Write};

    eprint!("{} [y/N]: ", prompt);
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// Read a line from stdin after printing `prompt`, falling back to
/// `default` when the answer is empty.
pub(crate) fn prompt(prompt: &str, default: Option<&str>) -> Result<String> {
    use std::io::{BufRead, Write};

    match default {
        Some(d) => eprint!("{} [{}]: ", prompt, d),
        None => eprint!("{}: ", prompt),
    }
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let answer = line.trim();
    if answer.is_empty() {
        Ok(default.unwrap_or_default().to_string())
    } else {
        Ok(answer.to_string())
    }
}

/// Read a secret without echo.
pub(crate) fn prompt_secret(prompt: &str) -> Result<String> {
    Ok(rpassword::prompt_password(format!("{}: ", prompt))?)
}
