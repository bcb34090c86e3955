//! Authentication subcommands.

mod login;
mod logout;
mod status;
mod token;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::context::AppContext;

#[derive(Args, Debug)]
pub struct AuthCommand {
    #[command(subcommand)]
    pub command: AuthSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthSubcommand {
    /// Authenticate and store credentials in the active profile
    Login(login::LoginArgs),

    /// Invalidate the session and remove the active profile
    Logout(logout::LogoutArgs),

    /// Show the current authentication status
    Status(status::StatusArgs),

    /// Print the API key or session token (for piping)
    Token(token::TokenArgs),
}

pub async fn handle(cmd: AuthCommand, ctx: &AppContext) -> Result<()> {
    match cmd.command {
        AuthSubcommand::Login(args) => login::run(args, ctx).await,
        AuthSubcommand::Logout(args) => logout::run(args, ctx).await,
        AuthSubcommand::Status(args) => status::run(args, ctx).await,
        AuthSubcommand::Token(args) => token::run(args, ctx).await,
    }
}
