//! CLI argument definitions.

use clap::{Parser, Subcommand};

use metabase_core::credential::DEFAULT_PROFILE;

use crate::commands::auth::AuthCommand;
use crate::commands::cards::CardsCommand;
use crate::commands::collections::CollectionsCommand;
use crate::commands::dashboards::DashboardsCommand;
use crate::commands::databases::DatabasesCommand;
use crate::commands::resolve::ResolveArgs;
use crate::commands::search::SearchArgs;

/// Command-line interface for Metabase.
#[derive(Parser, Debug)]
#[command(name = "metabase")]
#[command(author, version = env!("METABASE_CLI_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration profile to use
    #[arg(short, long, global = true, default_value = DEFAULT_PROFILE)]
    pub profile: String,

    /// Print results as a JSON envelope
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authentication and stored profiles
    Auth(AuthCommand),

    /// Database operations
    Databases(DatabasesCommand),

    /// Collection operations
    Collections(CollectionsCommand),

    /// Card (saved question) operations
    #[command(alias = "queries", alias = "questions")]
    Cards(CardsCommand),

    /// Dashboard operations
    Dashboards(DashboardsCommand),

    /// Search across all entities
    Search(SearchArgs),

    /// Look up the entity behind a Metabase URL
    Resolve(ResolveArgs),
}
