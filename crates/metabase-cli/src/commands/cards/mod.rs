//! Card (saved question) subcommands.

mod export;
pub(crate) mod import;
mod run;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::{Value, json};

use metabase_client::{CardFilter, Cards};

use crate::commands::confirm;
use crate::context::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct CardsCommand {
    #[command(subcommand)]
    pub command: CardsSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum CardsSubcommand {
    /// List cards
    List(ListArgs),

    /// Show a card including its query definition
    Get {
        /// Card ID
        id: i64,
    },

    /// Run a card's query and save the results as JSON and CSV
    Run(run::RunArgs),

    /// Export a card definition to a file
    Export(export::ExportArgs),

    /// Create or update a card from a JSON definition
    Import(import::ImportArgs),

    /// Archive a card (soft delete)
    Archive {
        /// Card ID
        id: i64,
    },

    /// Permanently delete a card
    Delete {
        /// Card ID
        id: i64,

        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Filter: all, mine, bookmarked, archived, database, table, using_model
    #[arg(long = "filter")]
    pub filter: Option<String>,

    /// Only cards in this collection
    #[arg(long)]
    pub collection_id: Option<i64>,

    /// Only cards using this database (with --filter database)
    #[arg(long)]
    pub database_id: Option<i64>,
}

pub async fn handle(cmd: CardsCommand, ctx: &AppContext) -> Result<()> {
    match cmd.command {
        CardsSubcommand::List(args) => list(args, ctx).await,
        CardsSubcommand::Get { id } => get(id, ctx).await,
        CardsSubcommand::Run(args) => run::run(args, ctx).await,
        CardsSubcommand::Export(args) => export::run(args, ctx).await,
        CardsSubcommand::Import(args) => import::run(args, ctx).await,
        CardsSubcommand::Archive { id } => archive(id, ctx).await,
        CardsSubcommand::Delete { id, force } => delete(id, force, ctx).await,
    }
}

async fn list(args: ListArgs, ctx: &AppContext) -> Result<()> {
    let mut engine = ctx.engine()?;
    let filter = CardFilter {
        f: args.filter,
        collection_id: args.collection_id,
        database_id: args.database_id,
    };
    let cards = Cards::new(&mut engine)
        .list(&filter)
        .await
        .context("Failed to list cards")?;

    if ctx.json {
        let cards: Vec<Value> = cards.iter().map(list_entry).collect();
        return output::envelope(&json!({"cards": cards}));
    }

    if cards.is_empty() {
        output::note("No cards found.");
        return Ok(());
    }
    let mut table = output::table(["ID", "Name", "Display", "Collection"]);
    for card in &cards {
        let collection = match card["collection"]["name"].as_str() {
            Some(name) => name.to_string(),
            None if !card["collection_id"].is_null() => {
                format!("(ID: {})", output::text(&card["collection_id"]))
            }
            None => String::new(),
        };
        table.add_row(vec![
            output::text(&card["id"]),
            output::text(&card["name"]),
            output::text(&card["display"]),
            collection,
        ]);
    }
    output::print_table(&table);
    Ok(())
}

fn list_entry(card: &Value) -> Value {
    let mut entry = json!({
        "id": card["id"],
        "name": card["name"],
        "display": card["display"],
        "collection_id": card["collection_id"],
        "database_id": card["database_id"],
        "archived": card["archived"].as_bool().unwrap_or(false),
    });
    if card["collection"].is_object() {
        entry["collection_name"] = card["collection"]["name"].clone();
    }
    entry
}

async fn get(id: i64, ctx: &AppContext) -> Result<()> {
    let mut engine = ctx.engine()?;
    let card = Cards::new(&mut engine)
        .get(id)
        .await
        .context("Failed to get card")?;

    if ctx.json {
        let collection = card["collection"].is_object().then(|| {
            json!({
                "id": card["collection"]["id"],
                "name": card["collection"]["name"],
                "path": output::collection_path_parts(&card),
            })
        });
        return output::envelope(&json!({
            "id": card["id"],
            "name": card["name"],
            "description": card["description"],
            "collection_id": card["collection_id"],
            "collection": collection,
            "database_id": card["database_id"],
            "dataset_query": card["dataset_query"],
            "display": card["display"],
            "visualization_settings": card["visualization_settings"],
            "parameters": card["parameters"],
            "created_at": card["created_at"],
            "updated_at": card["updated_at"],
        }));
    }

    output::field("Card", card["name"].as_str().unwrap_or("Unknown"));
    output::field("ID", &output::text(&card["id"]));
    output::field("Display", &output::text(&card["display"]));
    if let Some(description) = card["description"].as_str().filter(|d| !d.is_empty()) {
        output::field("Description", description);
    }
    if card["collection"].is_object() {
        output::field(
            "Collection",
            &format!(
                "{} (ID: {})",
                output::collection_path(&card),
                output::text(&card["collection_id"])
            ),
        );
    } else if !card["collection_id"].is_null() {
        output::field("Collection ID", &output::text(&card["collection_id"]));
    }
    output::field("Database ID", &output::text(&card["database_id"]));

    let query = &card["dataset_query"];
    let query_type = query["type"].as_str().unwrap_or("unknown");
    output::field("Query Type", query_type);
    match query_type {
        "native" => {
            if let Some(sql) = query["native"]["query"].as_str().filter(|q| !q.is_empty()) {
                println!("\nQuery:\n{}", sql);
            }
        }
        "query" if !query["query"].is_null() => {
            println!("\nMBQL Query:");
            output::json_pretty(&query["query"])?;
        }
        _ => {}
    }
    if card["archived"].as_bool().unwrap_or(false) {
        output::note("\nThis card is archived");
    }
    Ok(())
}

async fn archive(id: i64, ctx: &AppContext) -> Result<()> {
    let mut engine = ctx.engine()?;
    let card = Cards::new(&mut engine)
        .archive(id)
        .await
        .context("Failed to archive card")?;

    if ctx.json {
        return output::envelope(&json!({"id": id, "name": card["name"], "archived": true}));
    }
    output::success(&format!("Card {} archived", id));
    Ok(())
}

async fn delete(id: i64, force: bool, ctx: &AppContext) -> Result<()> {
    let mut engine = ctx.engine()?;
    let mut cards = Cards::new(&mut engine);
    let card = cards.get(id).await.context("Failed to get card")?;
    let name = card["name"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| format!("Card {}", id));

    if !force
        && !ctx.json
        && !confirm(&format!(
            "Permanently delete card '{}' (ID: {})?",
            name, id
        ))?
    {
        output::note("Deletion cancelled.");
        return Ok(());
    }

    cards.delete(id).await.context("Failed to delete card")?;

    if ctx.json {
        return output::envelope(&json!({"id": id, "name": name, "deleted": true}));
    }
    output::success(&format!("Card {} deleted", id));
    Ok(())
}
