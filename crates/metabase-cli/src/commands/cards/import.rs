//! Create or update a card from a JSON definition.

use std::io::{IsTerminal, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::{Value, json};

use metabase_client::Cards;
use metabase_core::export;

use crate::context::AppContext;
use crate::output::{self, CliError};

/// Server-assigned fields that are never sent back.
const READ_ONLY_FIELDS: &[&str] = &[
    "id",
    "creator",
    "created_at",
    "updated_at",
    "made_public_by_id",
    "public_uuid",
];

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Card JSON file, or '-' for stdin
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Update this card instead of creating a new one
    #[arg(long)]
    pub id: Option<i64>,

    /// Target collection (overrides the file)
    #[arg(long)]
    pub collection_id: Option<i64>,

    /// Target database (overrides the file)
    #[arg(long)]
    pub database_id: Option<i64>,
}

pub async fn run(args: ImportArgs, ctx: &AppContext) -> Result<()> {
    let text = read_input(args.file.as_ref())?;
    let card = export::parse_json(&text)?;
    let card = export::unwrap_export(card, "card");
    let card = prepare_card(card, args.id.is_none(), args.collection_id, args.database_id)?;

    let mut engine = ctx.engine()?;
    let mut cards = Cards::new(&mut engine);
    let (result, action) = match args.id {
        Some(id) => (
            cards.update(id, card).await.context("Failed to update card")?,
            "updated",
        ),
        None => (
            cards.create(card).await.context("Failed to create card")?,
            "created",
        ),
    };

    let summary = json!({"id": result["id"], "name": result["name"], "action": action});
    if ctx.json {
        return output::envelope(&summary);
    }
    output::json_pretty(&summary)
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path).map_err(|e| {
            anyhow::Error::from(CliError::file(format!(
                "Error reading {}: {}",
                path.display(),
                e
            )))
        }),
        _ => {
            let mut stdin = std::io::stdin();
            if stdin.is_terminal() {
                return Err(CliError::validation(
                    "No input provided. Use --file or pipe JSON to stdin.",
                )
                .into());
            }
            let mut text = String::new();
            stdin
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

/// Validate a card definition and apply target overrides.
///
/// New cards need `name` and `dataset_query`. A database override is also
/// written into `dataset_query.database`. Read-only server fields are
/// dropped.
pub(crate) fn prepare_card(
    card: Value,
    creating: bool,
    collection_id: Option<i64>,
    database_id: Option<i64>,
) -> Result<Value> {
    let Value::Object(mut card) = card else {
        return Err(CliError::validation("Card JSON must be an object.").into());
    };

    if creating {
        for field in ["name", "dataset_query"] {
            if !card.contains_key(field) {
                return Err(CliError::validation(format!(
                    "Card JSON must contain '{}' field.",
                    field
                ))
                .into());
            }
        }
    }

    if let Some(collection_id) = collection_id {
        card.insert("collection_id".into(), json!(collection_id));
    }
    if let Some(database_id) = database_id {
        if let Some(query) = card.get_mut("dataset_query").and_then(Value::as_object_mut) {
            query.insert("database".into(), json!(database_id));
        }
        card.insert("database_id".into(), json!(database_id));
    }

    for field in READ_ONLY_FIELDS {
        card.remove(*field);
    }

    Ok(Value::Object(card))
}
