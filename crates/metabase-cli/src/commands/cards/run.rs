//! Run a card and save its results.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::{Value, json};

use metabase_client::Cards;
use metabase_core::export;

use crate::context::AppContext;
use crate::output::{self, CliError};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Card ID
    pub id: i64,

    /// Query parameters as JSON
    #[arg(long)]
    pub parameters: Option<String>,

    /// Maximum number of rows
    #[arg(long, default_value_t = 2000)]
    pub limit: u64,

    /// Directory in which the timestamped export directory is created
    #[arg(long, default_value_os_t = std::env::temp_dir())]
    pub output_dir: PathBuf,
}

pub async fn run(args: RunArgs, ctx: &AppContext) -> Result<()> {
    let parameters = args
        .parameters
        .as_deref()
        .map(parse_parameters)
        .transpose()?;

    let mut engine = ctx.engine()?;
    let mut cards = Cards::new(&mut engine);

    let card = cards.get(args.id).await.context("Failed to get card")?;
    let name = card["name"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| format!("Card {}", args.id));

    let result = cards
        .run(args.id, parameters, Some(args.limit))
        .await
        .context("Failed to run card")?;
    let row_count = result["data"]["rows"].as_array().map(Vec::len).unwrap_or(0);

    let dir = export::create_export_dir(&args.output_dir)
        .context("Failed to create export directory")?;
    let json_path =
        export::write_json_file(&dir, &format!("card-{}-results.json", args.id), &result)?;
    let (headers, rows) = export::query_result_to_csv(&result);
    let csv_path = export::write_csv_file(
        &dir,
        &format!("card-{}-results.csv", args.id),
        &headers,
        &rows,
    )?;

    if ctx.json {
        return output::envelope(&json!({
            "card_id": args.id,
            "card_name": name,
            "row_count": row_count,
            "files": {
                "json": json_path.display().to_string(),
                "csv": csv_path.display().to_string(),
            },
        }));
    }

    output::success(&format!("Executed card {}: {}", args.id, name));
    output::field("Rows returned", &row_count.to_string());
    println!();
    println!("Output files:");
    println!("  - {}", json_path.display());
    println!("  - {}", csv_path.display());
    Ok(())
}

fn parse_parameters(text: &str) -> Result<Value> {
    serde_json::from_str(text)
        .map_err(|e| CliError::validation(format!("Invalid JSON in parameters: {}", e)).into())
}
