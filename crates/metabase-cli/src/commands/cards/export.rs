//! Export a card definition.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use metabase_client::Cards;
use metabase_core::export;

use crate::context::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Card ID
    pub id: i64,

    /// Directory in which the timestamped export directory is created
    #[arg(long, default_value_os_t = std::env::temp_dir())]
    pub output_dir: PathBuf,
}

pub async fn run(args: ExportArgs, ctx: &AppContext) -> Result<()> {
    let mut engine = ctx.engine()?;
    let card = Cards::new(&mut engine)
        .get(args.id)
        .await
        .context("Failed to get card")?;

    let source = json!({
        "url": engine.credential().base_url().as_str(),
        "card_id": args.id,
    });
    let dir = export::create_export_dir(&args.output_dir)
        .context("Failed to create export directory")?;
    let path = export::write_export_file(
        &dir,
        &format!("card-{}.json", args.id),
        &card,
        "card",
        Some(&source),
    )?;

    if ctx.json {
        return output::envelope(&json!({
            "card_id": args.id,
            "card_name": card["name"],
            "file": path.display().to_string(),
        }));
    }

    output::success(&format!(
        "Exported card {}: {}",
        args.id,
        output::text(&card["name"])
    ));
    output::field("File", &path.display().to_string());
    Ok(())
}
