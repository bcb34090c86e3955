//! Export a dashboard together with the cards it references.
//!
//! Layout of the export directory:
//!
//! ```text
//! metabase-20260205-183500/
//!   manifest.json          envelope of type "manifest"
//!   dashboard-7.json       envelope of type "dashboard"
//!   card-12.json           envelope of type "card", one per referenced card
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::{Value, json};
use tracing::info;

use metabase_client::{Cards, Dashboards};
use metabase_core::export;

use super::card_ids;
use crate::context::AppContext;
use crate::output;

pub(crate) const MANIFEST_FILE: &str = "manifest.json";
pub(crate) const MANIFEST_TYPE: &str = "manifest";

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Dashboard ID
    pub id: i64,

    /// Directory in which the timestamped export directory is created
    #[arg(long, default_value_os_t = std::env::temp_dir())]
    pub output_dir: PathBuf,
}

pub async fn run(args: ExportArgs, ctx: &AppContext) -> Result<()> {
    let mut engine = ctx.engine()?;
    let dashboard = Dashboards::new(&mut engine)
        .get(args.id)
        .await
        .context("Failed to get dashboard")?;

    let mut cards = Vec::new();
    for card_id in card_ids(&dashboard) {
        let card = Cards::new(&mut engine)
            .get(card_id)
            .await
            .with_context(|| format!("Failed to get card {}", card_id))?;
        cards.push(card);
    }

    let url = engine.credential().base_url().as_str().to_string();
    let dir = export::create_export_dir(&args.output_dir)
        .context("Failed to create export directory")?;

    let dashboard_file = format!("dashboard-{}.json", args.id);
    let source = json!({"url": url, "dashboard_id": args.id});
    export::write_export_file(&dir, &dashboard_file, &dashboard, "dashboard", Some(&source))?;

    let mut card_entries = Vec::new();
    for card in &cards {
        let id = card["id"].as_i64().unwrap_or_default();
        let file = format!("card-{}.json", id);
        let source = json!({"url": url, "card_id": id});
        export::write_export_file(&dir, &file, card, "card", Some(&source))?;
        card_entries.push(json!({"id": id, "name": card["name"], "file": file}));
    }

    let manifest = json!({
        "dashboard": {"id": args.id, "name": dashboard["name"], "file": dashboard_file},
        "cards": card_entries,
    });
    let manifest_path =
        export::write_export_file(&dir, MANIFEST_FILE, &manifest, MANIFEST_TYPE, Some(&source))?;
    info!(dir = %dir.display(), cards = cards.len(), "dashboard exported");

    if ctx.json {
        return output::envelope(&json!({
            "dashboard_id": args.id,
            "dashboard_name": dashboard["name"],
            "directory": dir.display().to_string(),
            "manifest": manifest_path.display().to_string(),
            "card_count": cards.len(),
        }));
    }

    output::success(&format!(
        "Exported dashboard {}: {}",
        args.id,
        output::text(&dashboard["name"])
    ));
    output::field("Cards", &cards.len().to_string());
    output::field("Directory", &dir.display().to_string());
    output::field("Manifest", &manifest_path.display().to_string());
    Ok(())
}

/// File names listed in a manifest payload: the dashboard file first,
/// then one per card.
pub(crate) fn manifest_files(manifest: &Value) -> (Option<String>, Vec<String>) {
    let dashboard = manifest["dashboard"]["file"].as_str().map(str::to_string);
    let cards = manifest["cards"]
        .as_array()
        .map(|cards| {
            cards
                .iter()
                .filter_map(|c| c["file"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    (dashboard, cards)
}
