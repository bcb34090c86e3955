//! Dashboard subcommands.

mod export;
mod import;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::{Value, json};

use metabase_client::{Cards, Dashboards};

use crate::commands::confirm;
use crate::context::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct DashboardsCommand {
    #[command(subcommand)]
    pub command: DashboardsSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum DashboardsSubcommand {
    /// List dashboards
    List {
        /// Only dashboards in this collection
        #[arg(long)]
        collection_id: Option<i64>,
    },

    /// Show a dashboard and its dashcards
    Get {
        /// Dashboard ID
        id: i64,

        /// Also fetch the full definition of every card
        #[arg(long)]
        include_cards: bool,
    },

    /// Export a dashboard with every card it references
    Export(export::ExportArgs),

    /// Import a dashboard from an export manifest or dashboard file
    Import(import::ImportArgs),

    /// Archive a dashboard (soft delete)
    Archive {
        /// Dashboard ID
        id: i64,
    },

    /// Permanently delete a dashboard
    Delete {
        /// Dashboard ID
        id: i64,

        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },

    /// List dashboard revisions
    Revisions {
        /// Dashboard ID
        id: i64,
    },

    /// Revert a dashboard to an earlier revision
    Revert {
        /// Dashboard ID
        id: i64,

        /// Revision ID to revert to
        revision_id: i64,
    },
}

pub async fn handle(cmd: DashboardsCommand, ctx: &AppContext) -> Result<()> {
    match cmd.command {
        DashboardsSubcommand::List { collection_id } => list(collection_id, ctx).await,
        DashboardsSubcommand::Get { id, include_cards } => get(id, include_cards, ctx).await,
        DashboardsSubcommand::Export(args) => export::run(args, ctx).await,
        DashboardsSubcommand::Import(args) => import::run(args, ctx).await,
        DashboardsSubcommand::Archive { id } => archive(id, ctx).await,
        DashboardsSubcommand::Delete { id, force } => delete(id, force, ctx).await,
        DashboardsSubcommand::Revisions { id } => revisions(id, ctx).await,
        DashboardsSubcommand::Revert { id, revision_id } => revert(id, revision_id, ctx).await,
    }
}

/// Dashcards live under `dashcards` on current servers and
/// `ordered_cards` on older ones.
pub(crate) fn dashcards(dashboard: &Value) -> &[Value] {
    dashboard["dashcards"]
        .as_array()
        .or_else(|| dashboard["ordered_cards"].as_array())
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Distinct card ids referenced by a dashboard, in dashcard order.
/// Text and heading cards have no card and are skipped.
pub(crate) fn card_ids(dashboard: &Value) -> Vec<i64> {
    let mut ids = Vec::new();
    for dashcard in dashcards(dashboard) {
        let id = dashcard["card_id"]
            .as_i64()
            .or_else(|| dashcard["card"]["id"].as_i64());
        if let Some(id) = id
            && !ids.contains(&id)
        {
            ids.push(id);
        }
    }
    ids
}

async fn list(collection_id: Option<i64>, ctx: &AppContext) -> Result<()> {
    let mut engine = ctx.engine()?;
    let dashboards = Dashboards::new(&mut engine)
        .list(collection_id)
        .await
        .context("Failed to list dashboards")?;

    if ctx.json {
        let list: Vec<Value> = dashboards
            .iter()
            .map(|d| {
                json!({
                    "id": d["id"],
                    "name": d["name"],
                    "description": d["description"],
                    "collection_id": d["collection"]["id"],
                    "collection_path": output::collection_path_parts(d),
                })
            })
            .collect();
        return output::envelope(&json!({"dashboards": list}));
    }

    if dashboards.is_empty() {
        output::note("No dashboards found.");
        return Ok(());
    }
    let mut table = output::table(["ID", "Name", "Collection"]);
    for d in &dashboards {
        table.add_row(vec![
            output::text(&d["id"]),
            output::text(&d["name"]),
            output::collection_path(d),
        ]);
    }
    output::print_table(&table);
    Ok(())
}

async fn get(id: i64, include_cards: bool, ctx: &AppContext) -> Result<()> {
    let mut engine = ctx.engine()?;
    let mut dashboard = Dashboards::new(&mut engine)
        .get(id)
        .await
        .context("Failed to get dashboard")?;

    if include_cards {
        let mut cards = Vec::new();
        for card_id in card_ids(&dashboard) {
            let card = Cards::new(&mut engine)
                .get(card_id)
                .await
                .with_context(|| format!("Failed to get card {}", card_id))?;
            cards.push(card);
        }
        if let Some(obj) = dashboard.as_object_mut() {
            obj.insert("cards".into(), Value::Array(cards));
        }
    }

    if ctx.json {
        return output::envelope(&dashboard);
    }

    output::field("Dashboard", &output::text(&dashboard["name"]));
    output::field("ID", &id.to_string());
    output::field("Collection", &output::collection_path(&dashboard));
    if let Some(description) = dashboard["description"].as_str().filter(|d| !d.is_empty()) {
        output::field("Description", description);
    }
    let parameters: Vec<String> = dashboard["parameters"]
        .as_array()
        .map(|ps| ps.iter().map(parameter_name).collect())
        .unwrap_or_default();
    if !parameters.is_empty() {
        output::field("Parameters", &parameters.join(", "));
    }

    let items = dashcards(&dashboard);
    println!();
    if items.is_empty() {
        output::note("No cards on this dashboard.");
        return Ok(());
    }
    let mut table = output::table(["Dashcard", "Card ID", "Card", "Position", "Size"]);
    for dc in items {
        table.add_row(vec![
            output::text(&dc["id"]),
            output::text(&dc["card_id"]),
            output::text(&dc["card"]["name"]),
            format!("{},{}", output::text(&dc["row"]), output::text(&dc["col"])),
            format!("{}x{}", output::text(&dc["size_x"]), output::text(&dc["size_y"])),
        ]);
    }
    output::print_table(&table);
    Ok(())
}

pub(crate) fn parameter_name(parameter: &Value) -> String {
    parameter["name"]
        .as_str()
        .or_else(|| parameter["slug"].as_str())
        .unwrap_or("?")
        .to_string()
}

async fn archive(id: i64, ctx: &AppContext) -> Result<()> {
    let mut engine = ctx.engine()?;
    let dashboard = Dashboards::new(&mut engine)
        .archive(id)
        .await
        .context("Failed to archive dashboard")?;

    if ctx.json {
        return output::envelope(&json!({"id": id, "name": dashboard["name"], "archived": true}));
    }
    output::success(&format!("Dashboard {} archived", id));
    Ok(())
}

async fn delete(id: i64, force: bool, ctx: &AppContext) -> Result<()> {
    let mut engine = ctx.engine()?;
    let mut dashboards = Dashboards::new(&mut engine);
    let dashboard = dashboards.get(id).await.context("Failed to get dashboard")?;
    let name = dashboard["name"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| format!("Dashboard {}", id));

    if !force
        && !ctx.json
        && !confirm(&format!(
            "Permanently delete dashboard '{}' (ID: {})?",
            name, id
        ))?
    {
        output::note("Deletion cancelled.");
        return Ok(());
    }

    dashboards
        .delete(id)
        .await
        .context("Failed to delete dashboard")?;

    if ctx.json {
        return output::envelope(&json!({"id": id, "name": name, "deleted": true}));
    }
    output::success(&format!("Dashboard {} deleted", id));
    Ok(())
}

async fn revisions(id: i64, ctx: &AppContext) -> Result<()> {
    let mut engine = ctx.engine()?;
    let revisions = Dashboards::new(&mut engine)
        .revisions(id)
        .await
        .context("Failed to list revisions")?;

    if ctx.json {
        return output::envelope(&json!({"dashboard_id": id, "revisions": revisions}));
    }
    if revisions.is_empty() {
        output::note("No revisions found.");
        return Ok(());
    }
    let mut table = output::table(["ID", "When", "User", "Description"]);
    for r in &revisions {
        table.add_row(vec![
            output::text(&r["id"]),
            output::text(&r["timestamp"]),
            output::text(&r["user"]["common_name"]),
            output::text(&r["description"]),
        ]);
    }
    output::print_table(&table);
    Ok(())
}

async fn revert(id: i64, revision_id: i64, ctx: &AppContext) -> Result<()> {
    let mut engine = ctx.engine()?;
    let result = Dashboards::new(&mut engine)
        .revert(id, revision_id)
        .await
        .context("Failed to revert dashboard")?;

    if ctx.json {
        return output::envelope(&json!({
            "dashboard_id": id,
            "revision_id": revision_id,
            "result": result,
        }));
    }
    output::success(&format!(
        "Dashboard {} reverted to revision {}",
        id, revision_id
    ));
    Ok(())
}
