//! Import a dashboard, and optionally its cards, from export files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use metabase_client::{Cards, Dashboards};
use metabase_core::export;

use super::dashcards;
use super::export::{MANIFEST_TYPE, manifest_files};
use crate::commands::cards::import::prepare_card;
use crate::context::AppContext;
use crate::output::{self, CliError};

/// Dashcard layout fields carried over on import.
const DASHCARD_FIELDS: &[&str] = &[
    "row",
    "col",
    "size_x",
    "size_y",
    "visualization_settings",
    "series",
];

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// manifest.json from an export, or a single dashboard file
    #[arg(long)]
    pub file: PathBuf,

    /// Update this dashboard instead of creating a new one
    #[arg(long)]
    pub id: Option<i64>,

    /// Target collection for the dashboard and its cards
    #[arg(long)]
    pub collection_id: Option<i64>,

    /// Target database for the cards
    #[arg(long)]
    pub database_id: Option<i64>,

    /// Only import cards; skip the dashboard
    #[arg(long, conflicts_with = "dashboard_only")]
    pub cards_only: bool,

    /// Only import the dashboard; cards are assumed to exist
    #[arg(long)]
    pub dashboard_only: bool,

    /// Show what would be imported without making changes
    #[arg(long)]
    pub dry_run: bool,
}

/// The resources found in an import file.
#[derive(Debug, Default)]
struct Bundle {
    dashboard: Option<Value>,
    cards: Vec<Value>,
}

pub async fn run(args: ImportArgs, ctx: &AppContext) -> Result<()> {
    let bundle = load_bundle(&args.file)?;
    let cards: &[Value] = if args.dashboard_only { &[] } else { &bundle.cards };
    let dashboard = if args.cards_only {
        None
    } else {
        Some(bundle.dashboard.as_ref().ok_or_else(|| {
            CliError::validation("Import file does not contain a dashboard.")
        })?)
    };

    if args.dry_run {
        let plan = dry_run_plan(cards, dashboard, args.id);
        if ctx.json {
            return output::envelope(&plan);
        }
        print_plan(&plan);
        return Ok(());
    }

    let mut engine = ctx.engine()?;

    let mut mapping = HashMap::new();
    let mut imported_cards = Vec::new();
    for card in cards {
        let old_id = card["id"].as_i64();
        let prepared = prepare_card(card.clone(), true, args.collection_id, args.database_id)?;
        let created = Cards::new(&mut engine)
            .create(prepared)
            .await
            .with_context(|| format!("Failed to create card '{}'", output::text(&card["name"])))?;
        let new_id = created["id"].as_i64();
        if let (Some(old), Some(new)) = (old_id, new_id) {
            debug!(old, new, "card imported");
            mapping.insert(old, new);
        }
        imported_cards.push(json!({
            "source_id": old_id,
            "id": new_id,
            "name": created["name"],
        }));
    }

    let mut dashboard_result = Value::Null;
    if let Some(dashboard) = dashboard {
        let remapped = remap_dashcards(dashcards(dashboard), &mapping);
        let mut fields = dashboard_fields(dashboard, args.collection_id);
        let mut api = Dashboards::new(&mut engine);

        let (id, action) = match args.id {
            Some(id) => {
                fields.insert("dashcards".into(), Value::Array(remapped));
                api.update(id, Value::Object(fields))
                    .await
                    .context("Failed to update dashboard")?;
                (id, "updated")
            }
            None => {
                if !fields.contains_key("name") {
                    return Err(CliError::validation("Dashboard JSON must contain 'name' field.").into());
                }
                let created = api
                    .create(Value::Object(fields))
                    .await
                    .context("Failed to create dashboard")?;
                let id = created["id"].as_i64().ok_or_else(|| {
                    CliError::Coded {
                        code: "API_ERROR",
                        message: "Created dashboard has no id".to_string(),
                        details: None,
                    }
                })?;
                if !remapped.is_empty() {
                    api.update(id, json!({"dashcards": remapped}))
                        .await
                        .context("Failed to add cards to dashboard")?;
                }
                (id, "created")
            }
        };
        info!(id, action, cards = imported_cards.len(), "dashboard imported");
        dashboard_result = json!({"id": id, "name": dashboard["name"], "action": action});
    }

    let summary = json!({"cards": imported_cards, "dashboard": dashboard_result});
    if ctx.json {
        return output::envelope(&summary);
    }

    for card in &imported_cards {
        output::success(&format!(
            "Created card {} ({}) from {}",
            output::text(&card["id"]),
            output::text(&card["name"]),
            output::text(&card["source_id"])
        ));
    }
    if !dashboard_result.is_null() {
        output::success(&format!(
            "Dashboard {} {} ({})",
            output::text(&dashboard_result["id"]),
            output::text(&dashboard_result["action"]),
            output::text(&dashboard_result["name"])
        ));
    }
    Ok(())
}

/// Read a manifest and the files it lists, or a single dashboard file.
fn load_bundle(path: &Path) -> Result<Bundle> {
    let value = export::read_json_file(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    if value["type"] != MANIFEST_TYPE {
        return Ok(Bundle {
            dashboard: Some(export::unwrap_export(value, "dashboard")),
            cards: Vec::new(),
        });
    }

    let manifest = export::unwrap_export(value, MANIFEST_TYPE);
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let (dashboard_file, card_files) = manifest_files(&manifest);

    let dashboard = dashboard_file
        .map(|file| read_part(&dir.join(file), "dashboard"))
        .transpose()?;
    let cards = card_files
        .iter()
        .map(|file| read_part(&dir.join(file), "card"))
        .collect::<Result<Vec<_>>>()?;

    Ok(Bundle { dashboard, cards })
}

fn read_part(path: &Path, key: &str) -> Result<Value> {
    let value = export::read_json_file(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(export::unwrap_export(value, key))
}

/// Dashboard-level fields sent on create or update.
fn dashboard_fields(dashboard: &Value, collection_id: Option<i64>) -> Map<String, Value> {
    let mut fields = Map::new();
    for key in ["name", "description", "parameters", "collection_id"] {
        if let Some(value) = dashboard.get(key) {
            fields.insert(key.into(), value.clone());
        }
    }
    if let Some(collection_id) = collection_id {
        fields.insert("collection_id".into(), json!(collection_id));
    }
    fields
}

/// Rebuild dashcards for a dashboard update. Every dashcard gets a fresh
/// negative id so the server creates it. Card ids, including those in
/// parameter mappings, are translated through `mapping`; ids not in the
/// mapping are kept.
fn remap_dashcards(dashcards: &[Value], mapping: &HashMap<i64, i64>) -> Vec<Value> {
    let remap = |value: &Value| match value.as_i64() {
        Some(id) => json!(mapping.get(&id).copied().unwrap_or(id)),
        None => Value::Null,
    };

    dashcards
        .iter()
        .enumerate()
        .map(|(i, dc)| {
            let mut out = Map::new();
            out.insert("id".into(), json!(-(i as i64) - 1));
            out.insert("card_id".into(), remap(&dc["card_id"]));
            for key in DASHCARD_FIELDS {
                if let Some(value) = dc.get(*key) {
                    out.insert((*key).into(), value.clone());
                }
            }
            let mappings: Vec<Value> = dc["parameter_mappings"]
                .as_array()
                .map(|ms| {
                    ms.iter()
                        .map(|m| {
                            let mut m = m.clone();
                            if let Some(obj) = m.as_object_mut()
                                && let Some(card_id) = obj.get("card_id")
                            {
                                let mapped = remap(card_id);
                                obj.insert("card_id".into(), mapped);
                            }
                            m
                        })
                        .collect()
                })
                .unwrap_or_default();
            out.insert("parameter_mappings".into(), Value::Array(mappings));
            Value::Object(out)
        })
        .collect()
}

fn dry_run_plan(cards: &[Value], dashboard: Option<&Value>, id: Option<i64>) -> Value {
    let cards: Vec<Value> = cards
        .iter()
        .map(|c| json!({"source_id": c["id"], "name": c["name"], "action": "create"}))
        .collect();
    let dashboard = dashboard.map(|d| {
        json!({
            "id": id,
            "name": d["name"],
            "action": if id.is_some() { "update" } else { "create" },
            "dashcard_count": dashcards(d).len(),
        })
    });
    json!({"dry_run": true, "cards": cards, "dashboard": dashboard})
}

fn print_plan(plan: &Value) {
    println!("Dry run: no changes made");
    for card in plan["cards"].as_array().map(Vec::as_slice).unwrap_or_default() {
        output::field(
            "Would create card",
            &format!(
                "{} (from {})",
                output::text(&card["name"]),
                output::text(&card["source_id"])
            ),
        );
    }
    let dashboard = &plan["dashboard"];
    if !dashboard.is_null() {
        let target = match dashboard["id"].as_i64() {
            Some(id) => format!("update dashboard {}", id),
            None => "create dashboard".to_string(),
        };
        output::field(
            &format!("Would {}", target),
            &format!(
                "{} ({} dashcards)",
                output::text(&dashboard["name"]),
                output::text(&dashboard["dashcard_count"])
            ),
        );
    }
}
