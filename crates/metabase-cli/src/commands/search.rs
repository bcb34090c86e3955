//! Global search across all entity types.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::{Value, json};

use metabase_client::{DEFAULT_SEARCH_LIMIT, Search, SearchQuery};

use crate::context::AppContext;
use crate::output;

/// Display order of result groups. Other models follow alphabetically.
const MODEL_ORDER: &[&str] = &[
    "dashboard",
    "card",
    "collection",
    "table",
    "database",
    "dataset",
    "metric",
    "segment",
    "action",
];

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search term
    pub query: String,

    /// Comma-separated types: card, dashboard, collection, database, table,
    /// dataset, segment, metric, action
    #[arg(long, value_delimiter = ',')]
    pub models: Vec<String>,

    /// Search within a collection
    #[arg(long)]
    pub collection_id: Option<i64>,

    /// Only items backed by this database
    #[arg(long)]
    pub database_id: Option<i64>,

    /// Search archived items
    #[arg(long)]
    pub archived: bool,

    /// Only items created by this user ID
    #[arg(long)]
    pub created_by: Option<i64>,

    /// Maximum number of results
    #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
    pub limit: u32,
}

pub async fn run(args: SearchArgs, ctx: &AppContext) -> Result<()> {
    let mut query = SearchQuery::new(&args.query);
    query.models = args
        .models
        .iter()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();
    query.collection_id = args.collection_id;
    query.table_db_id = args.database_id;
    query.archived = args.archived;
    query.created_by = args.created_by;
    query.limit = args.limit;

    let mut engine = ctx.engine()?;
    let results = Search::new(&mut engine)
        .search(&query)
        .await
        .context("Search failed")?;

    let items: &[Value] = results["data"].as_array().map(Vec::as_slice).unwrap_or_default();
    let total = results["total"].as_u64().unwrap_or(items.len() as u64);

    if ctx.json {
        let formatted: Vec<Value> = items.iter().map(result_entry).collect();
        return output::envelope(&json!({
            "query": args.query,
            "total_results": total,
            "results": formatted,
        }));
    }

    if items.is_empty() {
        output::note(&format!("No results found for '{}'", args.query));
        return Ok(());
    }

    let groups = group_by_model(items);
    println!("Search results for '{}'", args.query.bold());
    output::note(&format!("Found {} results", total));
    let counts: Vec<String> = groups
        .iter()
        .map(|(model, items)| format!("{}: {}", model, items.len()))
        .collect();
    output::note(&format!("By type: {}", counts.join(", ")));
    println!();

    for model in display_order(&groups) {
        let items = &groups[model];
        println!(
            "{}",
            format!("{}S ({})", model.to_uppercase(), items.len()).cyan().bold()
        );
        let mut table = output::table(["ID", "Name", "Location"]);
        for item in items {
            table.add_row(vec![
                output::text(&item["id"]),
                output::text(&item["name"]),
                output::collection_path(item),
            ]);
        }
        output::print_table(&table);
        println!();
    }

    Ok(())
}

fn result_entry(item: &Value) -> Value {
    let mut entry = json!({
        "id": item["id"],
        "model": item["model"],
        "name": item["name"],
        "description": item["description"],
    });
    if item["collection"].is_object() {
        entry["collection"] = json!({
            "id": item["collection"]["id"],
            "name": item["collection"]["name"],
            "path": output::collection_path_parts(item),
        });
    }
    if !item["updated_at"].is_null() {
        entry["updated_at"] = item["updated_at"].clone();
    }
    entry
}

fn group_by_model(items: &[Value]) -> BTreeMap<&str, Vec<&Value>> {
    let mut groups: BTreeMap<&str, Vec<&Value>> = BTreeMap::new();
    for item in items {
        let model = item["model"].as_str().unwrap_or("unknown");
        groups.entry(model).or_default().push(item);
    }
    groups
}

/// Known models in their fixed order, then the rest alphabetically.
fn display_order<'a>(groups: &BTreeMap<&'a str, Vec<&Value>>) -> Vec<&'a str> {
    let mut order: Vec<&str> = MODEL_ORDER
        .iter()
        .copied()
        .filter(|m| groups.contains_key(m))
        .collect();
    order.extend(groups.keys().copied().filter(|m| !MODEL_ORDER.contains(m)));
    order
}
