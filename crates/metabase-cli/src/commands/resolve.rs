//! Resolve a Metabase URL to the entity it points at.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::{Value, json};
use url::Url;

use metabase_client::{Cards, CollectionId, Collections, Dashboards, Databases, Engine};

use crate::commands::dashboards::{dashcards, parameter_name};
use crate::context::AppContext;
use crate::output::{self, CliError};

const SUPPORTED_PATTERNS: &str = "/question/<id>, /dashboard/<id>, /collection/<id>, \
    /browse/databases/<id>, /browse/<id>/schema/<schema>";

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Full Metabase URL or just its path
    pub url: String,
}

/// The entity a URL refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    Card(i64),
    Dashboard(i64),
    Collection(i64),
    Database { id: i64, schema: Option<String> },
}

impl EntityRef {
    fn kind(&self) -> &'static str {
        match self {
            EntityRef::Card(_) => "card",
            EntityRef::Dashboard(_) => "dashboard",
            EntityRef::Collection(_) => "collection",
            EntityRef::Database { .. } => "database",
        }
    }

    fn id(&self) -> i64 {
        match self {
            EntityRef::Card(id) | EntityRef::Dashboard(id) | EntityRef::Collection(id) => *id,
            EntityRef::Database { id, .. } => *id,
        }
    }
}

pub async fn run(args: ResolveArgs, ctx: &AppContext) -> Result<()> {
    let entity = parse_metabase_url(&args.url).ok_or_else(|| CliError::Coded {
        code: "INVALID_URL",
        message: format!(
            "Could not parse URL: {}. Supported patterns: {}",
            args.url, SUPPORTED_PATTERNS
        ),
        details: Some(json!({"url": args.url})),
    })?;

    let mut engine = ctx.engine()?;
    let summary = fetch_summary(&mut engine, &entity)
        .await
        .with_context(|| format!("Failed to fetch {} {}", entity.kind(), entity.id()))?;

    if ctx.json {
        return output::envelope(&json!({
            "url": args.url,
            "entity_type": entity.kind(),
            "entity_id": entity.id(),
            "entity": summary,
        }));
    }

    print_summary(&args.url, &entity, &summary);
    Ok(())
}

/// Parse a full URL or a bare path. Returns `None` for anything that is
/// not a recognised entity link.
pub fn parse_metabase_url(input: &str) -> Option<EntityRef> {
    let input = input.trim();
    let path = if input.starts_with('/') {
        input.to_string()
    } else {
        match Url::parse(input) {
            Ok(url) => url.path().to_string(),
            Err(_) => input.to_string(),
        }
    };

    let parts: Vec<&str> = path.trim_start_matches('/').split('/').collect();

    if let ["browse", "databases", id, ..] = parts.as_slice()
        && let Some(id) = extract_id(id)
    {
        return Some(EntityRef::Database { id, schema: None });
    }

    if let ["browse", id, "schema", schema, ..] = parts.as_slice()
        && let Some(id) = extract_id(id)
    {
        return Some(EntityRef::Database {
            id,
            schema: Some((*schema).to_string()).filter(|s| !s.is_empty()),
        });
    }

    match parts.as_slice() {
        ["browse", id, ..] => extract_id(id).map(|id| EntityRef::Database { id, schema: None }),
        ["question", id, ..] => extract_id(id).map(EntityRef::Card),
        ["dashboard", id, ..] => extract_id(id).map(EntityRef::Dashboard),
        ["collection", id, ..] => extract_id(id).map(EntityRef::Collection),
        _ => None,
    }
}

/// A numeric id, optionally followed by a slug: `123` or `123-my-dashboard`.
fn extract_id(segment: &str) -> Option<i64> {
    let digits = segment.split_once('-').map_or(segment, |(id, _)| id);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

async fn fetch_summary(engine: &mut Engine, entity: &EntityRef) -> metabase_client::Result<Value> {
    Ok(match entity {
        EntityRef::Card(id) => card_summary(&Cards::new(engine).get(*id).await?),
        EntityRef::Dashboard(id) => dashboard_summary(&Dashboards::new(engine).get(*id).await?),
        EntityRef::Collection(id) => {
            collection_summary(&Collections::new(engine).get(CollectionId::Id(*id)).await?)
        }
        EntityRef::Database { id, schema } => {
            let database = Databases::new(engine).get(*id, false, false).await?;
            database_summary(&database, schema.as_deref())
        }
    })
}

/// `{"id", "name", "path"}` for an item's collection, or null in the root.
fn collection_ref(item: &Value) -> Value {
    let collection = &item["collection"];
    if !collection.is_object() {
        return Value::Null;
    }
    json!({
        "id": collection["id"],
        "name": collection["name"],
        "path": output::collection_path_parts(collection),
    })
}

fn card_summary(card: &Value) -> Value {
    json!({
        "id": card["id"],
        "name": card["name"],
        "description": card["description"],
        "collection_id": card["collection_id"],
        "collection": collection_ref(card),
        "database_id": card["database_id"],
        "database_name": card["database"]["name"],
        "display": card["display"],
        "query_type": card["dataset_query"]["type"],
        "created_at": card["created_at"],
        "updated_at": card["updated_at"],
    })
}

fn dashboard_summary(dashboard: &Value) -> Value {
    json!({
        "id": dashboard["id"],
        "name": dashboard["name"],
        "description": dashboard["description"],
        "collection_id": dashboard["collection_id"],
        "collection": collection_ref(dashboard),
        "dashcard_count": dashcards(dashboard).len(),
        "parameters": dashboard.get("parameters").cloned().unwrap_or_else(|| json!([])),
        "created_at": dashboard["created_at"],
        "updated_at": dashboard["updated_at"],
    })
}

fn collection_summary(collection: &Value) -> Value {
    json!({
        "id": collection["id"],
        "name": collection["name"],
        "description": collection["description"],
        "parent_id": collection["parent_id"],
        "path": output::collection_path_parts(collection),
        "archived": collection["archived"].as_bool().unwrap_or(false),
        "personal_owner_id": collection["personal_owner_id"],
    })
}

fn database_summary(database: &Value, schema: Option<&str>) -> Value {
    let mut summary = json!({
        "id": database["id"],
        "name": database["name"],
        "description": database["description"],
        "engine": database["engine"],
        "created_at": database["created_at"],
        "updated_at": database["updated_at"],
    });
    if let Some(schema) = schema {
        summary["schema"] = json!(schema);
    }
    summary
}

fn print_summary(url: &str, entity: &EntityRef, summary: &Value) {
    output::field("URL", url);
    println!();
    output::field("Entity Type", entity.kind());
    output::field("Entity ID", &entity.id().to_string());
    output::field(
        "Name",
        summary["name"].as_str().filter(|n| !n.is_empty()).unwrap_or("N/A"),
    );
    if let Some(description) = summary["description"].as_str().filter(|d| !d.is_empty()) {
        output::field("Description", description);
    }

    match entity {
        EntityRef::Card(_) | EntityRef::Dashboard(_) => {
            output::field("Collection", &path_text(&summary["collection"]["path"]));
        }
        EntityRef::Collection(_) => output::field("Collection", &path_text(&summary["path"])),
        EntityRef::Database { .. } => {}
    }

    match entity {
        EntityRef::Card(_) => {
            if let Some(db) = summary["database_name"].as_str() {
                output::field(
                    "Database",
                    &format!("{} (id: {})", db, output::text(&summary["database_id"])),
                );
            } else if !summary["database_id"].is_null() {
                output::field("Database ID", &output::text(&summary["database_id"]));
            }
            for (label, key) in [("Display", "display"), ("Query Type", "query_type")] {
                if let Some(value) = summary[key].as_str() {
                    output::field(label, value);
                }
            }
        }
        EntityRef::Dashboard(_) => {
            output::field("Cards", &output::text(&summary["dashcard_count"]));
            let params: Vec<String> = summary["parameters"]
                .as_array()
                .map(|ps| ps.iter().map(parameter_name).collect())
                .unwrap_or_default();
            if !params.is_empty() {
                output::field("Parameters", &params.join(", "));
            }
        }
        EntityRef::Collection(_) => {
            if !summary["parent_id"].is_null() {
                output::field("Parent ID", &output::text(&summary["parent_id"]));
            }
            if summary["archived"].as_bool().unwrap_or(false) {
                output::field("Archived", "Yes");
            }
        }
        EntityRef::Database { .. } => {
            if let Some(engine) = summary["engine"].as_str() {
                output::field("Engine", engine);
            }
            if let Some(schema) = summary["schema"].as_str() {
                output::field("Schema", schema);
            }
        }
    }

    if let Some(updated) = summary["updated_at"].as_str() {
        output::field("Last Updated", updated);
    } else if let Some(created) = summary["created_at"].as_str() {
        output::field("Created", created);
    }
}

/// Join path segments with `" / "`; an empty path is the root.
fn path_text(parts: &Value) -> String {
    let parts: Vec<&str> = parts
        .as_array()
        .map(|ps| ps.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if parts.is_empty() {
        "Root Collection".to_string()
    } else {
        parts.join(" / ")
    }
}
