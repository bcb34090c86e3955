//! Collection subcommands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::{Value, json};

use metabase_client::{CollectionId, CollectionUpdate, Collections, ItemsQuery};

use crate::context::AppContext;
use crate::output::{self, CliError};

#[derive(Args, Debug)]
pub struct CollectionsCommand {
    #[command(subcommand)]
    pub command: CollectionsSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum CollectionsSubcommand {
    /// Display the collection hierarchy as a tree
    Tree {
        /// Only show collections whose name contains this text
        #[arg(long)]
        search: Option<String>,

        /// Levels of children to render below each shown collection
        #[arg(long)]
        levels: Option<usize>,

        /// Include archived collections
        #[arg(long)]
        include_archived: bool,
    },

    /// Show collection details
    Get {
        /// Collection ID or 'root'
        id: String,
    },

    /// List the items in a collection
    Items {
        /// Collection ID or 'root'
        id: String,

        /// Comma-separated item types: card, dashboard, collection, dataset, pulse
        #[arg(long, value_delimiter = ',')]
        models: Vec<String>,

        /// Show archived items
        #[arg(long)]
        archived: bool,

        /// Sort by: name, last_edited_at, last_edited_by, model
        #[arg(long)]
        sort_by: Option<String>,

        /// Sort direction: asc, desc
        #[arg(long)]
        sort_dir: Option<String>,
    },

    /// Create a collection
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        description: Option<String>,

        /// Parent collection ID
        #[arg(long)]
        parent_id: Option<i64>,
    },

    /// Update a collection
    Update {
        /// Collection ID
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Move under a new parent
        #[arg(long)]
        parent_id: Option<i64>,
    },

    /// Archive a collection
    Archive {
        /// Collection ID
        id: i64,
    },
}

/// Below a search match, render this many levels unless `--levels` says
/// otherwise.
const DEFAULT_MATCH_LEVELS: usize = 1;

pub async fn handle(cmd: CollectionsCommand, ctx: &AppContext) -> Result<()> {
    let mut engine = ctx.engine()?;
    let mut api = Collections::new(&mut engine);

    match cmd.command {
        CollectionsSubcommand::Tree {
            search,
            levels,
            include_archived,
        } => {
            let tree = api
                .tree(!include_archived)
                .await
                .context("Failed to get collection tree")?;

            let (roots, depth): (Vec<&Value>, Option<usize>) = match search.as_deref() {
                Some(needle) => {
                    let mut matches = Vec::new();
                    find_matches(&tree, &needle.to_lowercase(), &mut matches);
                    (matches, Some(levels.unwrap_or(DEFAULT_MATCH_LEVELS)))
                }
                None => (tree.iter().collect(), levels),
            };

            if ctx.json {
                let collections: Vec<Value> = roots.iter().map(|n| prune(n, depth)).collect();
                return output::envelope(&json!({"collections": collections}));
            }
            if roots.is_empty() {
                output::note("No collections found.");
                return Ok(());
            }
            let mut lines = Vec::new();
            for node in roots {
                render_tree(node, depth, &mut lines);
            }
            for line in lines {
                println!("{}", line);
            }
        }
        CollectionsSubcommand::Get { id } => {
            let id: CollectionId = id.parse()?;
            let collection = api.get(id).await.context("Failed to get collection")?;
            if ctx.json {
                return output::envelope(&json!({
                    "id": collection["id"],
                    "name": collection["name"],
                    "description": collection["description"],
                    "parent_id": collection.get("parent_id"),
                    "path": output::collection_path_parts(&collection),
                    "archived": collection.get("archived").and_then(Value::as_bool).unwrap_or(false),
                    "personal_owner_id": collection.get("personal_owner_id"),
                }));
            }
            output::field("Collection", &output::text(&collection["name"]));
            output::field("ID", &output::text(&collection["id"]));
            output::field("Path", &output::collection_path(&collection));
            if let Some(description) = collection["description"].as_str().filter(|d| !d.is_empty()) {
                output::field("Description", description);
            }
            if collection["archived"].as_bool().unwrap_or(false) {
                output::note("This collection is archived");
            }
        }
        CollectionsSubcommand::Items {
            id,
            models,
            archived,
            sort_by,
            sort_dir,
        } => {
            let id: CollectionId = id.parse()?;
            let query = ItemsQuery {
                models: models
                    .into_iter()
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .collect(),
                archived,
                sort_column: sort_by,
                sort_direction: sort_dir,
            };
            let items = api
                .items(id, &query)
                .await
                .context("Failed to list collection items")?;
            if ctx.json {
                let items: Vec<Value> = items
                    .iter()
                    .map(|item| {
                        json!({
                            "id": item["id"],
                            "model": item["model"],
                            "name": item["name"],
                            "description": item["description"],
                        })
                    })
                    .collect();
                return output::envelope(&json!({"collection_id": id.to_string(), "items": items}));
            }
            if items.is_empty() {
                output::note("Collection is empty.");
                return Ok(());
            }
            let mut table = output::table(["ID", "Type", "Name"]);
            for item in &items {
                table.add_row(vec![
                    output::text(&item["id"]),
                    output::text(&item["model"]),
                    output::text(&item["name"]),
                ]);
            }
            output::print_table(&table);
        }
        CollectionsSubcommand::Create {
            name,
            description,
            parent_id,
        } => {
            let created = api
                .create(&name, description.as_deref(), parent_id)
                .await
                .context("Failed to create collection")?;
            if ctx.json {
                return output::envelope(&created);
            }
            output::success(&format!(
                "Created collection '{}' (ID: {})",
                output::text(&created["name"]),
                output::text(&created["id"])
            ));
        }
        CollectionsSubcommand::Update {
            id,
            name,
            description,
            parent_id,
        } => {
            if name.is_none() && description.is_none() && parent_id.is_none() {
                return Err(CliError::validation(
                    "Nothing to update. Pass --name, --description or --parent-id.",
                )
                .into());
            }
            let update = CollectionUpdate {
                name,
                description,
                parent_id,
            };
            let updated = api
                .update(id, &update)
                .await
                .context("Failed to update collection")?;
            if ctx.json {
                return output::envelope(&updated);
            }
            output::success(&format!("Collection {} updated", id));
        }
        CollectionsSubcommand::Archive { id } => {
            let archived = api
                .archive(id)
                .await
                .context("Failed to archive collection")?;
            if ctx.json {
                return output::envelope(&json!({
                    "id": id,
                    "name": archived["name"],
                    "archived": true,
                }));
            }
            output::success(&format!("Collection {} archived", id));
        }
    }

    Ok(())
}

fn children(node: &Value) -> &[Value] {
    node.get("children")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Collect the shallowest nodes whose name contains `needle` (lowercase).
fn find_matches<'a>(nodes: &'a [Value], needle: &str, out: &mut Vec<&'a Value>) {
    for node in nodes {
        let name = node["name"].as_str().unwrap_or_default().to_lowercase();
        if name.contains(needle) {
            out.push(node);
        } else {
            find_matches(children(node), needle, out);
        }
    }
}

/// Copy of `node` with children cut off below `depth` levels.
fn prune(node: &Value, depth: Option<usize>) -> Value {
    let mut copy = node.clone();
    if let Some(obj) = copy.as_object_mut() {
        let kept: Vec<Value> = match depth {
            Some(0) => Vec::new(),
            _ => children(node)
                .iter()
                .map(|c| prune(c, depth.map(|d| d - 1)))
                .collect(),
        };
        obj.insert("children".into(), Value::Array(kept));
    }
    copy
}

fn label(node: &Value) -> String {
    format!("{} ({})", output::text(&node["name"]), output::text(&node["id"]))
}

fn render_tree(root: &Value, depth: Option<usize>, lines: &mut Vec<String>) {
    lines.push(label(root));
    render_children(root, "", depth, lines);
}

fn render_children(node: &Value, prefix: &str, depth: Option<usize>, lines: &mut Vec<String>) {
    if depth == Some(0) {
        return;
    }
    let kids = children(node);
    for (i, child) in kids.iter().enumerate() {
        let last = i + 1 == kids.len();
        let branch = if last { "└── " } else { "├── " };
        lines.push(format!("{}{}{}", prefix, branch, label(child)));
        let next = format!("{}{}", prefix, if last { "    " } else { "│   " });
        render_children(child, &next, depth.map(|d| d - 1), lines);
    }
}
