//! Database subcommands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::{Value, json};

use metabase_client::Databases;

use crate::context::AppContext;
use crate::output;

#[derive(Args, Debug)]
pub struct DatabasesCommand {
    #[command(subcommand)]
    pub command: DatabasesSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum DatabasesSubcommand {
    /// List all databases
    List {
        /// Include table information
        #[arg(long)]
        include_tables: bool,
    },

    /// Show database details
    Get {
        /// Database ID
        id: i64,

        /// Include tables
        #[arg(long)]
        include_tables: bool,

        /// Include tables and their fields
        #[arg(long)]
        include_fields: bool,
    },

    /// Complete metadata: every table and field
    Metadata {
        /// Database ID
        id: i64,

        /// Include hidden tables and fields
        #[arg(long)]
        include_hidden: bool,
    },

    /// List the schemas in a database
    Schemas {
        /// Database ID
        id: i64,
    },

    /// Trigger a schema sync
    Sync {
        /// Database ID
        id: i64,
    },
}

pub async fn handle(cmd: DatabasesCommand, ctx: &AppContext) -> Result<()> {
    let mut engine = ctx.engine()?;
    let mut api = Databases::new(&mut engine);

    match cmd.command {
        DatabasesSubcommand::List { include_tables } => {
            let databases = api
                .list(include_tables)
                .await
                .context("Failed to list databases")?;
            if ctx.json {
                let list: Vec<Value> = databases.iter().map(summary).collect();
                return output::envelope(&json!({"databases": list}));
            }
            print_list(&databases, include_tables);
        }
        DatabasesSubcommand::Get {
            id,
            include_tables,
            include_fields,
        } => {
            let database = api
                .get(id, include_tables, include_fields)
                .await
                .context("Failed to get database")?;
            if ctx.json {
                return output::envelope(&database);
            }
            print_database(&database);
        }
        DatabasesSubcommand::Metadata { id, include_hidden } => {
            let metadata = api
                .metadata(id, include_hidden)
                .await
                .context("Failed to get database metadata")?;
            if ctx.json {
                return output::envelope(&metadata);
            }
            print_metadata(&metadata);
        }
        DatabasesSubcommand::Schemas { id } => {
            let schemas = api.schemas(id).await.context("Failed to list schemas")?;
            if ctx.json {
                return output::envelope(&json!({"database_id": id, "schemas": schemas}));
            }
            if schemas.is_empty() {
                output::note("No schemas found.");
            }
            for schema in schemas {
                println!("{}", schema);
            }
        }
        DatabasesSubcommand::Sync { id } => {
            api.sync_schema(id).await.context("Failed to sync schema")?;
            if ctx.json {
                return output::envelope(&json!({"database_id": id, "sync_started": true}));
            }
            output::success(&format!("Schema sync started for database {}", id));
        }
    }

    Ok(())
}

fn summary(db: &Value) -> Value {
    let mut entry = json!({
        "id": db["id"],
        "name": db["name"],
        "engine": db["engine"],
        "is_sample": db.get("is_sample").and_then(Value::as_bool).unwrap_or(false),
    });
    if let Some(tables) = db.get("tables").and_then(Value::as_array) {
        entry["table_count"] = json!(tables.len());
    }
    entry
}

fn print_list(databases: &[Value], include_tables: bool) {
    if databases.is_empty() {
        output::note("No databases found.");
        return;
    }
    let mut headers = vec!["ID", "Name", "Engine"];
    if include_tables {
        headers.push("Tables");
    }
    let mut table = output::table(headers);
    for db in databases {
        let mut row = vec![
            output::text(&db["id"]),
            output::text(&db["name"]),
            output::text(&db["engine"]),
        ];
        if include_tables {
            let count = db["tables"].as_array().map(Vec::len).unwrap_or(0);
            row.push(count.to_string());
        }
        table.add_row(row);
    }
    output::print_table(&table);
}

fn print_database(db: &Value) {
    output::field("Database", &output::text(&db["name"]));
    output::field("ID", &output::text(&db["id"]));
    output::field("Engine", &output::text(&db["engine"]));
    if let Some(description) = db["description"].as_str().filter(|d| !d.is_empty()) {
        output::field("Description", description);
    }
    if let Some(tables) = db["tables"].as_array() {
        println!();
        print_tables(tables);
    }
}

fn print_metadata(metadata: &Value) {
    output::field("Database", &output::text(&metadata["name"]));
    if let Some(tables) = metadata["tables"].as_array() {
        println!();
        print_tables(tables);
    }
}

fn print_tables(tables: &[Value]) {
    let mut table = output::table(["ID", "Schema", "Table", "Fields"]);
    for t in tables {
        let fields = t["fields"]
            .as_array()
            .map(|f| f.len().to_string())
            .unwrap_or_default();
        table.add_row(vec![
            output::text(&t["id"]),
            output::text(&t["schema"]),
            output::text(&t["name"]),
            fields,
        ]);
    }
    output::print_table(&table);
}
