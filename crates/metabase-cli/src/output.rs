//! Output formatting helpers.
//!
//! Human output goes through the small helpers at the top. With `--json`
//! every command prints exactly one envelope on stdout:
//!
//! ```json
//! {"success": true, "data": {...}, "meta": {"timestamp": "..."}}
//! {"success": false, "error": {"code": "NOT_FOUND", "message": "...", "details": {...}}}
//! ```

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

/// Errors raised by the CLI itself rather than the client.
#[derive(Debug, Error)]
pub enum CliError {
    /// A failure with a code of its own, such as `INVALID_URL`.
    #[error("{message}")]
    Coded {
        code: &'static str,
        message: String,
        details: Option<Value>,
    },

    /// The command already printed its failure; exit with status 1.
    #[error("command failed")]
    Reported,
}

impl CliError {
    pub fn validation(message: impl Into<String>) -> Self {
        CliError::Coded {
            code: "VALIDATION_ERROR",
            message: message.into(),
            details: None,
        }
    }

    pub fn file(message: impl Into<String>) -> Self {
        CliError::Coded {
            code: "FILE_ERROR",
            message: message.into(),
            details: None,
        }
    }
}

/// Print a success message.
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print an error message.
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a warning or hint.
pub fn note(msg: &str) {
    eprintln!("{}", msg.dimmed());
}

/// Print a labeled field.
pub fn field(label: &str, value: &str) {
    println!("{}: {}", label.dimmed(), value);
}

/// Print a value as pretty-printed JSON.
pub fn json_pretty<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// Print `data` inside the success envelope.
pub fn envelope<T: Serialize>(data: &T) -> Result<()> {
    json_pretty(&json!({
        "success": true,
        "data": data,
        "meta": {"timestamp": timestamp()},
    }))
}

/// Build the error envelope.
pub fn error_envelope(code: &str, message: &str, details: Option<&Value>) -> Value {
    let mut error = json!({"code": code, "message": message});
    if let Some(details) = details.filter(|d| !d.is_null()) {
        error["details"] = details.clone();
    }
    json!({"success": false, "error": error})
}

/// Render a command failure, as an error envelope on stdout in JSON mode
/// or as a red line on stderr otherwise.
pub fn report_error(err: &anyhow::Error, json_mode: bool) {
    if matches!(err.downcast_ref::<CliError>(), Some(CliError::Reported)) {
        return;
    }

    let (code, details) = classify(err);
    let message = format!("{:#}", err);

    if json_mode {
        let envelope = error_envelope(code, &message, details.as_ref());
        match serde_json::to_string_pretty(&envelope) {
            Ok(text) => println!("{}", text),
            Err(_) => println!("{}", envelope),
        }
    } else {
        error(&format!("Error: {}", message));
    }
}

/// Map an error chain onto a stable code and optional details.
fn classify(err: &anyhow::Error) -> (&'static str, Option<Value>) {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<metabase_core::Error>() {
            let details = e.status().map(|status| json!({"status_code": status}));
            return (e.code(), details);
        }
        if let Some(CliError::Coded { code, details, .. }) = cause.downcast_ref::<CliError>() {
            return (*code, details.clone());
        }
        if cause.downcast_ref::<std::io::Error>().is_some() {
            return ("FILE_ERROR", None);
        }
    }
    ("ERROR", None)
}

/// A table with the house style.
pub fn table<I, S>(headers: I) -> Table
where
    I: IntoIterator<Item = S>,
    S: Into<comfy_table::Cell>,
{
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers);
    table
}

pub fn print_table(table: &Table) {
    println!("{table}");
}

/// Render a JSON scalar for display. Null becomes an empty string.
pub fn text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The collection path of an item (or of a collection itself) as name
/// segments, outermost first.
pub fn collection_path_parts(item: &Value) -> Vec<String> {
    let collection = match item.get("collection") {
        Some(c) if c.is_object() => c,
        _ => item,
    };

    let name = collection.get("name").and_then(Value::as_str);
    let mut parts: Vec<String> = collection
        .get("effective_ancestors")
        .and_then(Value::as_array)
        .map(|ancestors| {
            ancestors
                .iter()
                .filter_map(|a| a.get("name").and_then(Value::as_str))
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if let Some(name) = name {
        parts.push(name.to_string());
    }
    parts
}

/// The collection path joined with `" / "`, or `"Root Collection"`.
pub fn collection_path(item: &Value) -> String {
    let parts = collection_path_parts(item);
    if parts.is_empty() {
        "Root Collection".to_string()
    } else {
        parts.join(" / ")
    }
}

pub fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}
