//! Export files: JSON envelopes and CSV query results.
//!
//! Exported resources are wrapped in a small envelope so that an import can
//! tell what it is looking at:
//!
//! ```json
//! {
//!   "export_version": "1.0",
//!   "export_timestamp": "2026-01-01T12:00:00.000000Z",
//!   "type": "card",
//!   "source": {"url": "https://metabase.example.com", "card_id": 12},
//!   "card": { ... }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Result;
use crate::error::InvalidInputError;

/// Export file format version.
pub const EXPORT_VERSION: &str = "1.0";

/// Envelope fields. An export type may not reuse one as its payload key.
const ENVELOPE_KEYS: &[&str] = &["export_version", "export_timestamp", "type", "source"];

/// A parsed export file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportEnvelope {
    pub export_version: String,
    pub export_timestamp: String,
    #[serde(rename = "type")]
    pub export_type: String,
    #[serde(default)]
    pub source: Value,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl ExportEnvelope {
    /// Returns the exported resource, stored under the `type` key.
    pub fn payload(&self) -> Option<&Value> {
        self.rest.get(&self.export_type)
    }

    /// Consumes the envelope and returns the exported resource.
    pub fn into_payload(mut self) -> Option<Value> {
        self.rest.remove(&self.export_type)
    }
}

/// Create a timestamped export directory such as
/// `<root>/metabase-20260205-183500`.
pub fn create_export_dir(root: &Path) -> Result<PathBuf> {
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let dir = root.join(format!("metabase-{}", timestamp));
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Write a value as pretty-printed JSON.
pub fn write_json_file(dir: &Path, filename: &str, data: &Value) -> Result<PathBuf> {
    let path = dir.join(filename);
    let json = serde_json::to_string_pretty(data).map_err(|e| InvalidInputError::Json {
        message: e.to_string(),
    })?;
    fs::write(&path, json)?;
    Ok(path)
}

/// Write a resource wrapped in the standard export envelope.
pub fn write_export_file(
    dir: &Path,
    filename: &str,
    data: &Value,
    export_type: &str,
    source: Option<&Value>,
) -> Result<PathBuf> {
    if ENVELOPE_KEYS.contains(&export_type) {
        return Err(InvalidInputError::Other {
            message: format!("export type '{}' collides with an envelope field", export_type),
        }
        .into());
    }

    let mut envelope = Map::new();
    envelope.insert("export_version".into(), EXPORT_VERSION.into());
    envelope.insert("export_timestamp".into(), export_timestamp().into());
    envelope.insert("type".into(), export_type.into());
    envelope.insert(
        "source".into(),
        source.cloned().unwrap_or_else(|| Value::Object(Map::new())),
    );
    envelope.insert(export_type.into(), data.clone());

    write_json_file(dir, filename, &Value::Object(envelope))
}

/// Read and parse an export file.
pub fn read_export_file(path: &Path) -> Result<ExportEnvelope> {
    let json = fs::read_to_string(path)?;
    serde_json::from_str(&json).map_err(|e| {
        InvalidInputError::Json {
            message: format!("{}: {}", path.display(), e),
        }
        .into()
    })
}

/// Read any JSON file.
pub fn read_json_file(path: &Path) -> Result<Value> {
    let json = fs::read_to_string(path)?;
    parse_json(&json)
}

/// Parse JSON text, mapping failures to a validation error.
pub fn parse_json(text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| {
        InvalidInputError::Json {
            message: e.to_string(),
        }
        .into()
    })
}

/// If `value` is an export envelope holding `key`, return the nested
/// resource; otherwise return `value` unchanged.
pub fn unwrap_export(value: Value, key: &str) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("export_version") && map.contains_key(key) => {
            map.remove(key).unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Convert a card query result (`{"data": {"cols": [...], "rows": [...]}}`)
/// into CSV headers and rows.
pub fn query_result_to_csv(result: &Value) -> (Vec<String>, Vec<Vec<String>>) {
    let data = &result["data"];

    let headers = data["cols"]
        .as_array()
        .map(|cols| {
            cols.iter()
                .map(|col| {
                    non_empty_str(&col["display_name"])
                        .or_else(|| non_empty_str(&col["name"]))
                        .unwrap_or("column")
                        .to_string()
                })
                .collect()
        })
        .unwrap_or_default();

    let rows = data["rows"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    row.as_array()
                        .map(|cells| cells.iter().map(csv_cell).collect())
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default();

    (headers, rows)
}

/// Write headers and rows to a CSV file.
pub fn write_csv_file(
    dir: &Path,
    filename: &str,
    headers: &[String],
    rows: &[Vec<String>],
) -> Result<PathBuf> {
    let path = dir.join(filename);
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(&path)
        .map_err(std::io::Error::other)?;

    writer
        .write_record(headers)
        .map_err(std::io::Error::other)?;
    for row in rows {
        writer.write_record(row).map_err(std::io::Error::other)?;
    }
    writer.flush()?;

    Ok(path)
}

fn export_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}

fn csv_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
