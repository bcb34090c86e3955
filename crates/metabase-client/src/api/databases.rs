//! Connected databases.

use serde_json::Value;

use metabase_core::Result;

use super::{into_list, into_value};
use crate::engine::Engine;
use crate::request::ApiRequest;

/// Database endpoints.
pub struct Databases<'a> {
    engine: &'a mut Engine,
}

impl<'a> Databases<'a> {
    pub fn new(engine: &'a mut Engine) -> Self {
        Self { engine }
    }

    pub async fn list(&mut self, include_tables: bool) -> Result<Vec<Value>> {
        let mut request = ApiRequest::get("/database");
        if include_tables {
            request = request.query("include", "tables");
        }
        self.engine.execute(&request).await.map(into_list)
    }

    /// `include_fields` implies `include_tables`.
    pub async fn get(&mut self, id: i64, include_tables: bool, include_fields: bool) -> Result<Value> {
        let mut request = ApiRequest::get(format!("/database/{}", id));
        if include_fields {
            request = request.query("include", "tables.fields");
        } else if include_tables {
            request = request.query("include", "tables");
        }
        self.engine.execute(&request).await.map(into_value)
    }

    /// Tables and fields for the whole database.
    pub async fn metadata(&mut self, id: i64, include_hidden: bool) -> Result<Value> {
        let mut request = ApiRequest::get(format!("/database/{}/metadata", id));
        if include_hidden {
            request = request.query("include_hidden", "true");
        }
        self.engine.execute(&request).await.map(into_value)
    }

    pub async fn schemas(&mut self, id: i64) -> Result<Vec<String>> {
        let schemas = self
            .engine
            .get(&format!("/database/{}/schemas", id), &[])
            .await
            .map(into_list)?;
        Ok(schemas
            .into_iter()
            .filter_map(|s| s.as_str().map(str::to_string))
            .collect())
    }

    /// Ask the server to re-scan the database schema.
    pub async fn sync_schema(&mut self, id: i64) -> Result<Value> {
        self.engine
            .execute(&ApiRequest::post(format!("/database/{}/sync_schema", id)))
            .await
            .map(into_value)
    }
}
