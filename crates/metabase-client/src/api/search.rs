//! Full-text search across all entity types.

use serde_json::{Value, json};
use tracing::instrument;

use metabase_core::Result;

use crate::engine::Engine;
use crate::request::ApiRequest;

/// Default number of search results.
pub const DEFAULT_SEARCH_LIMIT: u32 = 50;

/// Search parameters.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub q: String,
    /// Entity types to include. Sent as repeated `models` parameters.
    pub models: Vec<String>,
    pub collection_id: Option<i64>,
    /// Restrict to items backed by this database.
    pub table_db_id: Option<i64>,
    pub archived: bool,
    pub created_by: Option<i64>,
    pub limit: u32,
}

impl SearchQuery {
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            models: Vec::new(),
            collection_id: None,
            table_db_id: None,
            archived: false,
            created_by: None,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

/// Search endpoint.
pub struct Search<'a> {
    engine: &'a mut Engine,
}

impl<'a> Search<'a> {
    pub fn new(engine: &'a mut Engine) -> Self {
        Self { engine }
    }

    /// Returns the server's result object, `{"data": [...], "total": n, ...}`.
    #[instrument(skip(self, query), fields(q = %query.q))]
    pub async fn search(&mut self, query: &SearchQuery) -> Result<Value> {
        let mut request = ApiRequest::get("/search")
            .query("q", &query.q)
            .query("limit", query.limit);
        for model in &query.models {
            request = request.query("models", model);
        }
        request = request
            .query_opt("collection_id", query.collection_id)
            .query_opt("table_db_id", query.table_db_id);
        if query.archived {
            request = request.query("archived", "true");
        }
        request = request.query_opt("created_by", query.created_by);

        Ok(match self.engine.execute(&request).await? {
            Some(Value::Object(map)) => Value::Object(map),
            Some(Value::Array(items)) => json!({"data": items, "total": 0}),
            _ => json!({"data": [], "total": 0}),
        })
    }
}
