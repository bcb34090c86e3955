//! Saved questions ("cards").

use serde_json::{Map, Value, json};
use tracing::instrument;

use metabase_core::Result;

use super::{into_list, into_value};
use crate::engine::Engine;
use crate::request::ApiRequest;

/// Filters for [`Cards::list`].
#[derive(Debug, Clone, Default)]
pub struct CardFilter {
    /// Server-side filter: `all`, `mine`, `bookmarked`, `archived`,
    /// `database`, `table` or `using_model`.
    pub f: Option<String>,
    pub collection_id: Option<i64>,
    pub database_id: Option<i64>,
}

/// Card endpoints.
pub struct Cards<'a> {
    engine: &'a mut Engine,
}

impl<'a> Cards<'a> {
    pub fn new(engine: &'a mut Engine) -> Self {
        Self { engine }
    }

    #[instrument(skip(self))]
    pub async fn list(&mut self, filter: &CardFilter) -> Result<Vec<Value>> {
        let request = ApiRequest::get("/card")
            .query_opt("f", filter.f.as_deref())
            .query_opt("collection_id", filter.collection_id)
            .query_opt("database_id", filter.database_id);
        self.engine.execute(&request).await.map(into_list)
    }

    pub async fn get(&mut self, id: i64) -> Result<Value> {
        self.engine
            .get(&format!("/card/{}", id), &[])
            .await
            .map(into_value)
    }

    /// Execute the card's query. The body is omitted when there are no
    /// parameters and no limit.
    #[instrument(skip(self, parameters))]
    pub async fn run(
        &mut self,
        id: i64,
        parameters: Option<Value>,
        limit: Option<u64>,
    ) -> Result<Value> {
        let mut body = Map::new();
        if let Some(parameters) = parameters.filter(|p| !is_empty_json(p)) {
            body.insert("parameters".into(), parameters);
        }
        if let Some(limit) = limit {
            body.insert("limit".into(), limit.into());
        }

        let mut request = ApiRequest::post(format!("/card/{}/query", id));
        if !body.is_empty() {
            request = request.body(Value::Object(body));
        }
        self.engine.execute(&request).await.map(into_value)
    }

    pub async fn create(&mut self, card: Value) -> Result<Value> {
        self.engine.post("/card", card).await.map(into_value)
    }

    pub async fn update(&mut self, id: i64, card: Value) -> Result<Value> {
        self.engine
            .put(&format!("/card/{}", id), card)
            .await
            .map(into_value)
    }

    /// Soft delete.
    pub async fn archive(&mut self, id: i64) -> Result<Value> {
        self.update(id, json!({"archived": true})).await
    }

    pub async fn delete(&mut self, id: i64) -> Result<()> {
        self.engine.delete(&format!("/card/{}", id)).await.map(|_| ())
    }
}

fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
