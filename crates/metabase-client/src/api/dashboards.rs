//! Dashboards and their revision history.

use serde_json::{Value, json};
use tracing::instrument;

use metabase_core::Result;

use super::{into_list, into_value};
use crate::engine::Engine;
use crate::request::ApiRequest;

/// Dashboard endpoints.
pub struct Dashboards<'a> {
    engine: &'a mut Engine,
}

impl<'a> Dashboards<'a> {
    pub fn new(engine: &'a mut Engine) -> Self {
        Self { engine }
    }

    /// Dashboards are listed through the search endpoint.
    #[instrument(skip(self))]
    pub async fn list(&mut self, collection_id: Option<i64>) -> Result<Vec<Value>> {
        let request = ApiRequest::get("/search")
            .query("models", "dashboard")
            .query_opt("collection_id", collection_id);
        self.engine.execute(&request).await.map(into_list)
    }

    /// A dashboard with its dashcards.
    pub async fn get(&mut self, id: i64) -> Result<Value> {
        self.engine
            .get(&format!("/dashboard/{}", id), &[])
            .await
            .map(into_value)
    }

    pub async fn create(&mut self, dashboard: Value) -> Result<Value> {
        self.engine.post("/dashboard", dashboard).await.map(into_value)
    }

    pub async fn update(&mut self, id: i64, dashboard: Value) -> Result<Value> {
        self.engine
            .put(&format!("/dashboard/{}", id), dashboard)
            .await
            .map(into_value)
    }

    pub async fn archive(&mut self, id: i64) -> Result<Value> {
        self.update(id, json!({"archived": true})).await
    }

    pub async fn delete(&mut self, id: i64) -> Result<()> {
        self.engine
            .delete(&format!("/dashboard/{}", id))
            .await
            .map(|_| ())
    }

    pub async fn revisions(&mut self, id: i64) -> Result<Vec<Value>> {
        self.engine
            .get(&format!("/dashboard/{}/revisions", id), &[])
            .await
            .map(into_list)
    }

    #[instrument(skip(self))]
    pub async fn revert(&mut self, id: i64, revision_id: i64) -> Result<Value> {
        self.engine
            .post(
                &format!("/dashboard/{}/revert", id),
                json!({"revision_id": revision_id}),
            )
            .await
            .map(into_value)
    }
}
