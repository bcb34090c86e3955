//! Collections: the folders that organise cards and dashboards.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value, json};
use tracing::instrument;

use metabase_core::error::InvalidInputError;
use metabase_core::{Error, Result};

use super::{into_list, into_value};
use crate::engine::Engine;
use crate::request::ApiRequest;

/// A collection reference: the root collection or a numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionId {
    Root,
    Id(i64),
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionId::Root => f.write_str("root"),
            CollectionId::Id(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for CollectionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("root") {
            return Ok(CollectionId::Root);
        }
        s.parse::<i64>().map(CollectionId::Id).map_err(|_| {
            InvalidInputError::Other {
                message: format!("invalid collection id '{}': expected a number or 'root'", s),
            }
            .into()
        })
    }
}

impl From<i64> for CollectionId {
    fn from(id: i64) -> Self {
        CollectionId::Id(id)
    }
}

/// Options for [`Collections::items`].
#[derive(Debug, Clone, Default)]
pub struct ItemsQuery {
    /// Item types such as `card`, `dashboard`, `collection`. Sent as
    /// repeated `models` parameters.
    pub models: Vec<String>,
    pub archived: bool,
    /// `name`, `last_edited_at`, `last_edited_by` or `model`.
    pub sort_column: Option<String>,
    /// `asc` or `desc`.
    pub sort_direction: Option<String>,
}

/// Fields to change in [`Collections::update`]. Unset fields are not sent.
#[derive(Debug, Clone, Default)]
pub struct CollectionUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
}

/// Collection endpoints.
pub struct Collections<'a> {
    engine: &'a mut Engine,
}

impl<'a> Collections<'a> {
    pub fn new(engine: &'a mut Engine) -> Self {
        Self { engine }
    }

    /// Root-level collections with nested `children`.
    pub async fn tree(&mut self, exclude_archived: bool) -> Result<Vec<Value>> {
        let mut request = ApiRequest::get("/collection/tree");
        if exclude_archived {
            request = request.query("exclude-archived", "true");
        }
        self.engine.execute(&request).await.map(into_list)
    }

    pub async fn get(&mut self, id: CollectionId) -> Result<Value> {
        self.engine
            .get(&format!("/collection/{}", id), &[])
            .await
            .map(into_value)
    }

    #[instrument(skip(self))]
    pub async fn items(&mut self, id: CollectionId, query: &ItemsQuery) -> Result<Vec<Value>> {
        let mut request = ApiRequest::get(format!("/collection/{}/items", id));
        for model in &query.models {
            request = request.query("models", model);
        }
        if query.archived {
            request = request.query("archived", "true");
        }
        request = request
            .query_opt("sort_column", query.sort_column.as_deref())
            .query_opt("sort_direction", query.sort_direction.as_deref());

        self.engine.execute(&request).await.map(into_list)
    }

    #[instrument(skip(self))]
    pub async fn create(
        &mut self,
        name: &str,
        description: Option<&str>,
        parent_id: Option<i64>,
    ) -> Result<Value> {
        let mut body = Map::new();
        body.insert("name".into(), name.into());
        if let Some(description) = description {
            body.insert("description".into(), description.into());
        }
        if let Some(parent_id) = parent_id {
            body.insert("parent_id".into(), parent_id.into());
        }
        self.engine
            .post("/collection", Value::Object(body))
            .await
            .map(into_value)
    }

    #[instrument(skip(self))]
    pub async fn update(&mut self, id: i64, update: &CollectionUpdate) -> Result<Value> {
        let mut body = Map::new();
        if let Some(name) = &update.name {
            body.insert("name".into(), name.as_str().into());
        }
        if let Some(description) = &update.description {
            body.insert("description".into(), description.as_str().into());
        }
        if let Some(parent_id) = update.parent_id {
            body.insert("parent_id".into(), parent_id.into());
        }
        self.engine
            .put(&format!("/collection/{}", id), Value::Object(body))
            .await
            .map(into_value)
    }

    /// Soft delete.
    pub async fn archive(&mut self, id: i64) -> Result<Value> {
        self.engine
            .put(&format!("/collection/{}", id), json!({"archived": true}))
            .await
            .map(into_value)
    }
}
