//! Resource APIs.
//!
//! Each API borrows the [`Engine`](crate::Engine) mutably for as long as it
//! lives, so requests made through it share the engine's transport and
//! session refresh.

mod auth;
mod cards;
mod collections;
mod dashboards;
mod databases;
mod search;

pub use auth::Auth;
pub use cards::{CardFilter, Cards};
pub use collections::{CollectionId, CollectionUpdate, Collections, ItemsQuery};
pub use dashboards::Dashboards;
pub use databases::Databases;
pub use search::{DEFAULT_SEARCH_LIMIT, Search, SearchQuery};

use serde_json::Value;

/// Unwrap a list response, which Metabase returns either as a bare array
/// or wrapped as `{"data": [...]}`.
pub(crate) fn into_list(value: Option<Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items,
        Some(Value::Object(mut map)) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// An empty response body becomes `null`.
pub(crate) fn into_value(value: Option<Value>) -> Value {
    value.unwrap_or(Value::Null)
}
