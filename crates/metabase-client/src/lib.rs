//! metabase-client - Authenticated HTTP client for the Metabase REST API.
//!
//! All requests flow through an [`Engine`], which owns the HTTP transport
//! for one [`Credential`](metabase_core::Credential), classifies responses
//! into [`metabase_core::Error`] kinds, and transparently re-authenticates
//! a username/password session once when the server answers `401`.
//!
//! Resource APIs ([`Cards`], [`Dashboards`], [`Collections`],
//! [`Databases`], [`Search`], [`Auth`]) are thin wrappers that borrow the
//! engine.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use metabase_client::{Cards, Engine};
//! # use metabase_core::{BaseUrl, Credential, SessionStore};
//!
//! # async fn example(store: Arc<dyn SessionStore>) -> Result<(), metabase_core::Error> {
//! let base = BaseUrl::new("https://metabase.example.com")?;
//! let credential = Credential::api_key(base, "mb_secret");
//! let mut engine = Engine::new(credential, store);
//!
//! let card = Cards::new(&mut engine).get(12).await?;
//! println!("{}", card["name"]);
//! engine.close();
//! # Ok(())
//! # }
//! ```

pub mod api;
mod engine;
mod headers;
mod request;
mod response;
mod session;

pub use api::{
    Auth, CardFilter, Cards, CollectionId, CollectionUpdate, Collections, DEFAULT_SEARCH_LIMIT,
    Dashboards, Databases, ItemsQuery, Search, SearchQuery,
};
pub use engine::{Engine, REQUEST_TIMEOUT};
pub use headers::{API_KEY_HEADER, SESSION_HEADER, auth_headers};
pub use request::{ApiRequest, Method};
pub use response::classify;
pub use session::create_session;

pub use metabase_core::{Error, Result};
