//! metabase-core - Core types and traits for the Metabase command-line client.
//!
//! This crate holds the pieces every other layer agrees on: the
//! [`Credential`] describing how to reach and authenticate against a
//! Metabase instance, the classified [`Error`] taxonomy, the
//! [`SessionStore`] seam used to persist refreshed sessions, and the
//! export-file helpers used by the import/export commands.

pub mod credential;
pub mod error;
pub mod export;
pub mod secret;
pub mod traits;
pub mod types;

pub use credential::{AuthMethod, Credential};
pub use error::Error;
pub use secret::Secret;
pub use traits::SessionStore;
pub use types::BaseUrl;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
