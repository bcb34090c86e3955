//! Traits for the collaborators the request engine depends on.

mod session_store;

pub use session_store::SessionStore;
