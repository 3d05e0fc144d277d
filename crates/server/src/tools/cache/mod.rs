//! Cache-related MCP tools.
//!
//! Read-only views of this agent's namespace in the SQLite cache.

pub mod get;
pub mod list;

pub use get::{CacheGetParams, get_impl};
pub use list::list_impl;
