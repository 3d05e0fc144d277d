//! SQLite-backed durable stores for the offline agent.
//!
//! This module provides the two stores the agent keeps in sync with its
//! manifest, using SQLite with async access via tokio-rusqlite:
//!
//! - Content cache: request URL -> full response payload
//! - Fingerprint store: resource URL -> last synchronized fingerprint
//! - Namespacing by cache name, so several agents can share one file
//! - Automatic schema migrations and WAL mode for concurrent access

pub mod connection;
pub mod content;
pub mod fingerprints;
pub mod hash;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use content::{CacheEntry, CacheEntryMeta};
pub use fingerprints::FingerprintRecord;
pub use store::{ContentCache, FingerprintStore, NamedCache};
