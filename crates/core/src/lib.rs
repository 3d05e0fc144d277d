//! Core types and shared functionality for the offshell agent.
//!
//! This crate provides:
//! - Durable content cache and fingerprint store with SQLite backend
//! - The bootstrap payload and the manifest it resolves to
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod manifest;

pub use cache::{CacheDb, CacheEntry, ContentCache, FingerprintStore, NamedCache};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use manifest::{Bootstrap, Manifest, Policy};
