//! Store seams used by the agent engine.
//!
//! The engine only talks to these traits; `NamedCache` is the SQLite
//! implementation, bound to one cache name.

use super::connection::CacheDb;
use super::content::{CacheEntry, CacheEntryMeta};
use super::fingerprints::FingerprintRecord;
use crate::Error;
use async_trait::async_trait;
use std::sync::Arc;

/// Durable request URL -> response payload store.
///
/// Implementations must be safe for concurrent access to different keys.
#[async_trait]
pub trait ContentCache: Send + Sync {
    /// Insert or overwrite the entry for `entry.url`.
    async fn put(&self, entry: &CacheEntry) -> Result<(), Error>;

    /// Look up an entry by exact URL.
    async fn get(&self, url: &str) -> Result<Option<CacheEntry>, Error>;

    /// Enumerate every cached URL.
    async fn urls(&self) -> Result<Vec<String>, Error>;

    /// Delete one entry, returning whether it existed.
    async fn delete(&self, url: &str) -> Result<bool, Error>;
}

/// Durable resource URL -> last synchronized fingerprint store.
#[async_trait]
pub trait FingerprintStore: Send + Sync {
    async fn fingerprint(&self, url: &str) -> Result<Option<String>, Error>;

    async fn set_fingerprint(&self, url: &str, fingerprint: &str) -> Result<(), Error>;

    /// Removing an absent record is a silent no-op.
    async fn remove_fingerprint(&self, url: &str) -> Result<(), Error>;
}

/// SQLite stores bound to one cache name.
#[derive(Clone, Debug)]
pub struct NamedCache {
    db: CacheDb,
    name: Arc<str>,
}

impl NamedCache {
    pub fn new(db: CacheDb, name: impl Into<String>) -> Self {
        Self { db, name: Arc::from(name.into()) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entry metadata, ordered by URL.
    pub async fn entries(&self) -> Result<Vec<CacheEntryMeta>, Error> {
        self.db.list_entries(&self.name).await
    }

    /// Fingerprint records, ordered by URL.
    pub async fn fingerprints(&self) -> Result<Vec<FingerprintRecord>, Error> {
        self.db.list_fingerprints(&self.name).await
    }
}

#[async_trait]
impl ContentCache for NamedCache {
    async fn put(&self, entry: &CacheEntry) -> Result<(), Error> {
        self.db.put_entry(&self.name, entry).await
    }

    async fn get(&self, url: &str) -> Result<Option<CacheEntry>, Error> {
        self.db.get_entry(&self.name, url).await
    }

    async fn urls(&self) -> Result<Vec<String>, Error> {
        self.db.list_entry_urls(&self.name).await
    }

    async fn delete(&self, url: &str) -> Result<bool, Error> {
        self.db.delete_entry(&self.name, url).await
    }
}

#[async_trait]
impl FingerprintStore for NamedCache {
    async fn fingerprint(&self, url: &str) -> Result<Option<String>, Error> {
        self.db.get_fingerprint(&self.name, url).await
    }

    async fn set_fingerprint(&self, url: &str, fingerprint: &str) -> Result<(), Error> {
        self.db.set_fingerprint(&self.name, url, fingerprint).await
    }

    async fn remove_fingerprint(&self, url: &str) -> Result<(), Error> {
        self.db.delete_fingerprint(&self.name, url).await.map(|_| ())
    }
}
