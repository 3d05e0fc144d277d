//! Content cache operations.
//!
//! Stores full response payloads keyed by `(cache_name, url)`. Writing an
//! existing URL overwrites the previous payload.

use super::connection::CacheDb;
use super::hash::compute_body_digest;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A cached response payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub body_sha256: String,
    pub stored_at: String,
}

impl CacheEntry {
    /// Build an entry stamped with the current time and the body digest.
    pub fn new(
        url: impl Into<String>, status_code: u16, content_type: Option<String>, headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            url: url.into(),
            status_code,
            content_type,
            headers,
            body_sha256: compute_body_digest(&body),
            body,
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Entry metadata without the body, for listings.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheEntryMeta {
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub body_len: u64,
    pub body_sha256: String,
    pub stored_at: String,
}

impl CacheDb {
    /// Insert or overwrite the entry for `entry.url` in `cache_name`.
    pub async fn put_entry(&self, cache_name: &str, entry: &CacheEntry) -> Result<(), Error> {
        let cache_name = cache_name.to_string();
        let entry = entry.clone();
        let headers_json = serde_json::to_string(&entry.headers)
            .map_err(|e| Error::InvalidInput(format!("failed to encode headers: {e}")))?;

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO content_cache (
                        cache_name, url, status_code, content_type, headers_json, body, body_sha256, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(cache_name, url) DO UPDATE SET
                        status_code = excluded.status_code,
                        content_type = excluded.content_type,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        body_sha256 = excluded.body_sha256,
                        stored_at = excluded.stored_at",
                    params![
                        cache_name,
                        &entry.url,
                        entry.status_code,
                        &entry.content_type,
                        headers_json,
                        &entry.body,
                        &entry.body_sha256,
                        &entry.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get the entry stored for `url`.
    ///
    /// Returns None if the URL isn't cached under `cache_name`.
    pub async fn get_entry(&self, cache_name: &str, url: &str) -> Result<Option<CacheEntry>, Error> {
        let cache_name = cache_name.to_string();
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status_code, content_type, headers_json, body, body_sha256, stored_at
                     FROM content_cache WHERE cache_name = ?1 AND url = ?2",
                )?;

                let result = stmt.query_row(params![cache_name, url], |row| {
                    Ok((
                        CacheEntry {
                            url: row.get(0)?,
                            status_code: row.get(1)?,
                            content_type: row.get(2)?,
                            headers: Vec::new(),
                            body: row.get(4)?,
                            body_sha256: row.get(5)?,
                            stored_at: row.get(6)?,
                        },
                        row.get::<_, Option<String>>(3)?,
                    ))
                });

                match result {
                    Ok((mut entry, headers_json)) => {
                        entry.headers = headers_json
                            .and_then(|json| serde_json::from_str(&json).ok())
                            .unwrap_or_default();
                        Ok(Some(entry))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// List every URL cached under `cache_name`.
    pub async fn list_entry_urls(&self, cache_name: &str) -> Result<Vec<String>, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM content_cache WHERE cache_name = ?1 ORDER BY url")?;
                let urls = stmt
                    .query_map(params![cache_name], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// List entry metadata for `cache_name`, ordered by URL.
    pub async fn list_entries(&self, cache_name: &str) -> Result<Vec<CacheEntryMeta>, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<CacheEntryMeta>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status_code, content_type, length(body), body_sha256, stored_at
                     FROM content_cache WHERE cache_name = ?1 ORDER BY url",
                )?;
                let entries = stmt
                    .query_map(params![cache_name], |row| {
                        Ok(CacheEntryMeta {
                            url: row.get(0)?,
                            status_code: row.get(1)?,
                            content_type: row.get(2)?,
                            body_len: row.get::<_, i64>(3)? as u64,
                            body_sha256: row.get(4)?,
                            stored_at: row.get(5)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the entry for `url`.
    ///
    /// Returns whether an entry was removed.
    pub async fn delete_entry(&self, cache_name: &str, url: &str) -> Result<bool, Error> {
        let cache_name = cache_name.to_string();
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM content_cache WHERE cache_name = ?1 AND url = ?2",
                    params![cache_name, url],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}
