//! Fingerprint store operations.
//!
//! Records, per resource URL, the fingerprint that was current the last
//! time the resource was cached. A missing record means "never cached".

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored fingerprint record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct FingerprintRecord {
    pub url: String,
    pub fingerprint: String,
    pub updated_at: String,
}

impl CacheDb {
    /// Get the last recorded fingerprint for `url`.
    pub async fn get_fingerprint(&self, store_name: &str, url: &str) -> Result<Option<String>, Error> {
        let store_name = store_name.to_string();
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let result = conn.query_row(
                    "SELECT fingerprint FROM fingerprints WHERE store_name = ?1 AND url = ?2",
                    params![store_name, url],
                    |row| row.get(0),
                );

                match result {
                    Ok(fingerprint) => Ok(Some(fingerprint)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Record `fingerprint` as current for `url`.
    pub async fn set_fingerprint(&self, store_name: &str, url: &str, fingerprint: &str) -> Result<(), Error> {
        let store_name = store_name.to_string();
        let url = url.to_string();
        let fingerprint = fingerprint.to_string();
        let updated_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO fingerprints (store_name, url, fingerprint, updated_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(store_name, url) DO UPDATE SET
                        fingerprint = excluded.fingerprint,
                        updated_at = excluded.updated_at",
                    params![store_name, url, fingerprint, updated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the record for `url`. Deleting a missing record is not an error.
    ///
    /// Returns whether a record was removed.
    pub async fn delete_fingerprint(&self, store_name: &str, url: &str) -> Result<bool, Error> {
        let store_name = store_name.to_string();
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM fingerprints WHERE store_name = ?1 AND url = ?2",
                    params![store_name, url],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// List every record in `store_name`, ordered by URL.
    pub async fn list_fingerprints(&self, store_name: &str) -> Result<Vec<FingerprintRecord>, Error> {
        let store_name = store_name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<FingerprintRecord>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, fingerprint, updated_at FROM fingerprints WHERE store_name = ?1 ORDER BY url",
                )?;
                let records = stmt
                    .query_map(params![store_name], |row| {
                        Ok(FingerprintRecord { url: row.get(0)?, fingerprint: row.get(1)?, updated_at: row.get(2)? })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(records)
            })
            .await
            .map_err(Error::from)
    }
}
