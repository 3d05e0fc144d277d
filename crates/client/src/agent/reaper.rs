//! Activation-time cleanup of entries the manifest no longer wants.

use std::sync::Arc;

use futures_util::future::join_all;
use offshell_core::{ContentCache, Error, FingerprintStore, Manifest};
use serde::{Deserialize, Serialize};

use super::log::DebugLog;

const PHASE: &str = "activate";

/// Outcome of one `reap` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReapReport {
    /// URLs whose entry and fingerprint record were deleted.
    pub removed: Vec<String>,
    /// Stale URLs that could not be deleted; the next activation retries them.
    pub failed: Vec<String>,
}

/// Removes cache entries outside the manifest's tracked and enqueued URLs.
pub struct StaleEntryReaper {
    manifest: Arc<Manifest>,
    cache: Arc<dyn ContentCache>,
    fingerprints: Arc<dyn FingerprintStore>,
    log: DebugLog,
}

impl StaleEntryReaper {
    pub fn new(
        manifest: Arc<Manifest>, cache: Arc<dyn ContentCache>, fingerprints: Arc<dyn FingerprintStore>, log: DebugLog,
    ) -> Self {
        Self { manifest, cache, fingerprints, log }
    }

    /// Delete every cached URL that is neither tracked nor enqueued, along
    /// with its fingerprint record.
    ///
    /// Must run after the matching `synchronize` has settled, otherwise an
    /// entry that is merely not cached yet can't be told apart from one that
    /// is no longer wanted.
    pub async fn reap(&self) -> ReapReport {
        let urls = match self.cache.urls().await {
            Ok(urls) => urls,
            Err(e) => {
                self.log.warn(PHASE, "*", &e);
                return ReapReport::default();
            }
        };

        let stale: Vec<String> = urls.into_iter().filter(|url| !self.manifest.is_desired(url)).collect();
        let outcomes = join_all(stale.iter().map(|url| async move { (url, self.remove(url).await) })).await;

        let mut report = ReapReport::default();
        for (url, outcome) in outcomes {
            match outcome {
                Ok(()) => report.removed.push(url.clone()),
                Err(e) => {
                    self.log.warn(PHASE, url, &e);
                    report.failed.push(url.clone());
                }
            }
        }

        tracing::debug!(removed = report.removed.len(), failed = report.failed.len(), "stale entry reap settled");
        report
    }

    async fn remove(&self, url: &str) -> Result<(), Error> {
        self.log.log(PHASE, url, "removing URL no longer desired");
        self.cache.delete(url).await?;
        self.fingerprints.remove_fingerprint(url).await
    }
}
