//! Install-time cache synchronization.
//!
//! Brings the content cache and fingerprint store up to date with the
//! manifest: tracked URLs whose fingerprint changed (or was never recorded)
//! are re-fetched, unchanged ones are skipped without touching the cache.
//! Enqueued URLs are fetched only when missing from the cache, either in
//! the background or folded into the same pass, depending on policy.

use std::sync::Arc;

use futures_util::future::join_all;
use offshell_core::{ContentCache, Error, FingerprintStore, Manifest};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use super::log::DebugLog;
use crate::fetch::Network;

const PHASE: &str = "install";

/// Outcome of one `synchronize` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// URLs fetched and stored during this call.
    pub refreshed: Vec<String>,
    /// Tracked URLs whose stored fingerprint already matched, and
    /// foreground enqueued URLs that were already cached.
    pub unchanged: Vec<String>,
    /// URLs whose fetch or store failed; they are retried on the next install.
    pub failed: Vec<String>,
    /// Enqueued URLs handed to background tasks; each task skips URLs
    /// that are already cached.
    pub background: usize,
}

enum Outcome {
    Unchanged,
    Refreshed,
}

/// Reconciles the stores against the manifest.
pub struct CacheSynchronizer {
    manifest: Arc<Manifest>,
    cache: Arc<dyn ContentCache>,
    fingerprints: Arc<dyn FingerprintStore>,
    network: Arc<dyn Network>,
    log: DebugLog,
    background: Mutex<JoinSet<()>>,
}

impl CacheSynchronizer {
    pub fn new(
        manifest: Arc<Manifest>, cache: Arc<dyn ContentCache>, fingerprints: Arc<dyn FingerprintStore>,
        network: Arc<dyn Network>, log: DebugLog,
    ) -> Self {
        Self { manifest, cache, fingerprints, network, log, background: Mutex::new(JoinSet::new()) }
    }

    /// Bring the cache up to date with the manifest.
    ///
    /// Every URL is processed concurrently and independently; a failure is
    /// logged and recorded in the report without affecting other URLs.
    /// Completion does not wait for background enqueue fetches.
    ///
    /// # Errors
    ///
    /// Returns `Error::SyncIncomplete` when enqueued URLs processed in the
    /// foreground could not be cached. All other URLs have settled by then.
    pub async fn synchronize(&self) -> Result<SyncReport, Error> {
        let policy = self.manifest.policy();
        let mut report = SyncReport::default();

        let mut work: Vec<(&str, Option<&str>)> = self
            .manifest
            .tracked()
            .iter()
            .map(|(url, fingerprint)| (url.as_str(), Some(fingerprint.as_str())))
            .collect();

        let enqueued = self.manifest.enqueued();
        if !enqueued.is_empty() {
            if policy.enqueue_in_background {
                report.background = self.spawn_background().await;
            } else {
                self.log.log(PHASE, "*", "adding enqueued URLs to the main cache list");
                work.extend(
                    enqueued
                        .iter()
                        .filter(|url| !self.manifest.is_tracked(url))
                        .map(|url| (url.as_str(), None)),
                );
            }
        }

        let outcomes = join_all(
            work.iter()
                .map(|&(url, fingerprint)| async move { (url, fingerprint, self.sync_one(url, fingerprint).await) }),
        )
        .await;

        let mut required_failed = Vec::new();
        for (url, fingerprint, outcome) in outcomes {
            match outcome {
                Ok(Outcome::Unchanged) => report.unchanged.push(url.to_string()),
                Ok(Outcome::Refreshed) => report.refreshed.push(url.to_string()),
                Err(e) => {
                    self.log.warn(PHASE, url, &e);
                    report.failed.push(url.to_string());
                    if fingerprint.is_none() {
                        required_failed.push(url.to_string());
                    }
                }
            }
        }

        tracing::debug!(
            refreshed = report.refreshed.len(),
            unchanged = report.unchanged.len(),
            failed = report.failed.len(),
            background = report.background,
            "cache synchronization settled"
        );

        if !required_failed.is_empty() {
            return Err(Error::SyncIncomplete { failed: required_failed });
        }

        Ok(report)
    }

    async fn sync_one(&self, url: &str, fingerprint: Option<&str>) -> Result<Outcome, Error> {
        let stored = self.fingerprints.fingerprint(url).await?;

        // A matching record is trusted; the cache entry itself isn't re-checked.
        if let Some(current) = fingerprint
            && stored.as_deref() == Some(current)
        {
            self.log.log(PHASE, url, "hash unchanged, doing nothing");
            return Ok(Outcome::Unchanged);
        }

        // Enqueued URLs carry no fingerprint and are refreshed only when missing.
        if fingerprint.is_none() && is_cached(self.cache.as_ref(), url, self.log).await {
            self.log.log(PHASE, url, "enqueued URL already cached, doing nothing");
            return Ok(Outcome::Unchanged);
        }

        self.log.log(PHASE, url, "hash changed or new URL, adding to cache");
        fetch_and_store(self.network.as_ref(), self.cache.as_ref(), url).await?;

        if let Some(current) = fingerprint {
            self.fingerprints.set_fingerprint(url, current).await?;
        }

        Ok(Outcome::Refreshed)
    }

    async fn spawn_background(&self) -> usize {
        let mut tasks = self.background.lock().await;
        let mut spawned = 0;
        for url in self.manifest.enqueued().iter().filter(|url| !self.manifest.is_tracked(url)) {
            let url = url.clone();
            let cache = Arc::clone(&self.cache);
            let network = Arc::clone(&self.network);
            let log = self.log;

            tasks.spawn(async move {
                if is_cached(cache.as_ref(), &url, log).await {
                    log.log(PHASE, &url, "enqueued URL already cached, doing nothing");
                    return;
                }
                match fetch_and_store(network.as_ref(), cache.as_ref(), &url).await {
                    Ok(()) => log.log(PHASE, &url, "cached enqueued URL in the background"),
                    Err(e) => log.warn(PHASE, &url, &e),
                }
            });
            spawned += 1;
        }
        spawned
    }

    /// Wait for every background enqueue fetch started so far.
    pub async fn settle_background(&self) {
        let mut tasks = self.background.lock().await;
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "background enqueue task did not complete");
            }
        }
    }
}

/// Whether an entry for `url` exists. A failed lookup counts as absent.
async fn is_cached(cache: &dyn ContentCache, url: &str, log: DebugLog) -> bool {
    match cache.get(url).await {
        Ok(entry) => entry.is_some(),
        Err(e) => {
            log.warn(PHASE, url, &e);
            false
        }
    }
}

/// Fetch `url` and store the response under it.
///
/// Only successful responses are cached.
async fn fetch_and_store(network: &dyn Network, cache: &dyn ContentCache, url: &str) -> Result<(), Error> {
    let target = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
    let response = network.fetch(&target).await?;

    if !response.status.is_success() {
        return Err(Error::HttpError(format!("status {} for {url}", response.status.as_u16())));
    }

    cache.put(&response.to_cache_entry(url)).await
}
