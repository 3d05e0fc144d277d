//! The offline agent and its lifecycle.
//!
//! ### Lifecycle
//! - `install`: synchronize the cache with the manifest. The agent takes
//!   over matching traffic only once this has settled successfully.
//! - `activate`: reap entries the manifest no longer lists. Refused until
//!   `install` has succeeded, so nothing is deleted mid-population.
//! - `intercept`: answer one outbound request, or let it pass.
//!
//! ### Shared state
//! - The manifest is immutable and shared by all components.
//! - The content cache and fingerprint store are the only shared mutable
//!   state; the synchronizer and reaper write, the interceptor only reads.

mod intercept;
mod log;
mod reaper;
mod sync;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use async_trait::async_trait;
use offshell_core::{CacheDb, ContentCache, Error, FingerprintStore, Manifest};
use tokio::sync::RwLock;

use crate::fetch::Network;

pub use intercept::{Interception, OutboundRequest, RequestInterceptor, Served};
pub use log::DebugLog;
pub use reaper::{ReapReport, StaleEntryReaper};
pub use sync::{CacheSynchronizer, SyncReport};

/// Lifecycle hooks a host runtime drives.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    /// A new agent is ready to be brought up.
    async fn install(&self) -> Result<SyncReport, Error>;

    /// This agent takes over from any predecessor.
    async fn activate(&self) -> Result<ReapReport, Error>;

    /// One outbound request.
    async fn intercept(&self, request: &OutboundRequest) -> Result<Interception, Error>;
}

/// Where the agent is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Installing,
    Installed,
    Activated,
}

/// One agent instance bound to one manifest.
pub struct Agent {
    manifest: Arc<Manifest>,
    synchronizer: CacheSynchronizer,
    reaper: StaleEntryReaper,
    interceptor: RequestInterceptor,
    phase: RwLock<Phase>,
    log: DebugLog,
}

impl Agent {
    pub fn new(
        manifest: Manifest, cache: Arc<dyn ContentCache>, fingerprints: Arc<dyn FingerprintStore>,
        network: Arc<dyn Network>,
    ) -> Self {
        let manifest = Arc::new(manifest);
        let log = DebugLog::new(manifest.policy().debug_logging);

        Self {
            synchronizer: CacheSynchronizer::new(
                Arc::clone(&manifest),
                Arc::clone(&cache),
                Arc::clone(&fingerprints),
                Arc::clone(&network),
                log,
            ),
            reaper: StaleEntryReaper::new(Arc::clone(&manifest), Arc::clone(&cache), fingerprints, log),
            interceptor: RequestInterceptor::new(Arc::clone(&manifest), cache, network, log),
            manifest,
            phase: RwLock::new(Phase::Installing),
            log,
        }
    }

    /// Build an agent whose stores live in `db` under the manifest's cache name.
    pub fn with_database(manifest: Manifest, db: &CacheDb, network: Arc<dyn Network>) -> Self {
        let stores = Arc::new(db.named(manifest.cache_name()));
        Self::new(manifest, stores.clone(), stores, network)
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub async fn phase(&self) -> Phase {
        *self.phase.read().await
    }

    /// Wait for background work started by `install`.
    pub async fn shutdown(&self) {
        self.synchronizer.settle_background().await;
    }
}

#[async_trait]
impl Lifecycle for Agent {
    async fn install(&self) -> Result<SyncReport, Error> {
        self.log.log("install", "*", "event triggered");
        tracing::info!(
            cache = self.manifest.cache_name(),
            tracked = self.manifest.tracked().len(),
            enqueued = self.manifest.enqueued().len(),
            "installing agent"
        );

        let report = self.synchronizer.synchronize().await?;

        let mut phase = self.phase.write().await;
        if *phase == Phase::Installing {
            *phase = Phase::Installed;
        }
        Ok(report)
    }

    async fn activate(&self) -> Result<ReapReport, Error> {
        self.log.log("activate", "*", "event triggered");
        if self.phase().await == Phase::Installing {
            return Err(Error::NotInstalled("activate requires a successful install".into()));
        }

        let report = self.reaper.reap().await;
        *self.phase.write().await = Phase::Activated;
        Ok(report)
    }

    async fn intercept(&self, request: &OutboundRequest) -> Result<Interception, Error> {
        if self.phase().await == Phase::Installing {
            return Ok(Interception::Bypass);
        }
        self.interceptor.intercept(request).await
    }
}
