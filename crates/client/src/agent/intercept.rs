//! Per-request decision: pass through, answer from cache, or race the
//! cache against the network.

use std::sync::Arc;

use offshell_core::{CacheEntry, ContentCache, Error, Manifest};
use reqwest::{Method, Url};

use super::log::DebugLog;
use crate::fetch::{FetchResponse, Network};

const PHASE: &str = "fetch";

/// An outbound request seen by the agent.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
}

impl OutboundRequest {
    pub fn get(url: Url) -> Self {
        Self { method: Method::GET, url }
    }
}

/// A response produced for an in-scope request.
#[derive(Debug, Clone)]
pub enum Served {
    Cache(CacheEntry),
    Network(FetchResponse),
}

impl Served {
    pub fn status(&self) -> u16 {
        match self {
            Served::Cache(entry) => entry.status_code,
            Served::Network(response) => response.status.as_u16(),
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        match self {
            Served::Cache(entry) => entry.content_type.as_deref(),
            Served::Network(response) => response.content_type.as_deref(),
        }
    }

    pub fn body(&self) -> &[u8] {
        match self {
            Served::Cache(entry) => &entry.body,
            Served::Network(response) => &response.bytes,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Served::Cache(_))
    }
}

/// What the host should do with a request.
#[derive(Debug, Clone)]
pub enum Interception {
    /// Out of scope: send the request on unmodified.
    Bypass,
    /// Answer the request with this response.
    Respond(Served),
}

/// Resolves in-scope requests. Never writes to the cache.
pub struct RequestInterceptor {
    manifest: Arc<Manifest>,
    cache: Arc<dyn ContentCache>,
    network: Arc<dyn Network>,
    log: DebugLog,
}

impl RequestInterceptor {
    pub fn new(
        manifest: Arc<Manifest>, cache: Arc<dyn ContentCache>, network: Arc<dyn Network>, log: DebugLog,
    ) -> Self {
        Self { manifest, cache, network, log }
    }

    /// Whether a request is handled by the agent at all: it must be a GET
    /// whose normalized URL is tracked or enqueued.
    pub fn in_scope(&self, request: &OutboundRequest) -> bool {
        request.method == Method::GET && self.manifest.is_desired(&self.manifest.key_for(&request.url))
    }

    /// Decide how to answer `request`.
    ///
    /// # Errors
    ///
    /// Only network failures are returned, and only when no cached response
    /// is available to fall back on. Cache failures count as misses.
    pub async fn intercept(&self, request: &OutboundRequest) -> Result<Interception, Error> {
        if !self.in_scope(request) {
            return Ok(Interception::Bypass);
        }

        let key = self.manifest.key_for(&request.url);
        let served = if self.manifest.policy().race_enabled {
            self.race(request, &key).await?
        } else {
            self.cache_first(request, &key).await?
        };

        Ok(Interception::Respond(served))
    }

    async fn cache_first(&self, request: &OutboundRequest, key: &str) -> Result<Served, Error> {
        if let Some(entry) = self.lookup(key).await {
            self.log.log(PHASE, request.url.as_str(), "cache hit, answering from cache");
            return Ok(Served::Cache(entry));
        }

        self.log.log(PHASE, request.url.as_str(), "cache miss, retrieving from server");
        self.network.fetch(&request.url).await.map(Served::Network)
    }

    /// First usable answer wins. A cache miss isn't usable, and a network
    /// failure defers to whatever the cache produces.
    ///
    /// The network fetch runs as its own task: when the cache wins, the
    /// fetch is left to finish and its response is discarded.
    async fn race(&self, request: &OutboundRequest, key: &str) -> Result<Served, Error> {
        let network = Arc::clone(&self.network);
        let url = request.url.clone();
        let task = tokio::spawn(async move { network.fetch(&url).await });

        let from_cache = self.lookup(key);
        let from_network = async move {
            task.await
                .unwrap_or_else(|e| Err(Error::HttpError(format!("network task did not complete: {e}"))))
        };
        tokio::pin!(from_cache);
        tokio::pin!(from_network);

        tokio::select! {
            biased;

            entry = &mut from_cache => match entry {
                Some(entry) => {
                    self.log.log(PHASE, request.url.as_str(), "cache hit, answering from cache");
                    Ok(Served::Cache(entry))
                }
                None => {
                    self.log.log(PHASE, request.url.as_str(), "cache miss, retrieving from server");
                    from_network.await.map(Served::Network)
                }
            },
            response = &mut from_network => match response {
                Ok(response) => {
                    self.log.log(PHASE, request.url.as_str(), "retrieved from server");
                    Ok(Served::Network(response))
                }
                Err(e) => {
                    self.log.warn(PHASE, request.url.as_str(), &e);
                    from_cache.await.map(Served::Cache).ok_or(e)
                }
            },
        }
    }

    async fn lookup(&self, key: &str) -> Option<CacheEntry> {
        match self.cache.get(key).await {
            Ok(entry) => entry,
            Err(e) => {
                self.log.warn(PHASE, key, &e);
                None
            }
        }
    }
}
