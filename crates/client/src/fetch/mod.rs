//! HTTP fetch pipeline for the agent's network side.
//!
//! ### Network seam
//! - The engine only depends on the [`Network`] trait, so tests can swap in
//!   a recording fake and hosts can route fetches however they like.
//! - The agent itself only issues GETs; hosts forward out-of-scope requests
//!   of any method through [`Network::send`].
//!
//! ### Response handling
//! - Non-2xx responses are returned like any other response; deciding
//!   whether a status is cacheable is the synchronizer's job.
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable), checked against `Content-Length`
//!   and against the body actually read.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use reqwest::{Client, Method, StatusCode, header};
use std::time::{Duration, Instant};

use offshell_core::{AppConfig, CacheEntry, Error};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "offshell/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "offshell/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Convert into a content cache entry stored under `key`.
    ///
    /// Header values that aren't visible ASCII are dropped.
    pub fn to_cache_entry(&self, key: &str) -> CacheEntry {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        CacheEntry::new(key, self.status.as_u16(), self.content_type.clone(), headers, self.bytes.to_vec())
    }
}

/// Where the agent's network requests go.
#[async_trait]
pub trait Network: Send + Sync {
    /// Send `method` to `url` unmodified. An empty `body` sends none.
    async fn send(&self, method: Method, url: &Url, body: Bytes) -> Result<FetchResponse, Error>;

    /// Issue a GET for `url`. This is the only request the agent itself makes.
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, Error> {
        self.send(Method::GET, url, Bytes::new()).await
    }
}

/// reqwest-backed [`Network`].
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn too_large(&self, len: u64) -> Error {
        Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes))
    }
}

fn transport_error(url: &Url, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(url.to_string())
    } else {
        Error::HttpError(format!("network error: {err}"))
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn send(&self, method: Method, url: &Url, body: Bytes) -> Result<FetchResponse, Error> {
        let start = Instant::now();

        let mut request = self.http.request(method.clone(), url.clone());
        if !body.is_empty() {
            request = request.body(body);
        }
        let response = request.send().await.map_err(|e| transport_error(url, e))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(self.too_large(len));
        }

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response.bytes().await.map_err(|e| transport_error(url, e))?;

        if bytes.len() > self.config.max_bytes {
            return Err(self.too_large(bytes.len() as u64));
        }

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            method = %method,
            url = %url,
            final_url = %final_url,
            status = status.as_u16(),
            fetch_ms,
            bytes = bytes.len(),
            "fetched resource"
        );

        Ok(FetchResponse { url: url.clone(), final_url, status, content_type, bytes, headers, fetch_ms })
    }
}
