//! In-memory fakes for engine tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use offshell_core::{Bootstrap, CacheEntry, ContentCache, Error, FingerprintStore, Manifest};
use reqwest::{Method, StatusCode, Url, header};

use crate::fetch::{FetchResponse, Network};

pub const ORIGIN: &str = "https://example.com";

pub fn origin() -> Url {
    Url::parse(ORIGIN).unwrap()
}

pub fn manifest(json: &str) -> Manifest {
    Manifest::new(Bootstrap::from_json(json).unwrap(), &origin()).unwrap()
}

pub fn url(path: &str) -> String {
    format!("{ORIGIN}{path}")
}

pub fn entry(path: &str, body: &str) -> CacheEntry {
    CacheEntry::new(url(path), 200, Some("text/plain".into()), Vec::new(), body.as_bytes().to_vec())
}

enum Route {
    Respond { status: StatusCode, body: &'static str, delay: Duration },
    Fail { delay: Duration },
}

/// Network double that records every fetch.
#[derive(Default)]
pub struct FakeNetwork {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<String>>,
    completed: Mutex<Vec<String>>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(self, path: &str, body: &'static str) -> Self {
        self.route(path, Route::Respond { status: StatusCode::OK, body, delay: Duration::ZERO })
    }

    pub fn serve_status(self, path: &str, status: StatusCode) -> Self {
        self.route(path, Route::Respond { status, body: "", delay: Duration::ZERO })
    }

    pub fn serve_after(self, path: &str, body: &'static str, delay: Duration) -> Self {
        self.route(path, Route::Respond { status: StatusCode::OK, body, delay })
    }

    pub fn fail(self, path: &str) -> Self {
        self.route(path, Route::Fail { delay: Duration::ZERO })
    }

    pub fn fail_after(self, path: &str, delay: Duration) -> Self {
        self.route(path, Route::Fail { delay })
    }

    fn route(self, path: &str, route: Route) -> Self {
        self.routes.lock().unwrap().insert(url(path), route);
        self
    }

    /// Every fetched URL, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, path: &str) -> usize {
        count_path(&self.calls.lock().unwrap(), path)
    }

    /// Fetches of `path` that ran to the end, successful or not.
    pub fn completed_count(&self, path: &str) -> usize {
        count_path(&self.completed.lock().unwrap(), path)
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn send(&self, _method: Method, request: &Url, _body: Bytes) -> Result<FetchResponse, Error> {
        self.calls.lock().unwrap().push(request.to_string());

        let mut key = request.clone();
        key.set_query(None);
        key.set_fragment(None);

        let outcome = match self.routes.lock().unwrap().get(key.as_str()) {
            Some(Route::Respond { status, body, delay }) => Ok((*status, *body, *delay)),
            Some(Route::Fail { delay }) => Err(*delay),
            None => Err(Duration::ZERO),
        };

        match outcome {
            Ok((status, body, delay)) => {
                pause(delay).await;
                self.completed.lock().unwrap().push(request.to_string());
                Ok(FetchResponse {
                    url: request.clone(),
                    final_url: request.clone(),
                    status,
                    content_type: Some("text/plain".into()),
                    bytes: Bytes::from_static(body.as_bytes()),
                    headers: header::HeaderMap::new(),
                    fetch_ms: delay.as_millis() as u64,
                })
            }
            Err(delay) => {
                pause(delay).await;
                self.completed.lock().unwrap().push(request.to_string());
                Err(Error::HttpError(format!("network error: {request}")))
            }
        }
    }
}

/// Content cache and fingerprint store held in memory, with fault injection.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, CacheEntry>>,
    fingerprints: Mutex<BTreeMap<String, String>>,
    get_delay: Duration,
    broken_reads: bool,
    broken_listing: bool,
    broken_deletes: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(self, path: &str, body: &str) -> Self {
        self.entries.lock().unwrap().insert(url(path), entry(path, body));
        self
    }

    pub fn with_fingerprint(self, path: &str, fingerprint: &str) -> Self {
        self.fingerprints.lock().unwrap().insert(url(path), fingerprint.to_string());
        self
    }

    pub fn with_get_delay(mut self, delay: Duration) -> Self {
        self.get_delay = delay;
        self
    }

    pub fn with_broken_reads(mut self) -> Self {
        self.broken_reads = true;
        self
    }

    pub fn with_broken_listing(mut self) -> Self {
        self.broken_listing = true;
        self
    }

    pub fn with_broken_delete(mut self, path: &str) -> Self {
        self.broken_deletes.insert(url(path));
        self
    }

    pub fn body(&self, path: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap()
            .get(&url(path))
            .map(|e| String::from_utf8_lossy(&e.body).into_owned())
    }

    pub fn stored_fingerprint(&self, path: &str) -> Option<String> {
        self.fingerprints.lock().unwrap().get(&url(path)).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().unwrap().keys().cloned().collect()
    }
}

fn count_path(urls: &[String], path: &str) -> usize {
    let target = url(path);
    urls.iter().filter(|u| u.split('?').next() == Some(target.as_str())).count()
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

fn storage_error(what: &str) -> Error {
    Error::InvalidInput(format!("storage unavailable: {what}"))
}

#[async_trait]
impl ContentCache for MemoryStore {
    async fn put(&self, entry: &CacheEntry) -> Result<(), Error> {
        self.entries.lock().unwrap().insert(entry.url.clone(), entry.clone());
        Ok(())
    }

    async fn get(&self, url: &str) -> Result<Option<CacheEntry>, Error> {
        pause(self.get_delay).await;
        if self.broken_reads {
            return Err(storage_error(url));
        }
        Ok(self.entries.lock().unwrap().get(url).cloned())
    }

    async fn urls(&self) -> Result<Vec<String>, Error> {
        if self.broken_listing {
            return Err(storage_error("keys"));
        }
        Ok(self.keys())
    }

    async fn delete(&self, url: &str) -> Result<bool, Error> {
        if self.broken_deletes.contains(url) {
            return Err(storage_error(url));
        }
        Ok(self.entries.lock().unwrap().remove(url).is_some())
    }
}

#[async_trait]
impl FingerprintStore for MemoryStore {
    async fn fingerprint(&self, url: &str) -> Result<Option<String>, Error> {
        Ok(self.fingerprints.lock().unwrap().get(url).cloned())
    }

    async fn set_fingerprint(&self, url: &str, fingerprint: &str) -> Result<(), Error> {
        self.fingerprints.lock().unwrap().insert(url.to_string(), fingerprint.to_string());
        Ok(())
    }

    async fn remove_fingerprint(&self, url: &str) -> Result<(), Error> {
        self.fingerprints.lock().unwrap().remove(url);
        Ok(())
    }
}
