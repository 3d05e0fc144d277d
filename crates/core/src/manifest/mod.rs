//! Desired state the agent converges its cache toward.
//!
//! A `Manifest` is resolved once from a [`Bootstrap`] payload and never
//! mutated afterwards; a new desired state means a new agent instance.
//! All URLs are stored normalized against the agent's origin, so they can
//! be compared directly with normalized request URLs.

mod bootstrap;
pub mod normalize;

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};

use url::Url;

use crate::Error;

pub use bootstrap::{Bootstrap, DEFAULT_STORAGE_KEY};
pub use normalize::{UrlError, ignore_search, normalize};

/// Policy flags carried by the bootstrap payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    /// Race the cache lookup against the network for in-scope requests.
    pub race_enabled: bool,
    /// Fetch enqueued resources without gating install on them.
    pub enqueue_in_background: bool,
    pub debug_logging: bool,
}

/// Read-only view of the desired state.
#[derive(Debug, Clone)]
pub struct Manifest {
    cache_name: String,
    origin: Url,
    tracked: BTreeMap<String, String>,
    enqueued: Vec<String>,
    enqueued_index: HashSet<String>,
    policy: Policy,
}

impl Manifest {
    /// Resolve a bootstrap payload against the agent's origin.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidManifest` if the storage key is empty, any
    /// URL fails to normalize, or two tracked URLs normalize to the same key
    /// with different fingerprints.
    pub fn new(bootstrap: Bootstrap, origin: &Url) -> Result<Self, Error> {
        if bootstrap.storage_key.trim().is_empty() {
            return Err(Error::InvalidManifest("storageKey must not be empty".into()));
        }

        let resolve = |raw: &str| {
            normalize(raw, origin)
                .map(String::from)
                .map_err(|e| Error::InvalidManifest(format!("{raw}: {e}")))
        };

        let mut tracked: BTreeMap<String, String> = BTreeMap::new();
        for (url, fingerprint) in &bootstrap.urls {
            match tracked.entry(resolve(url)?) {
                Entry::Vacant(slot) => {
                    slot.insert(fingerprint.clone());
                }
                Entry::Occupied(slot) if slot.get() != fingerprint => {
                    return Err(Error::InvalidManifest(format!(
                        "{url} resolves to {} which is already tracked with a different fingerprint",
                        slot.key()
                    )));
                }
                Entry::Occupied(_) => {}
            }
        }

        let mut enqueued = Vec::with_capacity(bootstrap.enqueues.len());
        let mut enqueued_index = HashSet::with_capacity(bootstrap.enqueues.len());
        for url in &bootstrap.enqueues {
            let url = resolve(url)?;
            if enqueued_index.insert(url.clone()) {
                enqueued.push(url);
            }
        }

        Ok(Self {
            cache_name: bootstrap.storage_key,
            origin: origin.clone(),
            tracked,
            enqueued,
            enqueued_index,
            policy: Policy {
                race_enabled: bootstrap.race_enabled,
                enqueue_in_background: bootstrap.enqueues_background,
                debug_logging: bootstrap.debug,
            },
        })
    }

    /// Identifier shared by the content cache and the fingerprint store.
    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Tracked URLs and their current fingerprints.
    pub fn tracked(&self) -> &BTreeMap<String, String> {
        &self.tracked
    }

    /// Enqueued URLs, in payload order without duplicates.
    pub fn enqueued(&self) -> &[String] {
        &self.enqueued
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// The current fingerprint of a tracked URL.
    pub fn fingerprint(&self, url: &str) -> Option<&str> {
        self.tracked.get(url).map(String::as_str)
    }

    pub fn is_tracked(&self, url: &str) -> bool {
        self.tracked.contains_key(url)
    }

    pub fn is_enqueued(&self, url: &str) -> bool {
        self.enqueued_index.contains(url)
    }

    /// Whether `url` belongs to the union of tracked and enqueued URLs.
    pub fn is_desired(&self, url: &str) -> bool {
        self.is_tracked(url) || self.is_enqueued(url)
    }

    /// True when there is nothing to cache.
    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty() && self.enqueued.is_empty()
    }

    /// Normalize a request URL into the form manifest keys use.
    pub fn key_for(&self, url: &Url) -> String {
        ignore_search(url, &self.origin).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://example.com").unwrap()
    }

    fn bootstrap() -> Bootstrap {
        Bootstrap {
            urls: [("/app.css".to_string(), "100".to_string())].into_iter().collect(),
            enqueues: vec!["/jquery.js?ver=1".into(), "/jquery.js".into(), "https://cdn.test/x.js".into()],
            race_enabled: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_urls_are_normalized() {
        let manifest = Manifest::new(bootstrap(), &origin()).unwrap();
        assert_eq!(manifest.fingerprint("https://example.com/app.css"), Some("100"));
        assert_eq!(manifest.enqueued(), ["https://example.com/jquery.js", "https://cdn.test/x.js"]);
    }

    #[test]
    fn test_membership() {
        let manifest = Manifest::new(bootstrap(), &origin()).unwrap();
        assert!(manifest.is_tracked("https://example.com/app.css"));
        assert!(!manifest.is_enqueued("https://example.com/app.css"));
        assert!(manifest.is_desired("https://example.com/jquery.js"));
        assert!(!manifest.is_desired("https://example.com/other.css"));
    }

    #[test]
    fn test_policy_mapping() {
        let manifest = Manifest::new(bootstrap(), &origin()).unwrap();
        assert_eq!(
            manifest.policy(),
            Policy { race_enabled: true, enqueue_in_background: false, debug_logging: false }
        );
        assert_eq!(manifest.cache_name(), DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn test_key_for_request() {
        let manifest = Manifest::new(bootstrap(), &origin()).unwrap();
        let request = Url::parse("https://example.com/app.css?ver=9#a").unwrap();
        assert_eq!(manifest.key_for(&request), "https://example.com/app.css");
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = Manifest::new(Bootstrap::default(), &origin()).unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_rejects_empty_storage_key() {
        let result = Manifest::new(Bootstrap { storage_key: " ".into(), ..Default::default() }, &origin());
        assert!(matches!(result, Err(Error::InvalidManifest(_))));
    }

    #[test]
    fn test_rejects_bad_url() {
        let payload = Bootstrap { enqueues: vec!["ftp://example.com/a".into()], ..Default::default() };
        let result = Manifest::new(payload, &origin());
        assert!(matches!(result, Err(Error::InvalidManifest(msg)) if msg.contains("ftp://")));
    }

    #[test]
    fn test_rejects_conflicting_tracked_aliases() {
        let payload = Bootstrap {
            urls: [("/a.css?v=1".to_string(), "1".to_string()), ("/a.css?v=2".to_string(), "2".to_string())]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        let result = Manifest::new(payload, &origin());
        assert!(matches!(result, Err(Error::InvalidManifest(msg)) if msg.contains("https://example.com/a.css")));
    }

    #[test]
    fn test_accepts_tracked_aliases_with_same_fingerprint() {
        let payload = Bootstrap {
            urls: [("/a.css".to_string(), "1".to_string()), ("/a.css?v=1".to_string(), "1".to_string())]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        let manifest = Manifest::new(payload, &origin()).unwrap();
        assert_eq!(manifest.tracked().len(), 1);
        assert_eq!(manifest.fingerprint("https://example.com/a.css"), Some("1"));
    }
}
