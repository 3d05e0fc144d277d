//! Bootstrap payload emitted by the external manifest builder.
//!
//! The builder encodes flags as `0`/`1` and an empty URL map as `[]`, so the
//! decoders here accept both those and the plain JSON forms.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::Error;

/// Cache name used when the payload doesn't carry one.
pub const DEFAULT_STORAGE_KEY: &str = "__offline-shell";

/// Desired state as delivered to the agent at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bootstrap {
    /// Identifier shared by the content cache and the fingerprint store.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Tracked resources: URL -> fingerprint.
    #[serde(default, deserialize_with = "url_map")]
    pub urls: BTreeMap<String, String>,

    /// Resources cached without fingerprint tracking.
    #[serde(default)]
    pub enqueues: Vec<String>,

    #[serde(default, deserialize_with = "flag")]
    pub enqueues_background: bool,

    #[serde(default, deserialize_with = "flag")]
    pub debug: bool,

    #[serde(default, deserialize_with = "flag")]
    pub race_enabled: bool,
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            urls: BTreeMap::new(),
            enqueues: Vec::new(),
            enqueues_background: false,
            debug: false,
            race_enabled: false,
        }
    }
}

impl Bootstrap {
    /// Parse a payload from JSON text.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::InvalidManifest(e.to_string()))
    }

    /// Read and parse a payload file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::InvalidManifest(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagRepr {
    Bool(bool),
    Int(i64),
}

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match FlagRepr::deserialize(deserializer)? {
        FlagRepr::Bool(b) => b,
        FlagRepr::Int(i) => i != 0,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FingerprintRepr {
    Text(String),
    Number(serde_json::Number),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UrlMapRepr {
    Map(BTreeMap<String, FingerprintRepr>),
    Empty([(); 0]),
}

fn url_map<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error> {
    Ok(match UrlMapRepr::deserialize(deserializer)? {
        UrlMapRepr::Map(map) => map
            .into_iter()
            .map(|(url, fingerprint)| {
                let fingerprint = match fingerprint {
                    FingerprintRepr::Text(s) => s,
                    FingerprintRepr::Number(n) => n.to_string(),
                };
                (url, fingerprint)
            })
            .collect(),
        UrlMapRepr::Empty(_) => BTreeMap::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_builder_payload() {
        let json = r#"{
            "storageKey": "__offline-shell",
            "urls": {"https://example.com/wp-content/themes/t/style.css": "1467034562"},
            "debug": 0,
            "raceEnabled": 1,
            "enqueuesBackground": 1,
            "enqueues": ["https://example.com/wp-includes/js/jquery/jquery.js"]
        }"#;

        let bootstrap = Bootstrap::from_json(json).unwrap();
        assert_eq!(bootstrap.storage_key, "__offline-shell");
        assert_eq!(
            bootstrap.urls.get("https://example.com/wp-content/themes/t/style.css").map(String::as_str),
            Some("1467034562")
        );
        assert!(!bootstrap.debug);
        assert!(bootstrap.race_enabled);
        assert!(bootstrap.enqueues_background);
        assert_eq!(bootstrap.enqueues.len(), 1);
    }

    #[test]
    fn test_empty_url_list_is_empty_map() {
        let bootstrap = Bootstrap::from_json(r#"{"storageKey": "s", "urls": [], "enqueues": []}"#).unwrap();
        assert!(bootstrap.urls.is_empty());
    }

    #[test]
    fn test_non_empty_url_list_is_rejected() {
        let result = Bootstrap::from_json(r#"{"urls": ["/a.css"]}"#);
        assert!(matches!(result, Err(Error::InvalidManifest(_))));
    }

    #[test]
    fn test_numeric_fingerprint_and_bool_flags() {
        let bootstrap = Bootstrap::from_json(r#"{"urls": {"/app.css": 100}, "debug": true}"#).unwrap();
        assert_eq!(bootstrap.urls["/app.css"], "100");
        assert!(bootstrap.debug);
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let bootstrap = Bootstrap::from_json("{}").unwrap();
        assert_eq!(bootstrap, Bootstrap::default());
        assert_eq!(bootstrap.storage_key, DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(Bootstrap::from_json("{"), Err(Error::InvalidManifest(_))));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = Bootstrap::load("/nonexistent/offshell-bootstrap.json").await;
        assert!(matches!(result, Err(Error::InvalidManifest(msg)) if msg.contains("offshell-bootstrap.json")));
    }
}
