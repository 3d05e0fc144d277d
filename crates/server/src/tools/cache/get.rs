//! cache_get tool implementation.
//!
//! Retrieves one cached entry, and its fingerprint if tracked, by URL.

use offshell_core::manifest::normalize;
use offshell_core::{ContentCache, Error, FingerprintStore, Manifest, NamedCache};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// The URL to look up. Same-origin query strings are ignored.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    /// Normalized cache key.
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body_sha256: String,
    pub stored_at: String,
    /// Fingerprint recorded at the last sync; absent for enqueued resources.
    pub fingerprint: Option<String>,
    pub body: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(
    store: &NamedCache, manifest: &Manifest, params: CacheGetParams,
) -> Result<CallToolResult, McpError> {
    let key = normalize(&params.url, manifest.origin())
        .map_err(|e| Error::InvalidUrl(e.to_string()))?
        .to_string();

    let entry = store.get(&key).await?.ok_or_else(|| Error::CacheMiss(key.clone()))?;
    let fingerprint = store.fingerprint(&key).await?;

    let output = CacheGetOutput {
        body: String::from_utf8_lossy(&entry.body).into_owned(),
        url: entry.url,
        status_code: entry.status_code,
        content_type: entry.content_type,
        headers: entry.headers,
        body_sha256: entry.body_sha256,
        stored_at: entry.stored_at,
        fingerprint,
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{StaticNetwork, fixture, json};
    use offshell_client::Lifecycle;
    use rmcp::model::ErrorCode;

    #[tokio::test]
    async fn test_get_impl_missing() {
        let fx = fixture("{}", StaticNetwork::default()).await;
        let params = CacheGetParams { url: "/nonexistent.js".into() };

        let err = get_impl(&fx.store, fx.agent.manifest(), params).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32001));
    }

    #[tokio::test]
    async fn test_get_impl_found_with_fingerprint() {
        let fx = fixture(r#"{"urls": {"/app.css": "7"}}"#, StaticNetwork::default().serve("/app.css", "css")).await;
        fx.agent.install().await.unwrap();

        let params = CacheGetParams { url: "https://example.com/app.css?ver=7".into() };
        let result = get_impl(&fx.store, fx.agent.manifest(), params).await.unwrap();
        let output = json(&result);

        assert_eq!(output["url"], "https://example.com/app.css");
        assert_eq!(output["fingerprint"], "7");
        assert_eq!(output["body"], "css");
    }

    #[tokio::test]
    async fn test_get_impl_rejects_bad_scheme() {
        let fx = fixture("{}", StaticNetwork::default()).await;
        let params = CacheGetParams { url: "ftp://example.com/file".into() };

        let err = get_impl(&fx.store, fx.agent.manifest(), params).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32003));
    }
}
