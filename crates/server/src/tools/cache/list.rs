//! cache_list tool implementation.

use offshell_core::NamedCache;
use offshell_core::cache::{CacheEntryMeta, FingerprintRecord};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub cache_name: String,
    pub entries: Vec<CacheEntryMeta>,
    pub fingerprints: Vec<FingerprintRecord>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(store: &NamedCache) -> Result<CallToolResult, McpError> {
    let output = CacheListOutput {
        cache_name: store.name().to_string(),
        entries: store.entries().await?,
        fingerprints: store.fingerprints().await?,
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{StaticNetwork, fixture, json};
    use offshell_client::Lifecycle;

    #[tokio::test]
    async fn test_list_empty_namespace() {
        let fx = fixture("{}", StaticNetwork::default()).await;

        let output = json(&list_impl(&fx.store).await.unwrap());

        assert_eq!(output["cache_name"], "__offline-shell");
        assert_eq!(output["entries"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_list_after_install() {
        let network = StaticNetwork::default().serve("/app.css", "css").serve("/jquery.js", "js");
        let fx = fixture(r#"{"urls": {"/app.css": "1"}, "enqueues": ["/jquery.js"]}"#, network).await;
        fx.agent.install().await.unwrap();

        let output = json(&list_impl(&fx.store).await.unwrap());

        assert_eq!(output["entries"].as_array().unwrap().len(), 2);
        assert_eq!(output["entries"][0]["url"], "https://example.com/app.css");
        let fingerprints = output["fingerprints"].as_array().unwrap();
        assert_eq!(fingerprints.len(), 1);
        assert_eq!(fingerprints[0]["fingerprint"], "1");
    }
}
