//! agent_install and agent_activate tool implementations.
//!
//! Both re-run the corresponding lifecycle step on the live agent and
//! return its report.

use offshell_client::{Agent, Lifecycle};
use rmcp::{ErrorData as McpError, model::CallToolResult};

use super::json_result;

/// Implementation of the agent_install tool.
pub async fn install_impl(agent: &Agent) -> Result<CallToolResult, McpError> {
    let report = agent.install().await?;
    json_result(&report)
}

/// Implementation of the agent_activate tool.
pub async fn activate_impl(agent: &Agent) -> Result<CallToolResult, McpError> {
    let report = agent.activate().await?;
    json_result(&report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{StaticNetwork, fixture, json};
    use offshell_client::Phase;
    use rmcp::model::ErrorCode;

    #[tokio::test]
    async fn test_install_reports_refreshed_urls() {
        let fx = fixture(r#"{"urls": {"/app.css": "1"}}"#, StaticNetwork::default().serve("/app.css", "css")).await;

        let result = install_impl(&fx.agent).await.unwrap();
        let report = json(&result);

        assert_eq!(report["refreshed"], serde_json::json!(["https://example.com/app.css"]));
        assert_eq!(fx.agent.phase().await, Phase::Installed);
    }

    #[tokio::test]
    async fn test_install_incomplete_surfaces_error_code() {
        let fx = fixture(r#"{"enqueues": ["/missing.js"]}"#, StaticNetwork::default()).await;

        let err = install_impl(&fx.agent).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32010));
        assert!(err.message.starts_with("SYNC_INCOMPLETE"));
    }

    #[tokio::test]
    async fn test_activate_before_install_is_rejected() {
        let fx = fixture("{}", StaticNetwork::default()).await;

        let err = activate_impl(&fx.agent).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32009));
    }

    #[tokio::test]
    async fn test_activate_after_install_reports_removals() {
        let fx = fixture("{}", StaticNetwork::default()).await;
        install_impl(&fx.agent).await.unwrap();

        let result = activate_impl(&fx.agent).await.unwrap();
        let report = json(&result);

        assert_eq!(report["removed"], serde_json::json!([]));
        assert_eq!(fx.agent.phase().await, Phase::Activated);
    }
}
