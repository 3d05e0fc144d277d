//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{AgentFetchParams, CacheGetParams, activate_impl, fetch_impl, get_impl, install_impl, list_impl};
use offshell_client::{Agent, Network};
use offshell_core::NamedCache;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for offshell-agent.
#[derive(Clone)]
pub struct OffshellServer {
    agent: Arc<Agent>,
    store: NamedCache,
    network: Arc<dyn Network>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl OffshellServer {
    /// Create a new server handler around a running agent.
    ///
    /// `store` must be the agent's own namespace; `network` carries
    /// requests the agent lets through.
    pub fn new(agent: Arc<Agent>, store: NamedCache, network: Arc<dyn Network>) -> Self {
        Self { agent, store, network, tool_router: Self::tool_router() }
    }

    #[tool(description = "Synchronize the offline cache with the manifest. Returns refreshed, unchanged and failed URLs.")]
    async fn agent_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.agent).await
    }

    #[tool(description = "Delete cached entries the manifest no longer lists. Requires a successful agent_install.")]
    async fn agent_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.agent).await
    }

    /// Fetch a URL through the agent.
    ///
    /// Tracked and enqueued GET requests are answered from the cache (or raced
    /// against the network); anything else is fetched directly.
    #[tool(
        description = "Fetch a URL through the offline agent. Reports whether the response came from cache, network or passthrough."
    )]
    async fn agent_fetch(&self, params: Parameters<AgentFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.agent, self.network.as_ref(), params.0).await
    }

    #[tool(description = "Get a cached entry, its fingerprint and body by URL.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.store, self.agent.manifest(), params.0).await
    }

    #[tool(description = "List cached entries and fingerprint records in this agent's cache namespace.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        list_impl(&self.store).await
    }
}

impl ServerHandler for OffshellServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "offshell-agent".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(format!("Offline agent for cache '{}'.", self.store.name())),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{StaticNetwork, fixture};

    #[tokio::test]
    async fn test_router_lists_all_tools() {
        let fx = fixture("{}", StaticNetwork::default()).await;
        let server = OffshellServer::new(fx.agent, fx.store, fx.network);

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();

        assert_eq!(names, ["agent_activate", "agent_fetch", "agent_install", "cache_get", "cache_list"]);
    }

    #[tokio::test]
    async fn test_server_info_names_cache() {
        let fx = fixture(r#"{"storageKey": "shell-v2"}"#, StaticNetwork::default()).await;
        let server = OffshellServer::new(fx.agent, fx.store, fx.network);

        let info = server.get_info();
        assert_eq!(info.server_info.name, "offshell-agent");
        assert!(info.instructions.unwrap().contains("shell-v2"));
    }
}
