//! agent_fetch tool implementation.
//!
//! Routes one request through the agent the way the host runtime would:
//! in-scope requests are answered by the interceptor, everything else goes
//! straight to the network with its method and body unchanged.

use bytes::Bytes;
use offshell_client::{Agent, Interception, Lifecycle, Network, OutboundRequest, Served};
use offshell_core::Error;
use reqwest::Method;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::error::ToolError;

/// Input parameters for the agent_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AgentFetchParams {
    /// Absolute URL, or a path resolved against the agent's origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET requests are ever intercepted.
    #[serde(default = "default_method")]
    pub method: String,

    /// Request body, forwarded as-is when the request passes through.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Network,
    Passthrough,
}

/// Output structure for the agent_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AgentFetchOutput {
    pub url: String,
    pub source: Source,
    pub status: u16,
    pub content_type: Option<String>,
    /// Body decoded as UTF-8, with invalid sequences replaced.
    pub body: String,
}

impl AgentFetchOutput {
    fn served(url: String, served: &Served) -> Self {
        Self {
            url,
            source: if served.is_cached() { Source::Cache } else { Source::Network },
            status: served.status(),
            content_type: served.content_type().map(str::to_string),
            body: String::from_utf8_lossy(served.body()).into_owned(),
        }
    }
}

/// Implementation of the agent_fetch tool.
pub async fn fetch_impl(
    agent: &Agent, network: &dyn Network, params: AgentFetchParams,
) -> Result<CallToolResult, McpError> {
    let raw = params.url.trim();
    if raw.is_empty() {
        return Err(ToolError::InvalidInput("url cannot be empty".into()).into());
    }

    let url = agent
        .manifest()
        .origin()
        .join(raw)
        .map_err(|e| Error::InvalidUrl(format!("{raw}: {e}")))?;

    let method = Method::from_bytes(params.method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| ToolError::InvalidInput(format!("unsupported method: {}", params.method)))?;

    let request = OutboundRequest { method, url };
    let output = match agent.intercept(&request).await? {
        Interception::Respond(served) => AgentFetchOutput::served(request.url.to_string(), &served),
        Interception::Bypass => {
            tracing::debug!(method = %request.method, url = %request.url, "passthrough");
            let body = params.body.map(Bytes::from).unwrap_or_default();
            let response = network.send(request.method.clone(), &request.url, body).await?;
            AgentFetchOutput {
                url: request.url.to_string(),
                source: Source::Passthrough,
                status: response.status.as_u16(),
                content_type: response.content_type.clone(),
                body: String::from_utf8_lossy(&response.bytes).into_owned(),
            }
        }
    };

    json_result(&output)
}
