//! MCP tool implementations.
//!
//! This module contains all tools exposed by the offshell-agent server.

pub mod cache;
pub mod fetch;
pub mod lifecycle;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

pub use cache::{CacheGetParams, get_impl, list_impl};
pub use fetch::{AgentFetchParams, fetch_impl};
pub use lifecycle::{activate_impl, install_impl};

/// Render `output` as a pretty-printed JSON text result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| ToolError::EncodeFailed(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
