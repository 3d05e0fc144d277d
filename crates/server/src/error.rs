//! Structured errors raised by the tool layer itself.
//!
//! Engine and cache failures arrive as `offshell_core::Error` and convert
//! on their own; these cover what only the MCP surface can get wrong.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid input parameters (e.g., an unknown HTTP method).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// A tool result could not be rendered as JSON.
    #[error("ENCODE_FAILED: {0}")]
    EncodeFailed(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let code = match &err {
            ToolError::InvalidInput(_) => -32602,
            ToolError::EncodeFailed(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_maps_to_invalid_params() {
        let err: McpError = ToolError::InvalidInput("method PATCH".into()).into();
        assert_eq!(err.code, ErrorCode(-32602));
        assert_eq!(err.message, "INVALID_INPUT: method PATCH");
    }

    #[test]
    fn test_encode_failure_maps_to_internal_error() {
        let err: McpError = ToolError::EncodeFailed("bad".into()).into();
        assert_eq!(err.code, ErrorCode(-32603));
    }
}
