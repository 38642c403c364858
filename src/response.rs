use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

use crate::error::ReviewError;

/// Reply to a method call on the message boundary.
///
/// Serialized shape:
/// `{"status":"success","result":...}`, `{"status":"error","code":..,"message":..}`
/// or `{"status":"not_implemented"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodReply {
    Success { result: serde_json::Value },
    Error { code: String, message: String },
    NotImplemented,
}

impl MethodReply {
    pub fn success(result: impl Into<serde_json::Value>) -> Self {
        Self::Success {
            result: result.into(),
        }
    }

    pub fn empty() -> Self {
        Self::Success {
            result: serde_json::Value::Null,
        }
    }

    pub fn error(e: &ReviewError) -> Self {
        Self::Error {
            code: e.code().to_string(),
            message: e.user_message(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Convert to MCP CallToolResult.
    /// Always a success at the transport level; the status lives in the JSON payload
    /// so an operation-level error is never mistaken for a protocol failure.
    pub fn into_call_tool_result(self) -> CallToolResult {
        match serde_json::to_string(&self) {
            Ok(json) => CallToolResult::success(vec![Content::text(json)]),
            Err(e) => {
                let escaped = e.to_string().replace('\\', "\\\\").replace('"', "\\\"");
                CallToolResult::success(vec![Content::text(format!(
                    r#"{{"status":"error","code":"error","message":"serialization failed: {escaped}"}}"#
                ))])
            }
        }
    }
}

impl<T: Into<serde_json::Value>> From<Result<T, ReviewError>> for MethodReply {
    fn from(result: Result<T, ReviewError>) -> Self {
        match result {
            Ok(value) => Self::success(value),
            Err(e) => Self::error(&e),
        }
    }
}
