use std::borrow::Cow;
use std::fmt;

use rmcp::ErrorData;
use rmcp::model::{CallToolResult, Content, ErrorCode};
use voicerag_core::types::{ToolPayload, ToolResult};

pub(crate) fn mcp_err(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> ErrorData {
    ErrorData {
        code,
        message: message.into(),
        data: None,
    }
}

pub(crate) fn internal_err(err: impl fmt::Display) -> ErrorData {
    mcp_err(ErrorCode::INTERNAL_ERROR, err.to_string())
}

/// Flattens the directional envelope into MCP content: model-bound text
/// payloads become text blocks, client-bound structured payloads become JSON
/// blocks.
pub(crate) fn into_call_result(result: ToolResult) -> Result<CallToolResult, ErrorData> {
    let content = match result.payload {
        ToolPayload::Text(text) => Content::text(text),
        ToolPayload::Json(value) => Content::json(value)?,
    };
    Ok(CallToolResult::success(vec![content]))
}
