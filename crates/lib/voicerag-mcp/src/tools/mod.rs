//! MCP tool modules.
//!
//! Tools are grouped by concern: knowledge-base search (mode-routed) and
//! citation grounding.

pub mod grounding;
pub mod search;
