use std::{error::Error, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a tool result is routed by the conversational middle tier.
///
/// `ToServer` payloads feed back into the model's reasoning context;
/// `ToClient` payloads are surfaced to the end-user channel unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolResultDirection {
    ToServer,
    ToClient,
}

/// Payload carried by a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolPayload {
    Text(String),
    Json(Value),
}

/// Result envelope returned by every tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub payload: ToolPayload,
    pub direction: ToolResultDirection,
}

impl ToolResult {
    #[must_use]
    pub fn to_server(payload: impl Into<String>) -> Self {
        Self {
            payload: ToolPayload::Text(payload.into()),
            direction: ToolResultDirection::ToServer,
        }
    }

    #[must_use]
    pub const fn to_client(payload: Value) -> Self {
        Self {
            payload: ToolPayload::Json(payload),
            direction: ToolResultDirection::ToClient,
        }
    }
}

/// A single passage returned by the search index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultRecord {
    pub chunk_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub chunk: String,
}

/// Selects which adapter serves a `search` invocation.
///
/// Carried as explicit per-registry configuration and read at the start of
/// every dispatch; there is no process-global flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMode {
    UnstructuredData,
    StructuredData,
}

impl fmt::Display for DataMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnstructuredData => write!(f, "UnstructuredData"),
            Self::StructuredData => write!(f, "StructuredData"),
        }
    }
}

#[derive(Debug)]
pub struct ParseDataModeError {
    value: String,
}

impl fmt::Display for ParseDataModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = &self.value;
        write!(f, "unknown data mode: {value}")
    }
}

impl Error for ParseDataModeError {}

impl FromStr for DataMode {
    type Err = ParseDataModeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "UnstructuredData" => Ok(Self::UnstructuredData),
            "StructuredData" => Ok(Self::StructuredData),
            other => Err(ParseDataModeError {
                value: other.to_string(),
            }),
        }
    }
}
