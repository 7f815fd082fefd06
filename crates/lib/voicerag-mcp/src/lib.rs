//! MCP server implementation for voicerag.
//!
//! This crate wires the retrieval adapters into rmcp tool handlers and
//! exposes the `search` / `report_grounding` tool surface consumed by the
//! conversational middle tier.

mod helpers;
mod tools;
pub mod server;

use std::{error::Error, fmt, sync::Arc};

use rmcp::{
    ErrorData,
    ServerHandler,
    handler::server::tool::ToolRouter,
    tool,
    tool_handler,
    tool_router,
};
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use voicerag_core::credentials::{CredentialError, SearchCredential};
use voicerag_core::grounding::GroundingReporter;
use voicerag_core::knowledge::KnowledgeSearch;
use voicerag_core::search::{AzureSearchClient, SearchBackend, SearchError};
use voicerag_core::types::{DataMode, ToolResult};
use voicerag_sql::agent::AgentError;
use voicerag_sql::StructuredQueryBackend;

const SERVER_INSTRUCTIONS: &str = r"voicerag exposes knowledge-base tools for a realtime conversational agent.

Tools:
1. `search` - search the knowledge base. In unstructured-data mode this runs a
   hybrid semantic query and returns passages; each passage starts with its
   source name in square brackets and ends with a '-----' line. In
   structured-data mode the query is answered from the relational store
   through a SQL-generation agent.
2. `report_grounding` - cite knowledge-base sources used in an answer. Pass
   the source names (square-bracket prefixes) actually used; the matched
   passages are returned for the client to render as citations.
3. `health` returns `ok`.";

#[derive(Debug)]
pub enum DispatchError {
    Search(SearchError),
    Agent(AgentError),
    StructuredUnavailable,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Search(err) => write!(f, "{err}"),
            Self::Agent(err) => write!(f, "{err}"),
            Self::StructuredUnavailable => {
                f.write_str("structured data mode selected but no SQL backend is configured")
            }
        }
    }
}

impl Error for DispatchError {}

impl From<SearchError> for DispatchError {
    fn from(err: SearchError) -> Self {
        Self::Search(err)
    }
}

impl From<AgentError> for DispatchError {
    fn from(err: AgentError) -> Self {
        Self::Agent(err)
    }
}

#[derive(Debug)]
pub enum AttachError {
    Credential(CredentialError),
    Search(SearchError),
}

impl fmt::Display for AttachError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credential(err) => write!(f, "{err}"),
            Self::Search(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AttachError {}

impl From<CredentialError> for AttachError {
    fn from(err: CredentialError) -> Self {
        Self::Credential(err)
    }
}

impl From<SearchError> for AttachError {
    fn from(err: SearchError) -> Self {
        Self::Search(err)
    }
}

/// Adapters and routing configuration shared by the tool handlers.
///
/// The data mode is explicit per-context state, read at every `search`
/// dispatch; there is no process-global flag.
pub struct ToolContext {
    knowledge: KnowledgeSearch,
    grounding: GroundingReporter,
    structured: Option<Arc<dyn StructuredQueryBackend>>,
    mode: DataMode,
}

impl ToolContext {
    #[must_use]
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        structured: Option<Arc<dyn StructuredQueryBackend>>,
        mode: DataMode,
    ) -> Self {
        Self {
            knowledge: KnowledgeSearch::new(backend.clone()),
            grounding: GroundingReporter::new(backend),
            structured,
            mode,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> DataMode {
        self.mode
    }

    /// Routes one `search` invocation to the adapter selected by the mode.
    ///
    /// # Errors
    /// Returns `DispatchError` if the selected adapter fails.
    pub async fn dispatch_search(&self, query: &str) -> Result<ToolResult, DispatchError> {
        tracing::info!(mode = %self.mode, "dispatching search for '{query}'");
        match self.mode {
            DataMode::UnstructuredData => Ok(self.knowledge.search(query).await?),
            DataMode::StructuredData => {
                let backend = self
                    .structured
                    .as_ref()
                    .ok_or(DispatchError::StructuredUnavailable)?;
                let answer = backend.answer(query).await?;
                Ok(ToolResult::to_server(answer))
            }
        }
    }

    /// Resolves cited sources to their original passages.
    ///
    /// # Errors
    /// Returns `DispatchError` if the lookup fails.
    pub async fn dispatch_grounding(
        &self,
        sources: &[String],
    ) -> Result<ToolResult, DispatchError> {
        Ok(self.grounding.report(sources).await?)
    }
}

/// MCP server wrapper around the tool context and routers.
#[derive(Clone)]
pub struct VoiceragTools {
    tool_router: ToolRouter<Self>,
    context: Arc<ToolContext>,
}

impl VoiceragTools {
    /// Creates a new server using a context by value.
    #[must_use]
    pub fn new(context: ToolContext) -> Self {
        Self::with_context(Arc::new(context))
    }

    /// Creates a new server using a shared context handle.
    #[must_use]
    pub fn with_context(context: Arc<ToolContext>) -> Self {
        let tool_router = Self::tool_router_core()
            + Self::tool_router_search()
            + Self::tool_router_grounding();
        Self {
            tool_router,
            context,
        }
    }

    #[must_use]
    pub fn context(&self) -> Arc<ToolContext> {
        self.context.clone()
    }
}

/// Registers the knowledge tools against a search service.
///
/// For delegated-identity credentials, one token is acquired eagerly so the
/// first real request pays no extra latency. The search client built here is
/// long-lived and shared by both adapters.
///
/// # Errors
/// Returns `AttachError` if the warm-up or client construction fails.
pub async fn attach_rag_tools(
    search_endpoint: &str,
    search_index: &str,
    credential: SearchCredential,
    structured: Option<Arc<dyn StructuredQueryBackend>>,
    mode: DataMode,
) -> Result<VoiceragTools, AttachError> {
    credential.warm_up().await?;
    let client = AzureSearchClient::new(search_endpoint, search_index, credential)?;
    let context = ToolContext::new(Arc::new(client), structured, mode);
    Ok(VoiceragTools::new(context))
}

#[tool_router(router = tool_router_core, vis = "pub")]
impl VoiceragTools {
    #[tool(description = "Health check. Returns 'ok'.")]
    async fn health(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::text("ok")]))
    }
}

#[tool_handler]
impl ServerHandler for VoiceragTools {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
