use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};

use crate::{VoiceragTools, helpers};

/// Parameters for searching the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchParams {
    /// Search query
    pub query: String,
}

#[tool_router(router = tool_router_search, vis = "pub")]
impl VoiceragTools {
    #[tool(
        description = "Search the knowledge base. The knowledge base is in English, translate to and from English if needed. Results are formatted as a source name first in square brackets, followed by the text content, and a line with '-----' at the end of each result."
    )]
    async fn search(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let result = self
            .context
            .dispatch_search(&params.query)
            .await
            .map_err(helpers::internal_err)?;
        helpers::into_call_result(result)
    }
}
