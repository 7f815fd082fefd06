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

/// Parameters for citing knowledge-base sources.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ReportGroundingParams {
    /// List of source names from the last statement actually used, do not
    /// include the ones not used to formulate a response
    pub sources: Vec<String>,
}

#[tool_router(router = tool_router_grounding, vis = "pub")]
impl VoiceragTools {
    #[tool(
        description = "Report use of a source from the knowledge base as part of an answer (effectively, cite the source). Sources appear in square brackets before each knowledge base passage. Always use this tool to cite sources when responding with information from the knowledge base."
    )]
    async fn report_grounding(
        &self,
        Parameters(params): Parameters<ReportGroundingParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let result = self
            .context
            .dispatch_grounding(&params.sources)
            .await
            .map_err(helpers::internal_err)?;
        helpers::into_call_result(result)
    }
}
