//! Daemon entry point for the voicerag MCP server.
//!
//! Loads configuration from CLI arguments and the environment, attaches the
//! knowledge tools, and serves the MCP protocol over stdio and/or streamable
//! HTTP.

mod config;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use voicerag_core::credentials::SearchCredential;
use voicerag_mcp::attach_rag_tools;
use voicerag_mcp::server::{McpHttpServerConfig, serve_stdio, serve_streamable_http};
use voicerag_sql::{SqlAgentFactory, SqlPromptTemplate, StructuredQueryBackend};

use crate::config::VoiceragConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = VoiceragConfig::from_args()?;

    let prompt = match &config.sql_prompt_path {
        Some(path) => SqlPromptTemplate::from_file(path)?,
        None => SqlPromptTemplate::default(),
    };

    let structured: Option<Arc<dyn StructuredQueryBackend>> =
        config.structured.clone().map(|settings| {
            Arc::new(SqlAgentFactory::new(settings.sql, settings.chat, prompt))
                as Arc<dyn StructuredQueryBackend>
        });

    let credential = match config.search_api_key.clone() {
        Some(key) => SearchCredential::ApiKey(key),
        None => {
            return Err("AZURE_SEARCH_API_KEY is required; delegated identity \
                 credentials must be supplied programmatically"
                .into());
        }
    };

    let tools = attach_rag_tools(
        &config.search_endpoint,
        &config.search_index,
        credential,
        structured,
        config.data_mode,
    )
    .await?;
    let context = tools.context();

    tracing::info!(
        mode = %config.data_mode,
        index = %config.search_index,
        "voicerag tools attached"
    );

    match (config.mcp_serve, config.enable_stdio) {
        (true, true) => {
            let http_context = context.clone();
            let http_config = McpHttpServerConfig::new(config.mcp_http_addr);
            let http = tokio::spawn(async move {
                serve_streamable_http(http_context, http_config).await
            });
            serve_stdio(context).await?;
            http.abort();
        }
        (true, false) => {
            serve_streamable_http(context, McpHttpServerConfig::new(config.mcp_http_addr))
                .await?;
        }
        (false, true) => {
            serve_stdio(context).await?;
        }
        (false, false) => {
            return Err("nothing to serve: enable --mcp-serve or --stdio".into());
        }
    }

    Ok(())
}
