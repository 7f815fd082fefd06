use clap::{Parser, builder::BoolishValueParser};
use std::error::Error;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use voicerag_core::types::DataMode;
use voicerag_sql::{ChatSettings, SqlSettings};

const DEFAULT_DATA_MODE: &str = "UnstructuredData";
const DEFAULT_MCP_HTTP_ADDR: &str = "127.0.0.1:4030";

#[derive(Parser, Debug)]
#[command(name = "voiceragd", version, about = "Voicerag MCP daemon.")]
struct CliArgs {
    #[arg(long, env = "AZURE_SEARCH_ENDPOINT")]
    search_endpoint: String,

    #[arg(long, env = "AZURE_SEARCH_INDEX")]
    search_index: String,

    #[arg(long, env = "AZURE_SEARCH_API_KEY")]
    search_api_key: Option<String>,

    #[arg(long, env = "VOICERAG_DATA_MODE", default_value = DEFAULT_DATA_MODE)]
    data_mode: String,

    #[arg(long, env = "AZURE_SQL_SERVER")]
    sql_server: Option<String>,

    #[arg(long, env = "AZURE_SQL_DB")]
    sql_database: Option<String>,

    #[arg(long, env = "AZURE_SQL_USERNAME")]
    sql_username: Option<String>,

    #[arg(long, env = "AZURE_SQL_PWD")]
    sql_password: Option<String>,

    #[arg(long, env = "AZURE_OPENAI_ENDPOINT")]
    openai_endpoint: Option<String>,

    #[arg(long, env = "AZURE_OPENAI_API_KEY")]
    openai_api_key: Option<String>,

    #[arg(long, env = "OPENAI_CHAT_MODEL")]
    chat_model: Option<String>,

    #[arg(long, env = "VOICERAG_SQL_PROMPT_PATH")]
    sql_prompt_path: Option<PathBuf>,

    #[arg(
        long = "stdio",
        env = "VOICERAG_ENABLE_STDIO",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    enable_stdio: bool,

    #[arg(
        long,
        env = "VOICERAG_MCP_SERVE",
        default_value_t = true,
        value_parser = BoolishValueParser::new()
    )]
    mcp_serve: bool,

    #[arg(long, env = "VOICERAG_MCP_HTTP_ADDR", default_value = DEFAULT_MCP_HTTP_ADDR)]
    mcp_http_addr: SocketAddr,
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Debug, Clone)]
pub struct VoiceragConfig {
    pub search_endpoint: String,
    pub search_index: String,
    pub search_api_key: Option<String>,
    pub data_mode: DataMode,
    pub structured: Option<StructuredSettings>,
    pub sql_prompt_path: Option<PathBuf>,
    pub enable_stdio: bool,
    pub mcp_serve: bool,
    pub mcp_http_addr: SocketAddr,
}

/// Settings required to serve structured-data queries.
#[derive(Debug, Clone)]
pub struct StructuredSettings {
    pub sql: SqlSettings,
    pub chat: ChatSettings,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingSetting(&'static str),
    InvalidSetting { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSetting(name) => write!(f, "missing required setting: {name}"),
            Self::InvalidSetting { name, value } => {
                write!(f, "invalid {name} value: {value}")
            }
        }
    }
}

impl Error for ConfigError {}

impl VoiceragConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::try_from(args)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn require(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    non_empty(value).ok_or(ConfigError::MissingSetting(name))
}

impl TryFrom<CliArgs> for VoiceragConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.search_endpoint.trim().is_empty() {
            return Err(ConfigError::MissingSetting("AZURE_SEARCH_ENDPOINT"));
        }
        if args.search_index.trim().is_empty() {
            return Err(ConfigError::MissingSetting("AZURE_SEARCH_INDEX"));
        }

        let data_mode: DataMode =
            args.data_mode
                .parse()
                .map_err(|_| ConfigError::InvalidSetting {
                    name: "VOICERAG_DATA_MODE",
                    value: args.data_mode.clone(),
                })?;

        let sql_server = non_empty(args.sql_server);
        let sql_database = non_empty(args.sql_database);
        let sql_username = non_empty(args.sql_username);
        let sql_password = non_empty(args.sql_password);
        let openai_endpoint = non_empty(args.openai_endpoint);
        let openai_api_key = non_empty(args.openai_api_key);
        let chat_model = non_empty(args.chat_model);

        // Ambient shells often carry a stray AZURE_OPENAI_* variable; only a
        // complete setting group opts in to structured serving outside
        // structured mode.
        let all_structured = sql_server.is_some()
            && sql_database.is_some()
            && sql_username.is_some()
            && sql_password.is_some()
            && openai_endpoint.is_some()
            && openai_api_key.is_some()
            && chat_model.is_some();

        let structured = if data_mode == DataMode::StructuredData || all_structured {
            Some(StructuredSettings {
                sql: SqlSettings {
                    server: require(sql_server, "AZURE_SQL_SERVER")?,
                    database: require(sql_database, "AZURE_SQL_DB")?,
                    username: require(sql_username, "AZURE_SQL_USERNAME")?,
                    password: require(sql_password, "AZURE_SQL_PWD")?,
                },
                chat: ChatSettings {
                    endpoint: require(openai_endpoint, "AZURE_OPENAI_ENDPOINT")?,
                    api_key: require(openai_api_key, "AZURE_OPENAI_API_KEY")?,
                    deployment: require(chat_model, "OPENAI_CHAT_MODEL")?,
                },
            })
        } else {
            None
        };

        Ok(Self {
            search_endpoint: args.search_endpoint,
            search_index: args.search_index,
            search_api_key: non_empty(args.search_api_key),
            data_mode,
            structured,
            sql_prompt_path: args.sql_prompt_path,
            enable_stdio: args.enable_stdio,
            mcp_serve: args.mcp_serve,
            mcp_http_addr: args.mcp_http_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> CliArgs {
        CliArgs {
            search_endpoint: "https://search.example.net".to_string(),
            search_index: "knowledge".to_string(),
            search_api_key: Some("key".to_string()),
            data_mode: DEFAULT_DATA_MODE.to_string(),
            sql_server: None,
            sql_database: None,
            sql_username: None,
            sql_password: None,
            openai_endpoint: None,
            openai_api_key: None,
            chat_model: None,
            sql_prompt_path: None,
            enable_stdio: false,
            mcp_serve: true,
            mcp_http_addr: DEFAULT_MCP_HTTP_ADDR.parse().expect("valid MCP addr"),
        }
    }

    fn structured_args() -> CliArgs {
        let mut args = base_args();
        args.data_mode = "StructuredData".to_string();
        args.sql_server = Some("contoso".to_string());
        args.sql_database = Some("sales".to_string());
        args.sql_username = Some("reader".to_string());
        args.sql_password = Some("secret".to_string());
        args.openai_endpoint = Some("https://example.openai.azure.com".to_string());
        args.openai_api_key = Some("key".to_string());
        args.chat_model = Some("gpt-4o".to_string());
        args
    }

    #[test]
    fn unstructured_mode_needs_no_sql_settings() {
        let config = VoiceragConfig::try_from(base_args()).expect("config should parse");
        assert_eq!(config.data_mode, DataMode::UnstructuredData);
        assert!(config.structured.is_none());
    }

    #[test]
    fn stray_chat_settings_do_not_force_structured_config() {
        let mut args = base_args();
        args.openai_endpoint = Some("https://example.openai.azure.com".to_string());

        let config = VoiceragConfig::try_from(args).expect("config should parse");
        assert_eq!(config.data_mode, DataMode::UnstructuredData);
        assert!(config.structured.is_none());
    }

    #[test]
    fn complete_settings_enable_structured_serving_in_unstructured_mode() {
        let mut args = structured_args();
        args.data_mode = DEFAULT_DATA_MODE.to_string();

        let config = VoiceragConfig::try_from(args).expect("config should parse");
        assert_eq!(config.data_mode, DataMode::UnstructuredData);
        assert!(config.structured.is_some());
    }

    #[test]
    fn structured_mode_requires_every_sql_setting() {
        let mut args = structured_args();
        args.sql_server = None;

        let err = VoiceragConfig::try_from(args).expect_err("config should fail");
        assert!(matches!(err, ConfigError::MissingSetting("AZURE_SQL_SERVER")));
    }

    #[test]
    fn structured_mode_builds_both_settings() {
        let config = VoiceragConfig::try_from(structured_args()).expect("config should parse");
        let structured = config.structured.expect("structured settings should exist");
        assert_eq!(structured.sql.host(), "contoso.database.windows.net");
        assert_eq!(structured.chat.deployment, "gpt-4o");
    }

    #[test]
    fn unknown_data_mode_is_rejected() {
        let mut args = base_args();
        args.data_mode = "GraphData".to_string();

        let err = VoiceragConfig::try_from(args).expect_err("config should fail");
        assert!(matches!(
            err,
            ConfigError::InvalidSetting {
                name: "VOICERAG_DATA_MODE",
                ..
            }
        ));
    }
}
