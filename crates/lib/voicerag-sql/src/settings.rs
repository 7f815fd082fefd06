//! Connection settings carried in from the host configuration.
//!
//! Adapters never read the process environment themselves; the daemon maps
//! `AZURE_SQL_*` / `AZURE_OPENAI_*` / `OPENAI_CHAT_MODEL` variables into
//! these structs at startup.

use std::time::Duration;

/// TDS port for the Azure SQL endpoint.
pub const SQL_PORT: u16 = 1433;

/// Connection timeout matching the original ODBC connection string.
pub const SQL_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Relational database connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlSettings {
    /// Logical server name, without the `.database.windows.net` suffix.
    pub server: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl SqlSettings {
    /// Fully qualified host name of the SQL endpoint.
    #[must_use]
    pub fn host(&self) -> String {
        let server = &self.server;
        format!("{server}.database.windows.net")
    }
}

/// Chat-model binding parameters. The deployment name doubles as the model
/// name, per the `OPENAI_CHAT_MODEL` contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSettings {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
}
