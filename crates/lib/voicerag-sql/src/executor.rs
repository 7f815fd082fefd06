//! SQL execution against the live database.
//!
//! A fresh TDS connection is opened per query; the agent contract builds its
//! collaborators per invocation and holds nothing across calls.

use std::{error::Error, fmt};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, FromSql, Row};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::compat::TokioAsyncWriteCompatExt;

use crate::settings::{SQL_CONNECT_TIMEOUT, SQL_PORT, SqlSettings};

#[derive(Debug)]
pub enum SqlError {
    Io(std::io::Error),
    Tds(Box<tiberius::error::Error>),
    ConnectTimeout,
}

impl fmt::Display for SqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "database connection failed: {err}"),
            Self::Tds(err) => write!(f, "database query failed: {err}"),
            Self::ConnectTimeout => write!(f, "database connection timed out"),
        }
    }
}

impl Error for SqlError {}

impl From<std::io::Error> for SqlError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<tiberius::error::Error> for SqlError {
    fn from(err: tiberius::error::Error) -> Self {
        Self::Tds(Box::new(err))
    }
}

/// Narrow interface to the relational database.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Executes one SQL statement and renders the result sets as text.
    ///
    /// # Errors
    /// Returns `SqlError` if the connection or the query fails.
    async fn run_query(&self, sql: &str) -> Result<String, SqlError>;
}

/// TDS executor for the Azure SQL endpoint: port 1433, SQL authentication,
/// encryption required, 30s connect timeout.
pub struct TiberiusExecutor {
    settings: SqlSettings,
}

impl TiberiusExecutor {
    #[must_use]
    pub const fn new(settings: SqlSettings) -> Self {
        Self { settings }
    }

    fn config(&self) -> Config {
        let mut config = Config::new();
        config.host(self.settings.host());
        config.port(SQL_PORT);
        config.database(&self.settings.database);
        config.authentication(AuthMethod::sql_server(
            &self.settings.username,
            &self.settings.password,
        ));
        config.encryption(EncryptionLevel::Required);
        config
    }
}

#[async_trait]
impl SqlExecutor for TiberiusExecutor {
    async fn run_query(&self, sql: &str) -> Result<String, SqlError> {
        let config = self.config();
        let tcp = timeout(SQL_CONNECT_TIMEOUT, TcpStream::connect(config.get_addr()))
            .await
            .map_err(|_| SqlError::ConnectTimeout)??;
        tcp.set_nodelay(true)?;

        let mut client = Client::connect(config, tcp.compat_write()).await?;
        let results = client.simple_query(sql).await?.into_results().await?;
        Ok(render_results(&results))
    }
}

/// Renders result sets as header + tab-separated rows, one blank line
/// between sets. The agent feeds this back to the model as an observation.
fn render_results(results: &[Vec<Row>]) -> String {
    let mut rendered = String::new();
    for (index, rows) in results.iter().enumerate() {
        if index > 0 {
            rendered.push('\n');
        }
        let Some(first) = rows.first() else {
            rendered.push_str("(no rows)\n");
            continue;
        };
        let header: Vec<&str> = first.columns().iter().map(tiberius::Column::name).collect();
        rendered.push_str(&header.join("\t"));
        rendered.push('\n');
        for row in rows {
            let cells: Vec<String> = row.cells().map(|(_, data)| render_cell(data)).collect();
            rendered.push_str(&cells.join("\t"));
            rendered.push('\n');
        }
    }
    rendered
}

fn render_cell(data: &ColumnData<'static>) -> String {
    match data {
        ColumnData::U8(value) => render_value(value.as_ref()),
        ColumnData::I16(value) => render_value(value.as_ref()),
        ColumnData::I32(value) => render_value(value.as_ref()),
        ColumnData::I64(value) => render_value(value.as_ref()),
        ColumnData::F32(value) => render_value(value.as_ref()),
        ColumnData::F64(value) => render_value(value.as_ref()),
        ColumnData::Bit(value) => render_value(value.as_ref()),
        ColumnData::String(value) => render_value(value.as_ref()),
        ColumnData::Guid(value) => render_value(value.as_ref()),
        ColumnData::Numeric(value) => render_value(value.as_ref()),
        ColumnData::Date(_) => render_temporal::<NaiveDate>(data),
        ColumnData::Time(_) => render_temporal::<NaiveTime>(data),
        ColumnData::SmallDateTime(_) | ColumnData::DateTime(_) | ColumnData::DateTime2(_) => {
            render_temporal::<NaiveDateTime>(data)
        }
        ColumnData::DateTimeOffset(_) => render_temporal::<DateTime<Utc>>(data),
        _ => "<unprintable>".to_string(),
    }
}

/// Decodes a temporal cell through the driver's chrono conversion and
/// renders it in ISO calendar form.
fn render_temporal<'a, T>(data: &'a ColumnData<'static>) -> String
where
    T: FromSql<'a> + fmt::Display,
{
    match T::from_sql(data) {
        Ok(Some(value)) => value.to_string(),
        Ok(None) => "NULL".to_string(),
        Err(_) => "<unprintable>".to_string(),
    }
}

fn render_value<T: fmt::Display>(value: Option<&T>) -> String {
    value.map_or_else(|| "NULL".to_string(), ToString::to_string)
}
