//! Reasoning/action loop driving SQL generation.

use std::{error::Error, fmt};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::chat::{ChatError, ChatMessage, ChatModel, OpenAiChatClient};
use crate::executor::{SqlError, SqlExecutor, TiberiusExecutor};
use crate::prompt::SqlPromptTemplate;
use crate::settings::{ChatSettings, SqlSettings};

const DEFAULT_MAX_STEPS: usize = 15;

#[derive(Debug)]
pub enum AgentError {
    Chat(ChatError),
    Sql(SqlError),
    StepLimit(usize),
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chat(err) => write!(f, "{err}"),
            Self::Sql(err) => write!(f, "{err}"),
            Self::StepLimit(steps) => {
                write!(f, "agent gave no final answer within {steps} steps")
            }
        }
    }
}

impl Error for AgentError {}

impl From<ChatError> for AgentError {
    fn from(err: ChatError) -> Self {
        Self::Chat(err)
    }
}

impl From<SqlError> for AgentError {
    fn from(err: SqlError) -> Self {
        Self::Sql(err)
    }
}

enum AgentTurn {
    Query(String),
    Answer(String),
}

/// Splits a model reply into an action (`SQL:`) or a final answer.
///
/// Replies carrying neither marker are treated as the final answer; models
/// occasionally answer directly without the protocol prefix.
fn parse_turn(reply: &str) -> AgentTurn {
    for (index, line) in reply.lines().enumerate() {
        let trimmed = line.trim();
        if let Some(sql) = trimmed.strip_prefix("SQL:") {
            let mut statement = sql.trim().to_string();
            for continuation in reply.lines().skip(index + 1) {
                let continuation = continuation.trim();
                if continuation.is_empty() || continuation.starts_with("ANSWER:") {
                    break;
                }
                statement.push(' ');
                statement.push_str(continuation);
            }
            return AgentTurn::Query(statement);
        }
        if let Some(answer) = trimmed.strip_prefix("ANSWER:") {
            return AgentTurn::Answer(answer.trim().to_string());
        }
    }
    AgentTurn::Answer(reply.trim().to_string())
}

/// One ephemeral NL-to-SQL agent bound to a chat model and an executor.
pub struct SqlAgent {
    chat: Box<dyn ChatModel>,
    executor: Box<dyn SqlExecutor>,
    prompt: SqlPromptTemplate,
    max_steps: usize,
}

impl SqlAgent {
    #[must_use]
    pub fn new(
        chat: Box<dyn ChatModel>,
        executor: Box<dyn SqlExecutor>,
        prompt: SqlPromptTemplate,
    ) -> Self {
        Self {
            chat,
            executor,
            prompt,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    #[must_use]
    pub const fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Runs the reasoning/action loop and returns the final answer text.
    ///
    /// # Errors
    /// Returns `AgentError` if the model or the database fails, or if the
    /// step budget runs out without a final answer.
    pub async fn run(&self, question: &str) -> Result<String, AgentError> {
        let mut messages = vec![
            ChatMessage::system(self.prompt.system_prompt()),
            ChatMessage::user(question),
        ];

        for _ in 0..self.max_steps {
            let reply = self.chat.complete(&messages).await?;
            match parse_turn(&reply) {
                AgentTurn::Answer(answer) => {
                    info!("sql agent answered: {answer}");
                    return Ok(answer);
                }
                AgentTurn::Query(sql) => {
                    debug!("sql agent executing: {sql}");
                    let observation = self.executor.run_query(&sql).await?;
                    messages.push(ChatMessage::assistant(reply));
                    messages.push(ChatMessage::user(format!("Result:\n{observation}")));
                }
            }
        }

        Err(AgentError::StepLimit(self.max_steps))
    }
}

/// Backend serving `search` invocations in structured-data mode.
#[async_trait]
pub trait StructuredQueryBackend: Send + Sync {
    /// Answers one natural-language question over the relational data.
    ///
    /// # Errors
    /// Returns `AgentError` if the agent run fails.
    async fn answer(&self, question: &str) -> Result<String, AgentError>;
}

/// Builds a fresh chat binding, executor, and agent per invocation.
/// No connection pooling; each question opens and drops its own session.
pub struct SqlAgentFactory {
    sql: SqlSettings,
    chat: ChatSettings,
    prompt: SqlPromptTemplate,
}

impl SqlAgentFactory {
    #[must_use]
    pub const fn new(sql: SqlSettings, chat: ChatSettings, prompt: SqlPromptTemplate) -> Self {
        Self { sql, chat, prompt }
    }
}

#[async_trait]
impl StructuredQueryBackend for SqlAgentFactory {
    async fn answer(&self, question: &str) -> Result<String, AgentError> {
        let chat = OpenAiChatClient::new(self.chat.clone())?;
        let executor = TiberiusExecutor::new(self.sql.clone());
        let agent = SqlAgent::new(
            Box::new(chat),
            Box::new(executor),
            self.prompt.clone(),
        );
        agent.run(question).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedModel {
        replies: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(replies: &[&str]) -> Self {
            let mut replies: Vec<String> =
                replies.iter().map(|reply| (*reply).to_string()).collect();
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, ChatError> {
            self.replies
                .lock()
                .expect("script should be available")
                .pop()
                .ok_or_else(|| ChatError::InvalidResponse("script exhausted".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingExecutor {
        queries: Mutex<Vec<String>>,
    }

    impl RecordingExecutor {
        fn queries(&self) -> Vec<String> {
            self.queries
                .lock()
                .expect("query log should be available")
                .clone()
        }
    }

    #[async_trait]
    impl SqlExecutor for RecordingExecutor {
        async fn run_query(&self, sql: &str) -> Result<String, SqlError> {
            self.queries
                .lock()
                .expect("query log should be available")
                .push(sql.to_string());
            Ok("CustomerName\nAlice\n".to_string())
        }
    }

    fn agent_with(replies: &[&str]) -> (SqlAgent, std::sync::Arc<RecordingExecutor>) {
        let executor = std::sync::Arc::new(RecordingExecutor::default());

        struct SharedExecutor(std::sync::Arc<RecordingExecutor>);

        #[async_trait]
        impl SqlExecutor for SharedExecutor {
            async fn run_query(&self, sql: &str) -> Result<String, SqlError> {
                self.0.run_query(sql).await
            }
        }

        let agent = SqlAgent::new(
            Box::new(ScriptedModel::new(replies)),
            Box::new(SharedExecutor(executor.clone())),
            SqlPromptTemplate::default(),
        );
        (agent, executor)
    }

    #[tokio::test]
    async fn runs_query_then_returns_final_answer() {
        let (agent, executor) = agent_with(&[
            "SQL: SELECT TOP 10 CustomerName FROM dbo.Customers WHERE CustomerID IN (SELECT DISTINCT CustomerID FROM dbo.Orders) ORDER BY CustomerID;",
            "ANSWER: Alice has ordered at least once.",
        ]);

        let answer = agent
            .run("Give the list of customers who ordered at least once.")
            .await
            .expect("agent should answer");

        assert_eq!(answer, "Alice has ordered at least once.");
        assert_eq!(executor.queries().len(), 1);
    }

    #[tokio::test]
    async fn unmarked_reply_counts_as_the_final_answer() {
        let (agent, executor) = agent_with(&["Nobody has ordered twice."]);

        let answer = agent.run("Who ordered twice?").await.expect("agent should answer");

        assert_eq!(answer, "Nobody has ordered twice.");
        assert!(executor.queries().is_empty());
    }

    #[tokio::test]
    async fn step_budget_exhaustion_is_an_error() {
        let (agent, _executor) = agent_with(&[
            "SQL: SELECT TOP 1 CustomerName FROM dbo.Customers;",
            "SQL: SELECT TOP 1 Email FROM dbo.Customers;",
        ]);
        let agent = agent.with_max_steps(2);

        let err = agent.run("loop forever").await.expect_err("agent should give up");
        assert!(matches!(err, AgentError::StepLimit(2)));
    }

    #[tokio::test]
    async fn database_faults_propagate_unchanged() {
        struct FailingExecutor;

        #[async_trait]
        impl SqlExecutor for FailingExecutor {
            async fn run_query(&self, _sql: &str) -> Result<String, SqlError> {
                Err(SqlError::ConnectTimeout)
            }
        }

        let agent = SqlAgent::new(
            Box::new(ScriptedModel::new(&["SQL: SELECT 1;"])),
            Box::new(FailingExecutor),
            SqlPromptTemplate::default(),
        );

        let err = agent.run("anything").await.expect_err("fault should propagate");
        assert!(matches!(err, AgentError::Sql(SqlError::ConnectTimeout)));
    }

    #[tokio::test]
    async fn documented_example_queries_respect_the_row_cap() {
        let examples = [
            (
                "Give the list of customers who ordered at least once.",
                "SQL: SELECT TOP 10 CustomerName FROM dbo.Customers WHERE CustomerID IN (SELECT DISTINCT CustomerID FROM dbo.Orders) ORDER BY CustomerID;",
            ),
            (
                "Give me the list of customers who ordered twice.",
                "SQL: SELECT TOP 100 C.CustomerID, C.CustomerName, C.Email FROM dbo.Customers C JOIN dbo.Orders O ON C.CustomerID = O.CustomerID GROUP BY C.CustomerID, C.CustomerName, C.Email HAVING COUNT(O.OrderID) = 2;",
            ),
            (
                "How can I retrieve the names and emails of all customers who have placed an order?",
                "SQL: SELECT DISTINCT c.CustomerName, c.Email FROM Customers c JOIN Orders o ON c.CustomerID = o.CustomerID OFFSET 0 ROWS FETCH NEXT 100 ROWS ONLY;",
            ),
        ];

        for (question, scripted_sql) in examples {
            let (agent, executor) = agent_with(&[scripted_sql, "ANSWER: done"]);
            agent.run(question).await.expect("agent should answer");

            for sql in executor.queries() {
                let upper = sql.to_uppercase();
                assert!(!upper.contains("LIMIT"), "query must not use LIMIT: {sql}");
                for cap in extract_row_counts(&upper) {
                    assert!(cap <= 100, "row count {cap} exceeds cap: {sql}");
                }
            }
        }
    }

    /// Pulls the numbers following TOP and FETCH NEXT clauses.
    fn extract_row_counts(upper_sql: &str) -> Vec<usize> {
        let mut counts = Vec::new();
        let tokens: Vec<&str> = upper_sql.split_whitespace().collect();
        for window in tokens.windows(2) {
            if window[0] == "TOP" {
                if let Ok(count) = window[1].trim_matches(|c: char| !c.is_ascii_digit()).parse() {
                    counts.push(count);
                }
            }
        }
        for window in tokens.windows(3) {
            if window[0] == "NEXT" && window[2].starts_with("ROW") {
                if let Ok(count) = window[1].parse() {
                    counts.push(count);
                }
            }
        }
        counts
    }
}
