//! Natural-language-to-SQL agent for voicerag.
//!
//! Translates free-text questions into SQL against a fixed two-table schema
//! and returns the agent's final natural-language answer. The chat model and
//! the database are external collaborators behind the [`chat::ChatModel`]
//! and [`executor::SqlExecutor`] traits.

pub mod agent;
pub mod chat;
pub mod executor;
pub mod prompt;
pub mod settings;

pub use agent::{AgentError, SqlAgent, SqlAgentFactory, StructuredQueryBackend};
pub use prompt::SqlPromptTemplate;
pub use settings::{ChatSettings, SqlSettings};
