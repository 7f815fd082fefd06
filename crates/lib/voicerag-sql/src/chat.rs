//! Chat-model binding for SQL generation.

use std::{error::Error, fmt, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::settings::ChatSettings;

const CHAT_API_VERSION: &str = "2024-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub enum ChatError {
    Network(reqwest::Error),
    Auth(String),
    RateLimited,
    Api { status: u16, message: String },
    InvalidResponse(String),
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(err) => write!(f, "chat request failed: {err}"),
            Self::Auth(message) => write!(f, "chat authentication failed: {message}"),
            Self::RateLimited => write!(f, "chat model rate limited"),
            Self::Api { status, message } => {
                write!(f, "chat model returned status {status}: {message}")
            }
            Self::InvalidResponse(message) => write!(f, "invalid chat response: {message}"),
        }
    }
}

impl Error for ChatError {}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Narrow interface to the language model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Requests one completion for the given conversation.
    ///
    /// # Errors
    /// Returns `ChatError` if the request fails or the response is empty.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError>;
}

/// Azure OpenAI chat-completions client. Deterministic (temperature 0), one
/// deployment, no streaming.
pub struct OpenAiChatClient {
    http: Client,
    settings: ChatSettings,
}

impl OpenAiChatClient {
    /// Creates a client for the configured deployment.
    ///
    /// # Errors
    /// Returns `ChatError` if the underlying HTTP client cannot be built.
    pub fn new(settings: ChatSettings) -> Result<Self, ChatError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, settings })
    }

    fn completions_url(&self) -> String {
        let endpoint = self.settings.endpoint.trim_end_matches('/');
        let deployment = &self.settings.deployment;
        format!(
            "{endpoint}/openai/deployments/{deployment}/chat/completions?api-version={CHAT_API_VERSION}"
        )
    }
}

#[derive(Debug, Deserialize)]
struct Completion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ChatModel for OpenAiChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        let body = serde_json::json!({
            "messages": messages,
            "temperature": 0.0,
        });

        let response = self
            .http
            .post(self.completions_url())
            .header("api-key", &self.settings.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ChatError::Auth("invalid API key".to_string()));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ChatError::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ChatError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: Completion = response
            .json()
            .await
            .map_err(|err| ChatError::InvalidResponse(err.to_string()))?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ChatError::InvalidResponse("completion had no choices".to_string()))
    }
}
