//! Credential handling for the search service.
//!
//! Credential acquisition itself is an external collaborator; this module
//! only defines the narrow interface the search client consumes and the
//! one-time warm-up performed at attach time.

use std::{error::Error, fmt, sync::Arc};

use async_trait::async_trait;

/// Token scope for the Azure AI Search resource.
pub const SEARCH_TOKEN_SCOPE: &str = "https://search.azure.com/.default";

#[derive(Debug)]
pub enum CredentialError {
    Acquisition(String),
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acquisition(message) => write!(f, "token acquisition failed: {message}"),
        }
    }
}

impl Error for CredentialError {}

/// Source of bearer tokens for delegated-identity auth.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a bearer token valid for the given resource scope.
    ///
    /// # Errors
    /// Returns `CredentialError` if the token cannot be acquired.
    async fn token(&self, scope: &str) -> Result<String, CredentialError>;
}

/// Credential used to authenticate against the search service.
#[derive(Clone)]
pub enum SearchCredential {
    /// Static admin/query key sent as the `api-key` header.
    ApiKey(String),
    /// Delegated identity resolved to bearer tokens per request.
    Token(Arc<dyn TokenProvider>),
}

impl SearchCredential {
    /// Eagerly acquires a token so the first real request pays no extra
    /// latency. A no-op for static keys.
    ///
    /// # Errors
    /// Returns `CredentialError` if the warm-up acquisition fails.
    pub async fn warm_up(&self) -> Result<(), CredentialError> {
        match self {
            Self::ApiKey(_) => Ok(()),
            Self::Token(provider) => {
                provider.token(SEARCH_TOKEN_SCOPE).await?;
                Ok(())
            }
        }
    }
}

impl fmt::Debug for SearchCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("SearchCredential::ApiKey(..)"),
            Self::Token(_) => f.write_str("SearchCredential::Token(..)"),
        }
    }
}
