//! Search-service protocol and backend interface.
//!
//! The backend trait is the seam between the adapters and the external
//! index; the production implementation lives in [`azure`].

pub mod azure;

use std::{error::Error, fmt};

use async_trait::async_trait;

use crate::types::SearchResultRecord;

pub use azure::AzureSearchClient;

#[derive(Debug)]
pub enum SearchError {
    Network(reqwest::Error),
    Auth(String),
    Api { status: u16, message: String },
    InvalidResponse(String),
    Credential(crate::credentials::CredentialError),
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(err) => write!(f, "search request failed: {err}"),
            Self::Auth(message) => write!(f, "search authentication failed: {message}"),
            Self::Api { status, message } => {
                write!(f, "search service returned status {status}: {message}")
            }
            Self::InvalidResponse(message) => write!(f, "invalid search response: {message}"),
            Self::Credential(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SearchError {}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err)
    }
}

impl From<crate::credentials::CredentialError> for SearchError {
    fn from(err: crate::credentials::CredentialError) -> Self {
        Self::Credential(err)
    }
}

/// Query type understood by the search service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Semantic,
    Full,
}

impl QueryType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Full => "full",
        }
    }
}

/// Vector nearest-neighbor clause attached to a hybrid query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorQuery {
    pub text: String,
    pub k_nearest_neighbors: usize,
    pub fields: String,
}

/// One search request against the external index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub search_text: String,
    pub query_type: QueryType,
    pub top: usize,
    pub select: Vec<String>,
    /// Fields to scope the lexical match to; empty means unscoped.
    pub search_fields: Vec<String>,
    pub vector_queries: Vec<VectorQuery>,
}

/// Results in server-assigned ranking order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResponse {
    pub results: Vec<SearchResultRecord>,
}

/// Backend interface for the external search index.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Issues one search round trip.
    ///
    /// # Errors
    /// Returns `SearchError` if the request fails or the response cannot be
    /// decoded.
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, SearchError>;
}
