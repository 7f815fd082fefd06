//! Azure AI Search REST client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::credentials::{SEARCH_TOKEN_SCOPE, SearchCredential};
use crate::search::{SearchBackend, SearchError, SearchRequest, SearchResponse};
use crate::types::SearchResultRecord;

const API_VERSION: &str = "2024-07-01";
const USER_AGENT: &str = "voicerag";

/// Long-lived client bound to one endpoint, index, and credential.
#[derive(Clone)]
pub struct AzureSearchClient {
    http: Client,
    endpoint: String,
    index: String,
    credential: SearchCredential,
}

impl AzureSearchClient {
    /// Creates a client for the given endpoint and index.
    ///
    /// # Errors
    /// Returns `SearchError` if the underlying HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        index: impl Into<String>,
        credential: SearchCredential,
    ) -> Result<Self, SearchError> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            index: index.into(),
            credential,
        })
    }

    fn search_url(&self) -> String {
        let endpoint = self.endpoint.trim_end_matches('/');
        let index = &self.index;
        format!("{endpoint}/indexes/{index}/docs/search?api-version={API_VERSION}")
    }
}

pub(crate) fn build_request_body(request: &SearchRequest) -> Value {
    let mut body = serde_json::json!({
        "search": request.search_text,
        "queryType": request.query_type.as_str(),
        "top": request.top,
        "select": request.select.join(","),
    });

    if !request.search_fields.is_empty() {
        body["searchFields"] = Value::String(request.search_fields.join(","));
    }

    if !request.vector_queries.is_empty() {
        let clauses: Vec<Value> = request
            .vector_queries
            .iter()
            .map(|vector| {
                serde_json::json!({
                    "kind": "text",
                    "text": vector.text,
                    "k": vector.k_nearest_neighbors,
                    "fields": vector.fields,
                })
            })
            .collect();
        body["vectorQueries"] = Value::Array(clauses);
    }

    body
}

#[derive(Debug, Deserialize)]
struct SearchDocuments {
    #[serde(default)]
    value: Vec<SearchResultRecord>,
}

#[async_trait]
impl SearchBackend for AzureSearchClient {
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, SearchError> {
        let body = build_request_body(&request);
        let mut builder = self.http.post(self.search_url()).json(&body);

        builder = match &self.credential {
            SearchCredential::ApiKey(key) => builder.header("api-key", key),
            SearchCredential::Token(provider) => {
                let token = provider.token(SEARCH_TOKEN_SCOPE).await?;
                builder.bearer_auth(token)
            }
        };

        let response = builder.send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SearchError::Auth(format!(
                "search service rejected credentials (status {status})"
            )));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let documents: SearchDocuments = response
            .json()
            .await
            .map_err(|err| SearchError::InvalidResponse(err.to_string()))?;
        Ok(SearchResponse {
            results: documents.value,
        })
    }
}
