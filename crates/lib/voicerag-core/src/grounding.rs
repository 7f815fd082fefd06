//! Grounding Reporter.
//!
//! Resolves cited source identifiers back to their original passages so the
//! client can render citations. Identifiers that fail the shape check are
//! dropped silently rather than failing the whole report.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use tracing::info;

use crate::knowledge::select_fields;
use crate::search::{QueryType, SearchBackend, SearchError, SearchRequest};
use crate::types::{SearchResultRecord, ToolResult};

static SOURCE_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_=\-]+$").expect("source id pattern is valid"));

/// Citation records surfaced to the client.
#[derive(Debug, Clone, Serialize)]
pub struct GroundingReport {
    pub sources: Vec<SearchResultRecord>,
}

/// Adapter holding an explicit reference to the shared search backend.
#[derive(Clone)]
pub struct GroundingReporter {
    backend: Arc<dyn SearchBackend>,
}

impl GroundingReporter {
    #[must_use]
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend }
    }

    /// Looks up the cited identifiers and returns the matched passages.
    ///
    /// The lookup is a field-scoped full-text search rather than a filter:
    /// integrated-vectorization indexes leave `chunk_id` searchable with a
    /// keyword tokenizer, not filterable. An empty input still issues the
    /// zero-width search and yields an empty report.
    ///
    /// # Errors
    /// Returns `SearchError` if the backend call fails or the report cannot
    /// be serialized.
    pub async fn report(&self, sources: &[String]) -> Result<ToolResult, SearchError> {
        let valid: Vec<&String> = sources
            .iter()
            .filter(|source| SOURCE_ID_PATTERN.is_match(source))
            .collect();
        let joined = valid
            .iter()
            .map(|source| source.as_str())
            .collect::<Vec<_>>()
            .join(" OR ");
        info!("grounding sources: {joined}");

        let request = SearchRequest {
            search_text: joined,
            query_type: QueryType::Full,
            top: valid.len(),
            select: select_fields(),
            search_fields: vec!["chunk_id".to_string()],
            vector_queries: Vec::new(),
        };

        let response = self.backend.search(request).await?;
        let report = GroundingReport {
            sources: response.results,
        };
        let payload = serde_json::to_value(&report)
            .map_err(|err| SearchError::InvalidResponse(err.to_string()))?;
        Ok(ToolResult::to_client(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::search::SearchResponse;
    use crate::types::{ToolPayload, ToolResultDirection};

    struct RecordingBackend {
        requests: Mutex<Vec<SearchRequest>>,
        response: SearchResponse,
    }

    impl RecordingBackend {
        fn with_results(results: Vec<SearchResultRecord>) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                response: SearchResponse { results },
            })
        }

        fn last_request(&self) -> SearchRequest {
            self.requests
                .lock()
                .expect("request log should be available")
                .last()
                .cloned()
                .expect("a request should have been issued")
        }
    }

    #[async_trait]
    impl SearchBackend for RecordingBackend {
        async fn search(&self, request: SearchRequest) -> Result<SearchResponse, SearchError> {
            self.requests
                .lock()
                .expect("request log should be available")
                .push(request);
            Ok(self.response.clone())
        }
    }

    fn sources(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| (*id).to_string()).collect()
    }

    #[tokio::test]
    async fn unsafe_identifiers_never_reach_the_outbound_query() {
        let backend = RecordingBackend::with_results(Vec::new());
        let reporter = GroundingReporter::new(backend.clone());

        reporter
            .report(&sources(&["abc", "bad id!", "def"]))
            .await
            .expect("report should succeed");

        let request = backend.last_request();
        assert_eq!(request.search_text, "abc OR def");
        assert_eq!(request.top, 2);
        assert_eq!(request.query_type, QueryType::Full);
        assert_eq!(request.search_fields, vec!["chunk_id".to_string()]);
    }

    #[tokio::test]
    async fn empty_input_still_issues_a_zero_width_search() {
        let backend = RecordingBackend::with_results(Vec::new());
        let reporter = GroundingReporter::new(backend.clone());

        let result = reporter.report(&[]).await.expect("report should succeed");

        let request = backend.last_request();
        assert_eq!(request.search_text, "");
        assert_eq!(request.top, 0);

        let ToolPayload::Json(payload) = result.payload else {
            panic!("grounding payload should be structured");
        };
        assert_eq!(payload["sources"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn report_carries_records_in_server_order_to_the_client() {
        let backend = RecordingBackend::with_results(vec![
            SearchResultRecord {
                chunk_id: "b_2".to_string(),
                title: "Second".to_string(),
                chunk: "second passage".to_string(),
            },
            SearchResultRecord {
                chunk_id: "a_1".to_string(),
                title: "First".to_string(),
                chunk: "first passage".to_string(),
            },
        ]);
        let reporter = GroundingReporter::new(backend);

        let result = reporter
            .report(&sources(&["b_2", "a_1"]))
            .await
            .expect("report should succeed");

        assert_eq!(result.direction, ToolResultDirection::ToClient);
        let ToolPayload::Json(payload) = result.payload else {
            panic!("grounding payload should be structured");
        };
        assert_eq!(payload["sources"][0]["chunk_id"], "b_2");
        assert_eq!(payload["sources"][1]["chunk_id"], "a_1");
    }

    #[test]
    fn pattern_accepts_the_identifier_alphabet() {
        for id in ["abc", "A-Z_0", "x=y", "0123"] {
            assert!(SOURCE_ID_PATTERN.is_match(id), "{id} should match");
        }
        for id in ["bad id", "semi;colon", "quote'", "", "päss"] {
            assert!(!SOURCE_ID_PATTERN.is_match(id), "{id} should not match");
        }
    }
}
