//! Knowledge Search Adapter.
//!
//! Issues one hybrid (lexical + vector) query against the external index and
//! concatenates the returned passages into a delimited text block for the
//! model's reasoning context.

use std::sync::Arc;

use tracing::info;

use crate::search::{QueryType, SearchBackend, SearchError, SearchRequest, VectorQuery};
use crate::types::{SearchResultRecord, ToolResult};

const RESULT_TOP: usize = 5;
const VECTOR_NEIGHBORS: usize = 50;
const VECTOR_FIELD: &str = "text_vector";

/// Adapter holding an explicit reference to the shared search backend.
#[derive(Clone)]
pub struct KnowledgeSearch {
    backend: Arc<dyn SearchBackend>,
}

impl KnowledgeSearch {
    #[must_use]
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend }
    }

    /// Runs one hybrid, semantically reranked query and formats the results.
    ///
    /// No results is not an error; the payload is then an empty string.
    ///
    /// # Errors
    /// Returns `SearchError` if the backend call fails.
    pub async fn search(&self, query: &str) -> Result<ToolResult, SearchError> {
        info!("searching for '{query}' in the knowledge base");

        let request = SearchRequest {
            search_text: query.to_string(),
            query_type: QueryType::Semantic,
            top: RESULT_TOP,
            select: select_fields(),
            search_fields: Vec::new(),
            vector_queries: vec![VectorQuery {
                text: query.to_string(),
                k_nearest_neighbors: VECTOR_NEIGHBORS,
                fields: VECTOR_FIELD.to_string(),
            }],
        };

        let response = self.backend.search(request).await?;
        Ok(ToolResult::to_server(format_passages(&response.results)))
    }
}

pub(crate) fn select_fields() -> Vec<String> {
    vec![
        "chunk_id".to_string(),
        "title".to_string(),
        "chunk".to_string(),
    ]
}

/// Emits `[<chunk_id>]: <chunk>` blocks terminated by `-----`, in server
/// result order.
fn format_passages(results: &[SearchResultRecord]) -> String {
    let mut formatted = String::new();
    for record in results {
        let chunk_id = &record.chunk_id;
        let chunk = &record.chunk;
        formatted.push_str(&format!("[{chunk_id}]: {chunk}\n-----\n"));
    }
    formatted
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

    fn record(id: &str, chunk: &str) -> SearchResultRecord {
        SearchResultRecord {
            chunk_id: id.to_string(),
            title: String::new(),
            chunk: chunk.to_string(),
        }
    }

    #[tokio::test]
    async fn issues_one_hybrid_semantic_query() {
        let backend = RecordingBackend::with_results(Vec::new());
        let adapter = KnowledgeSearch::new(backend.clone());

        adapter.search("return policy").await.expect("search should succeed");

        let request = backend.last_request();
        assert_eq!(request.query_type, QueryType::Semantic);
        assert_eq!(request.top, 5);
        assert_eq!(request.select, select_fields());
        assert!(request.search_fields.is_empty());
        assert_eq!(request.vector_queries.len(), 1);
        assert_eq!(request.vector_queries[0].k_nearest_neighbors, 50);
        assert_eq!(request.vector_queries[0].fields, "text_vector");
        assert_eq!(request.vector_queries[0].text, "return policy");
    }

    #[tokio::test]
    async fn formats_one_block_per_result_in_server_order() {
        let backend = RecordingBackend::with_results(vec![
            record("doc_3", "third passage"),
            record("doc_1", "first passage"),
        ]);
        let adapter = KnowledgeSearch::new(backend);

        let result = adapter.search("anything").await.expect("search should succeed");

        assert_eq!(result.direction, ToolResultDirection::ToServer);
        let ToolPayload::Text(text) = result.payload else {
            panic!("knowledge payload should be text");
        };
        assert_eq!(
            text,
            "[doc_3]: third passage\n-----\n[doc_1]: first passage\n-----\n"
        );
        assert_eq!(text.matches("-----").count(), 2);
    }

    #[tokio::test]
    async fn zero_results_yield_empty_payload() {
        let backend = RecordingBackend::with_results(Vec::new());
        let adapter = KnowledgeSearch::new(backend);

        let result = adapter.search("nothing").await.expect("search should succeed");

        assert_eq!(result.payload, ToolPayload::Text(String::new()));
    }
}
