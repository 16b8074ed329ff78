//! Gateway over a named collection in the external vector database
//!
//! Holds the degradation and fallback policy: a gateway whose store is
//! unreachable or whose collection is unknown returns empty results instead
//! of failing the read path.

use super::backend::{LikeFilter, StoreBackend};
use super::weaviate::WeaviateBackend;
use super::ResultRecord;
use crate::config::Config;
use crate::embedding::{EmbeddingProvider, RemoteEmbedder};
use crate::error::Result;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Default number of results per search
pub const DEFAULT_TOPK: usize = 4;

/// Default keyword/vector fusion weight for hybrid search
pub const DEFAULT_ALPHA: f32 = 0.5;

/// Message carried by the synthetic record prepended when a filtered search
/// falls back to an unfiltered one
pub const FILTER_NOTICE_MESSAGE: &str = "filter was not applied";

/// Upper bound on records scanned for the distinct file listing.
/// A known scalability ceiling, kept as-is.
const LISTING_LIMIT: usize = 10_000;

/// Mediates all access to one collection of the external vector database.
///
/// When construction could not reach the store or bind the collection, the
/// gateway is degraded: every search returns an empty list after logging a
/// warning, preserving availability of the read path over failing hard.
pub struct VectorStoreGateway<S: StoreBackend> {
    backend: Option<S>,
    collection: Option<String>,
    properties: Vec<String>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl<S: StoreBackend> VectorStoreGateway<S> {
    /// Bind a backend to a collection, verifying the collection exists.
    ///
    /// Never fails: an unset or unknown collection leaves the gateway
    /// degraded, with a diagnostic listing the collections that do exist.
    pub async fn bind(
        backend: S,
        collection: Option<&str>,
        properties: Vec<String>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let collection = match collection {
            Some(name) => name,
            None => {
                tracing::warn!("No collection configured; gateway is degraded");
                return Self::degraded_with_backend(backend, properties, embedder);
            }
        };

        match backend.list_collections().await {
            Ok(available) if available.iter().any(|c| c == collection) => Self {
                backend: Some(backend),
                collection: Some(collection.to_string()),
                properties,
                embedder,
            },
            Ok(available) => {
                tracing::warn!(
                    requested = %collection,
                    available = ?available,
                    "Collection not found in store; gateway is degraded"
                );
                Self::degraded_with_backend(backend, properties, embedder)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not list collections; gateway is degraded");
                Self::degraded_with_backend(backend, properties, embedder)
            }
        }
    }

    /// Gateway with no store connection at all
    pub fn degraded(properties: Vec<String>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            backend: None,
            collection: None,
            properties,
            embedder,
        }
    }

    fn degraded_with_backend(
        backend: S,
        properties: Vec<String>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            backend: Some(backend),
            collection: None,
            properties,
            embedder,
        }
    }

    /// True when searches will actually reach the store
    pub fn is_bound(&self) -> bool {
        self.backend.is_some() && self.collection.is_some()
    }

    #[cfg(test)]
    pub(crate) fn backend_for_tests(&self) -> &S {
        self.backend.as_ref().expect("gateway has no backend")
    }

    fn bound(&self) -> Option<(&S, &str)> {
        match (&self.backend, &self.collection) {
            (Some(backend), Some(collection)) => Some((backend, collection.as_str())),
            _ => {
                tracing::warn!("Search on degraded gateway; returning empty results");
                None
            }
        }
    }

    /// Nearest neighbors of the embedded query by vector distance
    pub async fn dense_search(&self, query: &str, topk: usize) -> Result<Vec<ResultRecord>> {
        let Some((backend, collection)) = self.bound() else {
            return Ok(Vec::new());
        };
        let vector = self.embedder.embed_one(query).await?;
        let records = backend
            .near_vector(collection, &self.properties, &vector, topk)
            .await?;
        Ok(records)
    }

    /// Best keyword matches; no embedding call
    pub async fn bm25_search(&self, query: &str, topk: usize) -> Result<Vec<ResultRecord>> {
        let Some((backend, collection)) = self.bound() else {
            return Ok(Vec::new());
        };
        let records = backend
            .bm25(collection, &self.properties, query, topk)
            .await?;
        Ok(records)
    }

    /// Fused keyword + vector ranking weighted by `alpha`
    pub async fn hybrid_search(
        &self,
        query: &str,
        topk: usize,
        alpha: f32,
    ) -> Result<Vec<ResultRecord>> {
        let Some((backend, collection)) = self.bound() else {
            return Ok(Vec::new());
        };
        let vector = self.embedder.embed_one(query).await?;
        let records = backend
            .hybrid(collection, &self.properties, query, &vector, alpha, topk, None)
            .await?;
        Ok(records)
    }

    /// Hybrid search constrained to records matching `filter`.
    ///
    /// If the filtered call fails for any reason, falls back to an
    /// unfiltered hybrid search with the same arguments and prepends a
    /// synthetic record whose `message` property says the filter was not
    /// applied. The underlying error is logged, not propagated.
    pub async fn hybrid_search_with_filter(
        &self,
        query: &str,
        filter: &LikeFilter,
        topk: usize,
        alpha: f32,
    ) -> Result<Vec<ResultRecord>> {
        let Some((backend, collection)) = self.bound() else {
            return Ok(Vec::new());
        };
        let vector = self.embedder.embed_one(query).await?;

        match backend
            .hybrid(
                collection,
                &self.properties,
                query,
                &vector,
                alpha,
                topk,
                Some(filter),
            )
            .await
        {
            Ok(records) => Ok(records),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    property = %filter.property,
                    pattern = %filter.pattern,
                    "Filter could not be applied; falling back to unfiltered hybrid search"
                );
                let unfiltered = backend
                    .hybrid(collection, &self.properties, query, &vector, alpha, topk, None)
                    .await?;
                let mut records = Vec::with_capacity(unfiltered.len() + 1);
                records.push(filter_notice());
                records.extend(unfiltered);
                Ok(records)
            }
        }
    }

    /// Hybrid search restricted to file names matching `pattern`
    /// (wildcard `*` glob semantics). Always embeds, even an empty query.
    pub async fn search_from_file_name(
        &self,
        query: &str,
        file_name_pattern: &str,
        topk: usize,
    ) -> Result<Vec<ResultRecord>> {
        let Some((backend, collection)) = self.bound() else {
            return Ok(Vec::new());
        };
        let vector = self.embedder.embed_one(query).await?;
        let filter = LikeFilter::file_name(file_name_pattern);
        let records = backend
            .hybrid(
                collection,
                &self.properties,
                query,
                &vector,
                DEFAULT_ALPHA,
                topk,
                Some(&filter),
            )
            .await?;
        Ok(records)
    }

    /// Deduplicated file names across the collection, in sorted order
    pub async fn list_distinct_file_names(&self) -> Result<Vec<String>> {
        let Some((backend, collection)) = self.bound() else {
            return Ok(Vec::new());
        };
        let properties = vec!["file_name".to_string()];
        let records = backend
            .fetch_objects(collection, &properties, LISTING_LIMIT)
            .await?;

        let names: BTreeSet<String> = records
            .iter()
            .filter_map(|r| r.get("file_name"))
            .filter_map(|v| v.as_str())
            .map(|s| s.to_string())
            .collect();
        Ok(names.into_iter().collect())
    }
}

impl VectorStoreGateway<WeaviateBackend> {
    /// Resolve all connection parameters from `config`, then connect with
    /// fallback and bind the configured collection. Connection failure
    /// yields a degraded gateway, not an error.
    pub async fn connect(config: &Config) -> Result<Self> {
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(RemoteEmbedder::from_config(&config.embedding)?);
        let properties = config.store.return_properties.clone();

        match WeaviateBackend::connect(&config.store).await {
            Ok(backend) => Ok(Self::bind(
                backend,
                config.store.collection.as_deref(),
                properties,
                embedder,
            )
            .await),
            Err(e) => {
                tracing::warn!(error = %e, "Store connection failed; gateway is degraded");
                Ok(Self::degraded(properties, embedder))
            }
        }
    }
}

/// Synthetic record signalling that a filter was dropped
fn filter_notice() -> ResultRecord {
    let mut record = ResultRecord::new();
    record.insert(
        "message".to_string(),
        serde_json::Value::String(FILTER_NOTICE_MESSAGE.to_string()),
    );
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingError;
    use crate::store::StoreError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::result::Result;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn props() -> Vec<String> {
        vec![
            "text".to_string(),
            "file_name".to_string(),
            "i_page".to_string(),
            "file_path".to_string(),
        ]
    }

    fn record(text: &str) -> ResultRecord {
        match json!({"text": text, "file_name": "doc.pdf", "i_page": 0}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    struct MockEmbedder {
        calls: AtomicUsize,
    }

    impl MockEmbedder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EmbeddingProvider for MockEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            if texts.is_empty() {
                return Err(EmbeddingError::InvalidInput("empty batch".to_string()));
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| vec![t.len() as f32 / 100.0, 0.5])
                .collect())
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct HybridCall {
        query: String,
        alpha: f32,
        limit: usize,
        filter: Option<LikeFilter>,
    }

    struct MockBackend {
        records: Vec<ResultRecord>,
        fail_filtered: bool,
        hybrid_calls: Mutex<Vec<HybridCall>>,
    }

    impl MockBackend {
        fn new(records: Vec<ResultRecord>) -> Self {
            Self {
                records,
                fail_filtered: false,
                hybrid_calls: Mutex::new(Vec::new()),
            }
        }

        fn failing_on_filter(records: Vec<ResultRecord>) -> Self {
            Self {
                fail_filtered: true,
                ..Self::new(records)
            }
        }

        fn truncated(&self, limit: usize) -> Vec<ResultRecord> {
            self.records.iter().take(limit).cloned().collect()
        }
    }

    #[async_trait]
    impl StoreBackend for MockBackend {
        async fn near_vector(
            &self,
            _collection: &str,
            _properties: &[String],
            _vector: &[f32],
            limit: usize,
        ) -> Result<Vec<ResultRecord>, StoreError> {
            Ok(self.truncated(limit))
        }

        async fn bm25(
            &self,
            _collection: &str,
            _properties: &[String],
            _query: &str,
            limit: usize,
        ) -> Result<Vec<ResultRecord>, StoreError> {
            Ok(self.truncated(limit))
        }

        async fn hybrid(
            &self,
            _collection: &str,
            _properties: &[String],
            query: &str,
            _vector: &[f32],
            alpha: f32,
            limit: usize,
            filter: Option<&LikeFilter>,
        ) -> Result<Vec<ResultRecord>, StoreError> {
            self.hybrid_calls.lock().unwrap().push(HybridCall {
                query: query.to_string(),
                alpha,
                limit,
                filter: filter.cloned(),
            });
            if self.fail_filtered && filter.is_some() {
                return Err(StoreError::Query("filter rejected".to_string()));
            }
            Ok(self.truncated(limit))
        }

        async fn fetch_objects(
            &self,
            _collection: &str,
            _properties: &[String],
            limit: usize,
        ) -> Result<Vec<ResultRecord>, StoreError> {
            Ok(self.truncated(limit))
        }

        async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
            Ok(vec!["Documents".to_string()])
        }
    }

    async fn bound_gateway(backend: MockBackend) -> VectorStoreGateway<MockBackend> {
        VectorStoreGateway::bind(backend, Some("Documents"), props(), MockEmbedder::new()).await
    }

    #[tokio::test]
    async fn test_dense_search_respects_topk() {
        let records = (0..10).map(|i| record(&format!("chunk {}", i))).collect();
        let gateway = bound_gateway(MockBackend::new(records)).await;

        let results = gateway.dense_search("query", 4).await.unwrap();
        assert_eq!(results.len(), 4);
    }

    #[tokio::test]
    async fn test_bm25_does_not_embed() {
        let embedder = MockEmbedder::new();
        let gateway = VectorStoreGateway::bind(
            MockBackend::new(vec![record("a")]),
            Some("Documents"),
            props(),
            embedder.clone(),
        )
        .await;

        gateway.bm25_search("query", 4).await.unwrap();
        assert_eq!(embedder.call_count(), 0);

        gateway.dense_search("query", 4).await.unwrap();
        assert_eq!(embedder.call_count(), 1);
    }

    #[tokio::test]
    async fn test_hybrid_forwards_alpha_and_limit() {
        let gateway = bound_gateway(MockBackend::new(vec![record("a")])).await;
        gateway.hybrid_search("query", 7, 0.25).await.unwrap();

        let calls = gateway.backend.as_ref().unwrap().hybrid_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].alpha, 0.25);
        assert_eq!(calls[0].limit, 7);
        assert!(calls[0].filter.is_none());
    }

    #[tokio::test]
    async fn test_filter_failure_falls_back_with_notice() {
        let records: Vec<ResultRecord> = (0..3).map(|i| record(&format!("chunk {}", i))).collect();
        let gateway = bound_gateway(MockBackend::failing_on_filter(records.clone())).await;

        let filter = LikeFilter::file_name("*report*");
        let results = gateway
            .hybrid_search_with_filter("query", &filter, 3, 0.5)
            .await
            .unwrap();

        assert_eq!(results[0]["message"], FILTER_NOTICE_MESSAGE);
        assert_eq!(&results[1..], &records[..]);

        // filtered attempt first, then the unfiltered fallback
        let calls = gateway.backend.as_ref().unwrap().hybrid_calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].filter.is_some());
        assert!(calls[1].filter.is_none());
    }

    #[tokio::test]
    async fn test_filtered_search_success_has_no_notice() {
        let gateway = bound_gateway(MockBackend::new(vec![record("a")])).await;
        let filter = LikeFilter::file_name("*report*");
        let results = gateway
            .hybrid_search_with_filter("query", &filter, 4, 0.5)
            .await
            .unwrap();
        assert!(results.iter().all(|r| !r.contains_key("message")));
    }

    #[tokio::test]
    async fn test_search_from_file_name_always_filters_and_embeds() {
        let embedder = MockEmbedder::new();
        let gateway = VectorStoreGateway::bind(
            MockBackend::new(vec![record("a")]),
            Some("Documents"),
            props(),
            embedder.clone(),
        )
        .await;

        gateway
            .search_from_file_name("", "*report1*", 30)
            .await
            .unwrap();

        // empty query still embeds
        assert_eq!(embedder.call_count(), 1);

        let calls = gateway.backend.as_ref().unwrap().hybrid_calls.lock().unwrap();
        assert_eq!(
            calls[0].filter,
            Some(LikeFilter::file_name("*report1*"))
        );
        assert_eq!(calls[0].limit, 30);
    }

    #[tokio::test]
    async fn test_degraded_gateway_returns_empty_everywhere() {
        let gateway: VectorStoreGateway<MockBackend> =
            VectorStoreGateway::degraded(props(), MockEmbedder::new());

        assert!(gateway.dense_search("q", 4).await.unwrap().is_empty());
        assert!(gateway.bm25_search("q", 4).await.unwrap().is_empty());
        assert!(gateway.hybrid_search("q", 4, 0.5).await.unwrap().is_empty());
        let filter = LikeFilter::file_name("*x*");
        assert!(gateway
            .hybrid_search_with_filter("q", &filter, 4, 0.5)
            .await
            .unwrap()
            .is_empty());
        assert!(gateway
            .search_from_file_name("q", "*x*", 4)
            .await
            .unwrap()
            .is_empty());
        assert!(gateway.list_distinct_file_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_collection_degrades() {
        let gateway = VectorStoreGateway::bind(
            MockBackend::new(vec![record("a")]),
            Some("DoesNotExist"),
            props(),
            MockEmbedder::new(),
        )
        .await;

        assert!(!gateway.is_bound());
        assert!(gateway.dense_search("q", 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_distinct_file_names_dedupes() {
        let records = vec![
            record_with_name("a.pdf"),
            record_with_name("b.pdf"),
            record_with_name("a.pdf"),
        ];
        let gateway = bound_gateway(MockBackend::new(records)).await;

        let names = gateway.list_distinct_file_names().await.unwrap();
        assert_eq!(names, vec!["a.pdf".to_string(), "b.pdf".to_string()]);
    }

    fn record_with_name(name: &str) -> ResultRecord {
        match json!({"file_name": name}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }
}
