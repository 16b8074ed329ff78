//! Query dispatch and document reassembly
//!
//! Turns a [`QuerySpec`] into the right gateway search and reassembles
//! multi-page documents from filtered search results.

mod assembly;

pub use assembly::{DocumentAssembler, PageRecord, PAGE_FETCH_LIMIT};

use crate::error::Result;
use crate::store::{LikeFilter, ResultRecord, StoreBackend, VectorStoreGateway};
use crate::store::{DEFAULT_ALPHA, DEFAULT_TOPK};

/// How a query should be matched against the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Vector distance on the embedded query
    Dense,
    /// Keyword (BM25) scoring, no embedding call
    Bm25,
    /// Fused keyword + vector ranking
    Hybrid,
    /// Hybrid, constrained to file names matching a pattern
    HybridFiltered,
}

/// One search request: query text, mode and ranking parameters.
///
/// `alpha` only matters for the hybrid modes (0 = pure keyword, 1 = pure
/// vector); `file_pattern` only for [`SearchMode::HybridFiltered`].
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub query: String,
    pub mode: SearchMode,
    pub topk: usize,
    pub alpha: f32,
    pub file_pattern: Option<String>,
}

impl QuerySpec {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            mode: SearchMode::Hybrid,
            topk: DEFAULT_TOPK,
            alpha: DEFAULT_ALPHA,
            file_pattern: None,
        }
    }

    /// Run this query through the gateway.
    ///
    /// A filtered mode without a pattern downgrades to plain hybrid search
    /// with a warning rather than failing the request.
    pub async fn execute<S: StoreBackend>(
        &self,
        gateway: &VectorStoreGateway<S>,
    ) -> Result<Vec<ResultRecord>> {
        match self.mode {
            SearchMode::Dense => gateway.dense_search(&self.query, self.topk).await,
            SearchMode::Bm25 => gateway.bm25_search(&self.query, self.topk).await,
            SearchMode::Hybrid => {
                gateway
                    .hybrid_search(&self.query, self.topk, self.alpha)
                    .await
            }
            SearchMode::HybridFiltered => match &self.file_pattern {
                Some(pattern) => {
                    let filter = LikeFilter::file_name(pattern.clone());
                    gateway
                        .hybrid_search_with_filter(&self.query, &filter, self.topk, self.alpha)
                        .await
                }
                None => {
                    tracing::warn!("Filtered search requested without a pattern; running unfiltered");
                    gateway
                        .hybrid_search(&self.query, self.topk, self.alpha)
                        .await
                }
            },
        }
    }
}
