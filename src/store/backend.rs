//! Raw query surface of the external vector database

use super::{ResultRecord, StoreError};
use async_trait::async_trait;

/// A wildcard match on a single stored property.
///
/// Patterns use `*` glob semantics, not regex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeFilter {
    pub property: String,
    pub pattern: String,
}

impl LikeFilter {
    pub fn new(property: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            pattern: pattern.into(),
        }
    }

    /// Filter on the conventional `file_name` property
    pub fn file_name(pattern: impl Into<String>) -> Self {
        Self::new("file_name", pattern)
    }
}

/// Narrow interface over the provider's query API.
///
/// Implementations perform one network call per method and return the stored
/// properties of each matched object. Ranking, BM25 scoring and hybrid fusion
/// all happen inside the store; nothing here re-ranks.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Nearest neighbors by vector distance
    async fn near_vector(
        &self,
        collection: &str,
        properties: &[String],
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ResultRecord>, StoreError>;

    /// Best keyword (BM25) matches
    async fn bm25(
        &self,
        collection: &str,
        properties: &[String],
        query: &str,
        limit: usize,
    ) -> Result<Vec<ResultRecord>, StoreError>;

    /// Fused keyword + vector ranking weighted by `alpha`
    /// (0 = pure keyword, 1 = pure vector), optionally constrained by a
    /// property filter.
    #[allow(clippy::too_many_arguments)]
    async fn hybrid(
        &self,
        collection: &str,
        properties: &[String],
        query: &str,
        vector: &[f32],
        alpha: f32,
        limit: usize,
        filter: Option<&LikeFilter>,
    ) -> Result<Vec<ResultRecord>, StoreError>;

    /// Unranked object fetch, used for listings
    async fn fetch_objects(
        &self,
        collection: &str,
        properties: &[String],
        limit: usize,
    ) -> Result<Vec<ResultRecord>, StoreError>;

    /// Names of the collections the store currently holds
    async fn list_collections(&self) -> Result<Vec<String>, StoreError>;
}
