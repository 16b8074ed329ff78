//! Vector store access layer
//!
//! All access to the remote vector database goes through
//! [`VectorStoreGateway`], which translates search intents into raw provider
//! calls on a [`StoreBackend`] and shapes the provider's objects into
//! [`ResultRecord`] lists.

mod backend;
mod gateway;
mod weaviate;

pub use backend::{LikeFilter, StoreBackend};
pub use gateway::{VectorStoreGateway, DEFAULT_ALPHA, DEFAULT_TOPK, FILTER_NOTICE_MESSAGE};
pub use weaviate::WeaviateBackend;

use thiserror::Error;

/// A stored record's properties, as returned by the external collection.
/// The store is schemaless from this crate's point of view.
pub type ResultRecord = serde_json::Map<String, serde_json::Value>;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Neither the primary nor the fallback host accepted a connection
    #[error("Vector store unavailable: {0}")]
    Unavailable(String),

    /// Network-level failure on an established endpoint
    #[error("Store transport error: {0}")]
    Transport(String),

    /// The store rejected or failed the query
    #[error("Store query failed: {0}")]
    Query(String),

    /// The store answered with an unexpected response shape
    #[error("Unexpected store response: {0}")]
    ResponseFormat(String),
}
