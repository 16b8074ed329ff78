//! Remote embedding endpoint client
//!
//! Converts text into dense vectors by calling a remote `/v1/embeddings`
//! endpoint. No retry logic lives here; retries are a caller-level policy.

mod remote;

pub use remote::{BlockingEmbedder, EmbeddingError, EmbeddingProvider, RemoteEmbedder};
