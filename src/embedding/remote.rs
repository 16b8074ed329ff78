//! HTTP client for the remote embedding endpoint

use crate::config::EmbeddingConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Embedding endpoints can be slow; give them a generous window.
const EMBED_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Network-level failure reaching the endpoint (timeout, refused, DNS)
    #[error("Embedding transport error: {0}")]
    Transport(String),

    /// The endpoint answered, but not with the expected response shape
    #[error("Unexpected embedding response: {0}")]
    ResponseFormat(String),
}

/// Trait for embedding providers
///
/// Allows abstraction over embedding backends and keeps search code
/// testable without a live endpoint.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate one vector per input text, order-preserving.
    /// `texts` must be non-empty; individual strings may be empty.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Convenience single-text form: first element of the batch result
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let input = [text.to_string()];
        let vectors = self.embed(&input).await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::ResponseFormat("empty embedding batch".to_string()))
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
}

/// Non-blocking embedding client for the remote serving endpoint.
///
/// Posts `{"input": [..]}` to `{base}/v1/embeddings` with bearer auth and
/// expects `{"data": [{"embedding": [..]}, ..]}` in input order.
pub struct RemoteEmbedder {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl RemoteEmbedder {
    pub fn new(endpoint_base: &str, token: &str) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(EMBED_TIMEOUT)
            .build()
            .map_err(|e| EmbeddingError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: embeddings_url(endpoint_base),
            token: token.to_string(),
        })
    }

    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        Self::new(&config.endpoint_base(), &config.token)
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        validate_input(texts)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&EmbeddingRequest { input: texts })
            .send()
            .await
            .map_err(|e| EmbeddingError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ResponseFormat(format!(
                "embedding endpoint returned {}: {}",
                status, body
            )));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EmbeddingError::ResponseFormat(e.to_string()))?;

        extract_vectors(value, texts.len())
    }
}

/// Blocking embedding client.
///
/// Same wire contract as [`RemoteEmbedder`]. Must not be called from inside
/// an async runtime; use the non-blocking client there.
pub struct BlockingEmbedder {
    client: reqwest::blocking::Client,
    endpoint: String,
    token: String,
}

impl BlockingEmbedder {
    pub fn new(endpoint_base: &str, token: &str) -> Result<Self, EmbeddingError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(EMBED_TIMEOUT)
            .build()
            .map_err(|e| EmbeddingError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: embeddings_url(endpoint_base),
            token: token.to_string(),
        })
    }

    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        Self::new(&config.endpoint_base(), &config.token)
    }

    pub fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        validate_input(texts)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&EmbeddingRequest { input: texts })
            .send()
            .map_err(|e| EmbeddingError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EmbeddingError::ResponseFormat(format!(
                "embedding endpoint returned {}: {}",
                status, body
            )));
        }

        let value: serde_json::Value = response
            .json()
            .map_err(|e| EmbeddingError::ResponseFormat(e.to_string()))?;

        extract_vectors(value, texts.len())
    }

    pub fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let input = [text.to_string()];
        let vectors = self.embed(&input)?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::ResponseFormat("empty embedding batch".to_string()))
    }
}

fn embeddings_url(endpoint_base: &str) -> String {
    format!("{}/v1/embeddings", endpoint_base.trim_end_matches('/'))
}

fn validate_input(texts: &[String]) -> Result<(), EmbeddingError> {
    if texts.is_empty() {
        return Err(EmbeddingError::InvalidInput(
            "at least one input text is required".to_string(),
        ));
    }
    Ok(())
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

/// Pull vectors out of the endpoint's response body.
///
/// Any missing `data`/`embedding` field surfaces as `ResponseFormat`, never
/// a raw deserialization panic.
fn extract_vectors(
    value: serde_json::Value,
    expected: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let data = value
        .get("data")
        .ok_or_else(|| EmbeddingError::ResponseFormat("missing 'data' field".to_string()))?;

    let items: Vec<EmbeddingItem> = serde_json::from_value(data.clone())
        .map_err(|e| EmbeddingError::ResponseFormat(format!("bad 'data' entries: {}", e)))?;

    if items.len() != expected {
        return Err(EmbeddingError::ResponseFormat(format!(
            "expected {} embeddings, got {}",
            expected,
            items.len()
        )));
    }

    Ok(items.into_iter().map(|item| item.embedding).collect())
}
