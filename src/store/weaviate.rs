//! Weaviate-style HTTP backend
//!
//! Talks to the store over its HTTP API: a readiness probe for connection
//! bootstrap, `/v1/schema` for collection listing, and `/v1/graphql` Get
//! queries for every search.

use super::backend::{LikeFilter, StoreBackend};
use super::{ResultRecord, StoreError};
use crate::config::StoreConfig;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const STORE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct WeaviateBackend {
    client: reqwest::Client,
    base_url: String,
}

impl WeaviateBackend {
    /// Connect to the primary host, falling back to the secondary when the
    /// primary does not answer its readiness probe. Both failing is
    /// `StoreError::Unavailable`.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(STORE_TIMEOUT)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let primary = config.primary_url();
        if Self::is_ready(&client, &primary).await {
            tracing::info!(url = %primary, "Connected to vector store");
            return Ok(Self {
                client,
                base_url: primary,
            });
        }

        if let Some(fallback) = config.fallback_url() {
            tracing::warn!(
                primary = %primary,
                fallback = %fallback,
                "Primary store unreachable, trying fallback"
            );
            if Self::is_ready(&client, &fallback).await {
                tracing::info!(url = %fallback, "Connected to vector store via fallback");
                return Ok(Self {
                    client,
                    base_url: fallback,
                });
            }
            return Err(StoreError::Unavailable(format!(
                "neither {} nor {} answered the readiness probe",
                primary, fallback
            )));
        }

        Err(StoreError::Unavailable(format!(
            "{} did not answer the readiness probe and no fallback is configured",
            primary
        )))
    }

    async fn is_ready(client: &reqwest::Client, base_url: &str) -> bool {
        let url = format!("{}/v1/.well-known/ready", base_url);
        match client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn graphql_get(
        &self,
        collection: &str,
        properties: &[String],
        arguments: &str,
    ) -> Result<Vec<ResultRecord>, StoreError> {
        let query = format!(
            "{{ Get {{ {}({}) {{ {} }} }} }}",
            collection,
            arguments,
            properties.join(" ")
        );
        tracing::debug!(%collection, %query, "Dispatching store query");

        let response = self
            .client
            .post(format!("{}/v1/graphql", self.base_url))
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Query(format!(
                "store returned {}: {}",
                status, body
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| StoreError::ResponseFormat(e.to_string()))?;

        extract_get_results(&body, collection)
    }
}

#[async_trait]
impl StoreBackend for WeaviateBackend {
    async fn near_vector(
        &self,
        collection: &str,
        properties: &[String],
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ResultRecord>, StoreError> {
        let arguments = format!(
            "limit: {}, nearVector: {{vector: {}}}",
            limit,
            vector_literal(vector)
        );
        self.graphql_get(collection, properties, &arguments).await
    }

    async fn bm25(
        &self,
        collection: &str,
        properties: &[String],
        query: &str,
        limit: usize,
    ) -> Result<Vec<ResultRecord>, StoreError> {
        let arguments = format!(
            "limit: {}, bm25: {{query: \"{}\"}}",
            limit,
            escape_graphql(query)
        );
        self.graphql_get(collection, properties, &arguments).await
    }

    async fn hybrid(
        &self,
        collection: &str,
        properties: &[String],
        query: &str,
        vector: &[f32],
        alpha: f32,
        limit: usize,
        filter: Option<&LikeFilter>,
    ) -> Result<Vec<ResultRecord>, StoreError> {
        let mut arguments = format!(
            "limit: {}, hybrid: {{query: \"{}\", alpha: {}, vector: {}}}",
            limit,
            escape_graphql(query),
            alpha,
            vector_literal(vector)
        );
        if let Some(filter) = filter {
            arguments.push_str(", ");
            arguments.push_str(&where_like(filter));
        }
        self.graphql_get(collection, properties, &arguments).await
    }

    async fn fetch_objects(
        &self,
        collection: &str,
        properties: &[String],
        limit: usize,
    ) -> Result<Vec<ResultRecord>, StoreError> {
        let arguments = format!("limit: {}", limit);
        self.graphql_get(collection, properties, &arguments).await
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        #[derive(Deserialize)]
        struct Schema {
            #[serde(default)]
            classes: Vec<SchemaClass>,
        }
        #[derive(Deserialize)]
        struct SchemaClass {
            class: String,
        }

        let response = self
            .client
            .get(format!("{}/v1/schema", self.base_url))
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Query(format!(
                "schema listing returned {}: {}",
                status, body
            )));
        }

        let schema: Schema = response
            .json()
            .await
            .map_err(|e| StoreError::ResponseFormat(e.to_string()))?;

        Ok(schema.classes.into_iter().map(|c| c.class).collect())
    }
}

/// Render a vector as a GraphQL list literal
fn vector_literal(vector: &[f32]) -> String {
    let parts: Vec<String> = vector.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

/// Escape a string for embedding inside a GraphQL double-quoted literal
fn escape_graphql(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn where_like(filter: &LikeFilter) -> String {
    format!(
        "where: {{path: [\"{}\"], operator: Like, valueText: \"{}\"}}",
        escape_graphql(&filter.property),
        escape_graphql(&filter.pattern)
    )
}

/// Pull the per-object property maps out of a GraphQL Get response.
///
/// GraphQL-level errors surface as `Query`; a body without the expected
/// `data.Get.<Collection>` path is `ResponseFormat`. A null result set is an
/// empty list, not an error.
fn extract_get_results(
    body: &serde_json::Value,
    collection: &str,
) -> Result<Vec<ResultRecord>, StoreError> {
    if let Some(errors) = body.get("errors").and_then(|e| e.as_array()) {
        if !errors.is_empty() {
            let messages: Vec<String> = errors
                .iter()
                .map(|e| {
                    e.get("message")
                        .and_then(|m| m.as_str())
                        .unwrap_or("unknown error")
                        .to_string()
                })
                .collect();
            return Err(StoreError::Query(messages.join("; ")));
        }
    }

    let results = body
        .get("data")
        .and_then(|d| d.get("Get"))
        .and_then(|g| g.get(collection))
        .ok_or_else(|| {
            StoreError::ResponseFormat(format!("missing data.Get.{} in store response", collection))
        })?;

    match results {
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::Array(objects) => Ok(objects
            .iter()
            .filter_map(|o| o.as_object().cloned())
            .collect()),
        other => Err(StoreError::ResponseFormat(format!(
            "expected an object list, got {}",
            other
        ))),
    }
}
