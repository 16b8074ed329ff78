//! Configuration management for ragserve
//!
//! All connection parameters (primary and fallback) are resolved here, before
//! any connection is attempted, so no call site re-derives its own defaults.

use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    pub embedding: EmbeddingConfig,
}

/// Vector store connection configuration.
///
/// The store is reached over HTTP; the gRPC ports are recognized for parity
/// with native store clients but are not dialed by this transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub host: String,
    pub http_port: u16,
    pub grpc_port: u16,

    /// Secondary host tried when the primary is unreachable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_http_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_grpc_port: Option<u16>,

    /// Collection to bind searches to; unset leaves the gateway degraded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    /// Properties requested from the store for every search result
    #[serde(default = "default_return_properties")]
    pub return_properties: Vec<String>,
}

impl StoreConfig {
    /// Base URL of the primary HTTP endpoint
    pub fn primary_url(&self) -> String {
        format!("http://{}:{}", self.host, self.http_port)
    }

    /// Base URL of the fallback HTTP endpoint, when one is configured.
    /// A fallback host without an explicit port reuses the primary port.
    pub fn fallback_url(&self) -> Option<String> {
        self.fallback_host.as_ref().map(|host| {
            let port = self.fallback_http_port.unwrap_or(self.http_port);
            format!("http://{}:{}", host, port)
        })
    }
}

fn default_return_properties() -> Vec<String> {
    vec![
        "text".to_string(),
        "file_name".to_string(),
        "i_page".to_string(),
        "file_path".to_string(),
    ]
}

/// Remote embedding endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL of the embedding gateway
    pub base_url: String,

    /// Serving id appended to the base URL as `/serving/{id}` when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_id: Option<u32>,

    /// Bearer token. Required; there is deliberately no default.
    #[serde(default)]
    pub token: String,
}

impl EmbeddingConfig {
    /// Effective endpoint base the client posts `/v1/embeddings` under
    pub fn endpoint_base(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        match self.endpoint_id {
            Some(id) => format!("{}/serving/{}", base, id),
            None => base.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RagError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| RagError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        // Validate configuration
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Load from the default path if the file exists, otherwise start from
    /// defaults with env overrides applied
    pub fn load_or_default(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(p) => p,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load(&path)
        } else {
            let mut config = Config::default();
            config.apply_env_overrides();
            ConfigValidator::validate(&config)?;
            Ok(config)
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| RagError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: RAGSERVE_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("RAGSERVE_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        let parse_port = |value: &str| -> Result<u16> {
            value.parse().map_err(|_| RagError::InvalidConfigValue {
                path: path.to_string(),
                message: format!("Cannot parse '{}' as port number", value),
            })
        };

        match path {
            "STORE__HOST" => {
                self.store.host = value.to_string();
            }
            "STORE__HTTP_PORT" => {
                self.store.http_port = parse_port(value)?;
            }
            "STORE__GRPC_PORT" => {
                self.store.grpc_port = parse_port(value)?;
            }
            "STORE__FALLBACK_HOST" => {
                self.store.fallback_host = Some(value.to_string());
            }
            "STORE__FALLBACK_HTTP_PORT" => {
                self.store.fallback_http_port = Some(parse_port(value)?);
            }
            "STORE__FALLBACK_GRPC_PORT" => {
                self.store.fallback_grpc_port = Some(parse_port(value)?);
            }
            "STORE__COLLECTION" => {
                self.store.collection = Some(value.to_string());
            }
            "EMBEDDING__BASE_URL" => {
                self.embedding.base_url = value.to_string();
            }
            "EMBEDDING__ENDPOINT_ID" => {
                self.embedding.endpoint_id =
                    Some(value.parse().map_err(|_| RagError::InvalidConfigValue {
                        path: path.to_string(),
                        message: format!("Cannot parse '{}' as endpoint id", value),
                    })?);
            }
            "EMBEDDING__TOKEN" => {
                self.embedding.token = value.to_string();
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| RagError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("ragserve").join("config.toml"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig {
                host: "localhost".to_string(),
                http_port: 8080,
                grpc_port: 50051,
                fallback_host: None,
                fallback_http_port: None,
                fallback_grpc_port: None,
                collection: None,
                return_properties: default_return_properties(),
            },
            embedding: EmbeddingConfig {
                base_url: "http://localhost:8000".to_string(),
                endpoint_id: None,
                token: String::new(),
            },
        }
    }
}
