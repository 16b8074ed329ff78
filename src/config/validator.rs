use crate::config::Config;
use crate::error::{RagError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_store(config, &mut errors);
        Self::validate_embedding(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(RagError::ConfigValidation { errors })
        }
    }

    fn validate_store(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.store.host.is_empty() {
            errors.push(ValidationError::new(
                "store.host",
                "Store host cannot be empty",
            ));
        }

        if config.store.http_port == 0 {
            errors.push(ValidationError::new(
                "store.http_port",
                "HTTP port must be greater than 0",
            ));
        }

        if config.store.grpc_port == 0 {
            errors.push(ValidationError::new(
                "store.grpc_port",
                "gRPC port must be greater than 0",
            ));
        }

        // A fallback port without a fallback host is unusable
        if config.store.fallback_host.is_none()
            && (config.store.fallback_http_port.is_some()
                || config.store.fallback_grpc_port.is_some())
        {
            errors.push(ValidationError::new(
                "store.fallback_host",
                "Fallback ports are set but fallback_host is missing",
            ));
        }

        if let Some(collection) = &config.store.collection {
            if collection.is_empty() {
                errors.push(ValidationError::new(
                    "store.collection",
                    "Collection name cannot be empty when set",
                ));
            }
        }

        if config.store.return_properties.is_empty() {
            errors.push(ValidationError::new(
                "store.return_properties",
                "At least one return property is required",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        let base_url = &config.embedding.base_url;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            errors.push(ValidationError::new(
                "embedding.base_url",
                format!("Base URL must start with http:// or https://, got '{}'", base_url),
            ));
        }

        // Credentials are required external input; there is no default token
        if config.embedding.token.is_empty() {
            errors.push(ValidationError::new(
                "embedding.token",
                "Bearer token is required (set embedding.token or RAGSERVE_EMBEDDING__TOKEN)",
            ));
        }
    }
}
