use crate::config::types::{Config, IndexerConfig, PipelineConfig, SourceConfig};
use crate::source::SourceMode;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_pipeline_config(&config.pipeline)?;
    validate_indexer_config(&config.indexer)?;
    Ok(())
}

/// Validates source configuration
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    match config.mode {
        SourceMode::Folder | SourceMode::BulkJson => {
            let path = config.path.as_deref().unwrap_or("");
            if path.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "source mode '{}' requires a non-empty path",
                    config.mode
                )));
            }
        }
        // Connector-backed modes carry their own settings; path is optional.
        SourceMode::SharepointFolder | SourceMode::SharepointList | SourceMode::Catalog => {}
    }

    if config.extensions.is_empty() {
        return Err(ConfigError::Validation(
            "extensions must not be empty; use [\"*\"] to allow everything".to_string(),
        ));
    }

    if config.source_tag.trim().is_empty() {
        return Err(ConfigError::Validation(
            "source-tag must not be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates pipeline configuration
fn validate_pipeline_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    if config.concurrency > 256 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be <= 256, got {}",
            config.concurrency
        )));
    }

    if !(config.rate_limit_per_second.is_finite() && config.rate_limit_per_second > 0.0) {
        return Err(ConfigError::Validation(format!(
            "rate-limit-per-second must be a positive number, got {}",
            config.rate_limit_per_second
        )));
    }

    if config.retry_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "retry-attempts must be >= 1, got {}",
            config.retry_attempts
        )));
    }

    if !(config.retry_delay_seconds.is_finite() && config.retry_delay_seconds >= 0.0) {
        return Err(ConfigError::Validation(format!(
            "retry-delay-seconds must be >= 0, got {}",
            config.retry_delay_seconds
        )));
    }

    if config.progress_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "progress-interval must be >= 1, got {}",
            config.progress_interval
        )));
    }

    Ok(())
}

/// Validates indexer configuration
fn validate_indexer_config(config: &IndexerConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.endpoint)
        .map_err(|_| ConfigError::InvalidUrl(config.endpoint.clone()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "endpoint must be http(s), got scheme '{}'",
            url.scheme()
        )));
    }

    if config.request_timeout_seconds < 1 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-seconds must be >= 1, got {}",
            config.request_timeout_seconds
        )));
    }

    Ok(())
}
