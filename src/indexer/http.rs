//! Reference indexer that posts documents and files over HTTP
//!
//! Maps the `Indexer` contract onto a simple indexing-service API:
//! documents go to `/documents` as JSON, file and media payloads go to
//! `/files` and `/media` as raw bytes with the external identifier and
//! serialized metadata carried as query parameters. Network errors are
//! transient (`Err`); a non-2xx response is a backend-reported failure
//! (`Ok(false)`).

use crate::config::IndexerConfig;
use crate::indexer::Indexer;
use crate::model::Metadata;
use crate::{ConfigError, IndexError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub struct HttpIndexer {
    client: Client,
    documents_url: Url,
    files_url: Url,
    media_url: Url,
    api_key: String,
}

impl HttpIndexer {
    /// Builds an indexer from the `[indexer]` config section
    pub fn new(config: &IndexerConfig) -> Result<Self, ConfigError> {
        // Normalize to a single trailing slash so joining never doubles a
        // separator, host-only endpoints included.
        let normalized = format!("{}/", config.endpoint.trim_end_matches('/'));
        let base = Url::parse(&normalized)
            .map_err(|_| ConfigError::InvalidUrl(config.endpoint.clone()))?;
        let join = |segment: &str| -> Result<Url, ConfigError> {
            base.join(segment)
                .map_err(|_| ConfigError::InvalidUrl(config.endpoint.clone()))
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|error| ConfigError::Validation(format!("HTTP client: {}", error)))?;

        Ok(Self {
            client,
            documents_url: join("documents")?,
            files_url: join("files")?,
            media_url: join("media")?,
            api_key: config.api_key.clone(),
        })
    }

    async fn post_bytes(
        &self,
        url: &Url,
        path: &Path,
        external_id: &str,
        metadata: &Metadata,
    ) -> Result<bool, IndexError> {
        let bytes = tokio::fs::read(path).await?;
        let metadata_json = serde_json::to_string(metadata)
            .map_err(|error| IndexError::Service(format!("metadata serialization: {}", error)))?;

        let response = self
            .client
            .post(url.clone())
            .header("x-api-key", &self.api_key)
            .query(&[("external-id", external_id), ("metadata", &metadata_json)])
            .body(bytes)
            .send()
            .await?;

        Ok(response.status().is_success())
    }
}

#[async_trait]
impl Indexer for HttpIndexer {
    async fn index_document(&self, document: &Value) -> Result<bool, IndexError> {
        let response = self
            .client
            .post(self.documents_url.clone())
            .header("x-api-key", &self.api_key)
            .json(document)
            .send()
            .await?;

        Ok(response.status().is_success())
    }

    async fn index_file(
        &self,
        path: &Path,
        external_id: &str,
        metadata: &Metadata,
    ) -> Result<bool, IndexError> {
        self.post_bytes(&self.files_url, path, external_id, metadata)
            .await
    }

    async fn index_media_file(
        &self,
        path: &Path,
        metadata: &Metadata,
    ) -> Result<bool, IndexError> {
        let external_id = path.to_string_lossy();
        self.post_bytes(&self.media_url, path, &external_id, metadata)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: &str) -> IndexerConfig {
        IndexerConfig {
            endpoint: endpoint.to_string(),
            api_key: "secret".to_string(),
            request_timeout_seconds: 5,
        }
    }

    #[test]
    fn test_new_builds_operation_urls() {
        let indexer = HttpIndexer::new(&config("https://indexer.example.com/v1")).unwrap();
        assert_eq!(
            indexer.documents_url.as_str(),
            "https://indexer.example.com/v1/documents"
        );
        assert_eq!(
            indexer.files_url.as_str(),
            "https://indexer.example.com/v1/files"
        );
        assert_eq!(
            indexer.media_url.as_str(),
            "https://indexer.example.com/v1/media"
        );
    }

    #[test]
    fn test_new_handles_host_only_endpoint() {
        let indexer = HttpIndexer::new(&config("http://127.0.0.1:8080")).unwrap();
        assert_eq!(
            indexer.documents_url.as_str(),
            "http://127.0.0.1:8080/documents"
        );
        assert_eq!(indexer.files_url.as_str(), "http://127.0.0.1:8080/files");

        let trailing = HttpIndexer::new(&config("http://127.0.0.1:8080/")).unwrap();
        assert_eq!(
            trailing.documents_url.as_str(),
            "http://127.0.0.1:8080/documents"
        );
    }

    #[test]
    fn test_new_rejects_invalid_endpoint() {
        let result = HttpIndexer::new(&config("not a url"));
        assert!(matches!(result, Err(ConfigError::InvalidUrl(_))));
    }
}
