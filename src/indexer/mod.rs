//! Indexing collaborator contracts
//!
//! The pipeline consumes the indexing backend through these traits. All
//! calls are synchronous from the pipeline's perspective: they complete
//! with success or failure and never leave work pending. Implementations
//! must be safe to invoke concurrently from multiple workers; that is a
//! documented precondition, not something the pipeline enforces.

mod http;

pub use http::HttpIndexer;

use crate::model::{ContentRef, Metadata};
use crate::IndexError;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Destination service that ingests documents and files for search
///
/// Returns `Ok(true)` on success and `Ok(false)` when the backend reports
/// failure; `Ok(false)` is a permanent per-item failure and is never
/// retried. An `Err` signals a transient network/service problem and is
/// retry-eligible.
#[async_trait]
pub trait Indexer: Send + Sync {
    /// Indexes a structured JSON document
    async fn index_document(&self, document: &Value) -> Result<bool, IndexError>;

    /// Indexes a generic file under its externally visible identifier
    async fn index_file(
        &self,
        path: &Path,
        external_id: &str,
        metadata: &Metadata,
    ) -> Result<bool, IndexError>;

    /// Indexes an audio/video file
    async fn index_media_file(&self, path: &Path, metadata: &Metadata)
        -> Result<bool, IndexError>;
}

/// Naming and description of a tabular item, handed to the parser
#[derive(Debug, Clone)]
pub struct TableMetadata {
    /// Table display name (the item's display name)
    pub name: String,
}

/// Collaborator that loads tabular structure and performs row/table-level
/// indexing, possibly calling back into the [`Indexer`]
#[async_trait]
pub trait TabularParser: Send + Sync {
    async fn parse(
        &self,
        table: &TableMetadata,
        content: &ContentRef,
        metadata: &Metadata,
    ) -> Result<(), IndexError>;
}

/// Default tabular parser that forwards the table file to the indexer's
/// generic file operation
///
/// Used by the CLI when no richer parser is wired in; row-level parsing
/// belongs to external collaborators.
pub struct PassthroughTabularParser {
    indexer: Arc<dyn Indexer>,
}

impl PassthroughTabularParser {
    pub fn new(indexer: Arc<dyn Indexer>) -> Self {
        Self { indexer }
    }
}

#[async_trait]
impl TabularParser for PassthroughTabularParser {
    async fn parse(
        &self,
        table: &TableMetadata,
        content: &ContentRef,
        metadata: &Metadata,
    ) -> Result<(), IndexError> {
        let path = content.as_path().ok_or_else(|| {
            IndexError::Service("tabular content is not materialized locally".to_string())
        })?;
        match self.indexer.index_file(path, &table.name, metadata).await? {
            true => Ok(()),
            false => Err(IndexError::Service(format!(
                "backend rejected table '{}'",
                table.name
            ))),
        }
    }
}
