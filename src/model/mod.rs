//! Core data model for the ingestion pipeline
//!
//! This module defines the value types that flow through a crawl run:
//! items produced by source enumerators, per-item outcomes produced by
//! workers, and the aggregate run summary.

mod metadata;

pub use metadata::{
    file_defaults, merge, FileStat, KeyMatchPolicy, Metadata, MetadataTable, MetadataValue,
};

use serde_json::Value;
use std::path::{Path, PathBuf};

/// Opaque handle to an item's content
///
/// A source connector decides how content is addressed: a local path for
/// filesystem-backed sources, a URL for remote content an external
/// connector has not materialized, or an inline JSON payload for bulk
/// document uploads.
#[derive(Debug, Clone)]
pub enum ContentRef {
    /// Content available as a local file
    Path(PathBuf),

    /// Content addressed by URL (not materialized locally)
    Url(String),

    /// Content carried inline as a JSON document
    Inline(Value),
}

impl ContentRef {
    /// Returns the lowercased, dot-prefixed file extension, if any
    ///
    /// URL refs are stripped of query/fragment before the extension is
    /// derived. Inline documents have no extension.
    pub fn extension(&self) -> Option<String> {
        let raw = match self {
            ContentRef::Path(path) => path.extension()?.to_string_lossy().to_string(),
            ContentRef::Url(url) => {
                let trimmed = url.split(['?', '#']).next().unwrap_or(url);
                Path::new(trimmed)
                    .extension()?
                    .to_string_lossy()
                    .to_string()
            }
            ContentRef::Inline(_) => return None,
        };
        Some(format!(".{}", raw.to_lowercase()))
    }

    /// Returns the local path if the content is materialized on disk
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            ContentRef::Path(path) => Some(path),
            _ => None,
        }
    }

    /// Returns the inline JSON payload, if any
    pub fn as_inline(&self) -> Option<&Value> {
        match self {
            ContentRef::Inline(doc) => Some(doc),
            _ => None,
        }
    }
}

/// One discoverable unit of content produced by a source connector
///
/// Items are immutable once created: the enumerator builds them, the
/// pipeline owns them until a worker consumes them.
#[derive(Debug, Clone)]
pub struct CrawlItem {
    /// Stable identifier for the item within its source
    pub source_id: String,

    /// Human-readable name; also the metadata-table lookup key
    pub display_name: String,

    /// Handle to the item's content
    pub content: ContentRef,

    /// Synthesized default metadata (creation time, size, source tag,
    /// parent path). Lowest merge precedence.
    pub base_metadata: Metadata,

    /// Per-item metadata supplied by the connector at enumeration time
    /// (e.g. a computed download URL). Highest merge precedence.
    pub item_metadata: Metadata,
}

/// Terminal status of one item's processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// The item was indexed
    Success,

    /// The item was rejected before dispatch (e.g. unsupported extension
    /// under an active allow-list). Not an error.
    Skipped { reason: String },

    /// The item failed permanently, after retries were exhausted or
    /// because the failure was not retry-eligible
    Failed { reason: String },
}

/// The per-item result of processing
///
/// Created by a worker after processing; consumed by the orchestrator for
/// aggregation; never mutated after creation.
#[derive(Debug, Clone)]
pub struct IndexOutcome {
    /// Identifier of the processed item (`CrawlItem::source_id`)
    pub item_id: String,

    /// Terminal status
    pub status: OutcomeStatus,

    /// Number of indexing attempts made (0 when the item never reached
    /// an indexing call)
    pub attempts: u32,
}

impl IndexOutcome {
    pub fn success(item_id: impl Into<String>, attempts: u32) -> Self {
        Self {
            item_id: item_id.into(),
            status: OutcomeStatus::Success,
            attempts,
        }
    }

    pub fn skipped(item_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            status: OutcomeStatus::Skipped {
                reason: reason.into(),
            },
            attempts: 0,
        }
    }

    pub fn failed(item_id: impl Into<String>, reason: impl Into<String>, attempts: u32) -> Self {
        Self {
            item_id: item_id.into(),
            status: OutcomeStatus::Failed {
                reason: reason.into(),
            },
            attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Aggregate counters for one crawl run
///
/// Created at run start with zero counters, mutated only by the
/// orchestrator's aggregation point as outcomes arrive, and effectively
/// immutable once the run completes.
#[derive(Debug, Clone, Default)]
pub struct CrawlRunSummary {
    /// Total items that yielded an outcome
    pub processed: u64,

    /// Items indexed successfully
    pub succeeded: u64,

    /// Items that failed permanently
    pub failed: u64,

    /// Items rejected before dispatch
    pub skipped: u64,

    /// Every failed outcome, for diagnostics
    pub failures: Vec<IndexOutcome>,
}

impl CrawlRunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one outcome into the counters
    pub fn record(&mut self, outcome: IndexOutcome) {
        self.processed += 1;
        match &outcome.status {
            OutcomeStatus::Success => self.succeeded += 1,
            OutcomeStatus::Skipped { .. } => self.skipped += 1,
            OutcomeStatus::Failed { .. } => {
                self.failed += 1;
                self.failures.push(outcome);
            }
        }
    }
}
