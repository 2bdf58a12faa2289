//! Granary: a document ingestion pipeline
//!
//! This crate turns a stream of discoverable items produced by a source
//! connector into indexed documents, under bounded concurrency, a shared
//! rate limit, per-item failure isolation, bounded retry, and layered
//! metadata enrichment.

pub mod config;
pub mod indexer;
pub mod model;
pub mod pipeline;
pub mod source;

use thiserror::Error;

/// Main error type for Granary operations
///
/// Every variant here is fatal for the run: it is surfaced to the caller
/// and no run summary is produced. Per-item failures are never represented
/// as errors; they are folded into the run summary as outcomes.
#[derive(Debug, Error)]
pub enum GranaryError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Run failed during {phase}: {source}")]
    Run {
        phase: pipeline::RunPhase,
        #[source]
        source: SourceError,
    },

    #[error("Failed to load metadata table from {path}: {message}")]
    MetadataTable { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised by source connectors
///
/// Setup and enumeration errors are fatal: a run that cannot authenticate
/// or list its items aborts before any item-level processing starts.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Source setup failed: {0}")]
    Setup(String),

    #[error("Enumeration failed: {0}")]
    Enumeration(String),

    #[error("Malformed source input: {0}")]
    Malformed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by indexing collaborators
///
/// These are the transient, retry-eligible failures of the pipeline: a
/// network or service call that may succeed on a later attempt. A backend
/// that *reports* failure (returns `Ok(false)`) is a permanent per-item
/// failure and is never retried.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Indexing service error: {0}")]
    Service(String),
}

/// Result type alias for Granary operations
pub type Result<T> = std::result::Result<T, GranaryError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{CrawlItem, CrawlRunSummary, ContentRef, IndexOutcome, OutcomeStatus};
pub use pipeline::{CancelSignal, CrawlOrchestrator, RateLimiter, RetryExecutor, WorkerPool};
pub use source::{SourceEnumerator, SourceMode};
