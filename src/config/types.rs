use crate::model::KeyMatchPolicy;
use crate::source::SourceMode;
use serde::Deserialize;

/// Main configuration structure for Granary
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub pipeline: PipelineConfig,
    pub indexer: IndexerConfig,
}

/// Source connector configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Which kind of source to ingest from
    pub mode: SourceMode,

    /// Root path (folder mode) or input file (bulk-json mode)
    #[serde(default)]
    pub path: Option<String>,

    /// Source tag stamped into every item's default metadata
    #[serde(rename = "source-tag", default = "default_source_tag")]
    pub source_tag: String,

    /// Allowed file extensions, or "*" for everything
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Optional external metadata table (JSON object keyed by relative
    /// display name)
    #[serde(rename = "metadata-table-path", default)]
    pub metadata_table_path: Option<String>,

    /// How metadata-table keys match display names
    #[serde(rename = "key-match-policy", default)]
    pub key_match_policy: KeyMatchPolicy,
}

/// Pipeline behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Number of parallel workers (0 or 1 = sequential)
    #[serde(default)]
    pub concurrency: u32,

    /// Aggregate outbound call rate shared by all workers
    #[serde(rename = "rate-limit-per-second", default = "default_rate_limit")]
    pub rate_limit_per_second: f64,

    /// Attempts per recoverable operation (>= 1)
    #[serde(rename = "retry-attempts", default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Fixed delay between retry attempts
    #[serde(rename = "retry-delay-seconds", default = "default_retry_delay")]
    pub retry_delay_seconds: f64,

    /// Log progress every N items
    #[serde(rename = "progress-interval", default = "default_progress_interval")]
    pub progress_interval: u64,
}

/// Indexing service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IndexerConfig {
    /// Base URL of the indexing service
    pub endpoint: String,

    /// API key sent with every request
    #[serde(rename = "api-key", default)]
    pub api_key: String,

    /// Per-request timeout
    #[serde(rename = "request-timeout-seconds", default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_source_tag() -> String {
    "folder".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_rate_limit() -> f64 {
    10.0
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay() -> f64 {
    5.0
}

fn default_progress_interval() -> u64 {
    100
}

fn default_request_timeout() -> u64 {
    60
}
