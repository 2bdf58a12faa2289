//! The ingestion pipeline core
//!
//! This module contains the reusable machinery shared by every source
//! connector:
//! - Token-bucket rate limiting shared across workers
//! - Bounded retry with a fixed inter-attempt delay
//! - Content-type dispatch and metadata merging per item
//! - A bounded worker pool with per-item failure isolation
//! - The orchestrator that drives one crawl run end to end

mod dispatch;
mod limiter;
mod orchestrator;
mod pool;
mod retry;

pub use dispatch::{
    classify, document_is_indexable, HandlerKind, ItemProcessor, SupportedExtensions,
    MEDIA_EXTENSIONS, TABULAR_EXTENSIONS,
};
pub use limiter::RateLimiter;
pub use orchestrator::{CrawlOrchestrator, RunPhase};
pub use pool::{CancelSignal, WorkerPool};
pub use retry::RetryExecutor;
