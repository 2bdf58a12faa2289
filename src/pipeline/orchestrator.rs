//! Crawl orchestration: enumeration, metadata resolution, dispatch, pool
//!
//! Drives one crawl run through its phases, hands the per-item closure to
//! the worker pool, and folds outcomes into the run summary. Setup and
//! enumeration failures are fatal and abort the run before any item-level
//! processing; per-item failures only ever reach the summary.

use crate::config::Config;
use crate::indexer::{Indexer, TabularParser};
use crate::model::{CrawlRunSummary, MetadataTable};
use crate::pipeline::dispatch::{ItemProcessor, SupportedExtensions};
use crate::pipeline::limiter::RateLimiter;
use crate::pipeline::pool::{CancelSignal, WorkerPool};
use crate::pipeline::retry::RetryExecutor;
use crate::source::SourceEnumerator;
use crate::GranaryError;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Phase of a crawl run
///
/// `Initialized → Enumerating → Processing → Completed`, with `Failed`
/// reachable only from the first two phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Initialized,
    Enumerating,
    Processing,
    Completed,
    Failed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Initialized => "initialization",
            RunPhase::Enumerating => "enumeration",
            RunPhase::Processing => "processing",
            RunPhase::Completed => "completion",
            RunPhase::Failed => "failure",
        };
        write!(f, "{}", name)
    }
}

/// Drives one crawl run from enumeration to summary
pub struct CrawlOrchestrator {
    config: Config,
    indexer: Arc<dyn Indexer>,
    tabular: Arc<dyn TabularParser>,
}

impl CrawlOrchestrator {
    pub fn new(
        config: Config,
        indexer: Arc<dyn Indexer>,
        tabular: Arc<dyn TabularParser>,
    ) -> Self {
        Self {
            config,
            indexer,
            tabular,
        }
    }

    /// Runs one crawl to completion
    ///
    /// Returns the finalized run summary, or a fatal error naming the
    /// phase that failed. The summary always satisfies
    /// `succeeded + failed + skipped == processed`.
    pub async fn run(
        &self,
        enumerator: &mut dyn SourceEnumerator,
        cancel: &CancelSignal,
    ) -> Result<CrawlRunSummary, GranaryError> {
        tracing::info!("Starting crawl run, phase: {}", RunPhase::Initialized);

        if let Err(error) = enumerator.setup().await {
            tracing::error!("Source setup failed: {}", error);
            return Err(GranaryError::Run {
                phase: RunPhase::Initialized,
                source: error,
            });
        }

        tracing::info!("Source ready, phase: {}", RunPhase::Enumerating);
        let items = enumerator.enumerate().await.map_err(|error| {
            tracing::error!("Enumeration failed: {}", error);
            GranaryError::Run {
                phase: RunPhase::Enumerating,
                source: error,
            }
        })?;
        let total = items.len();
        tracing::info!("Enumerated {} items", total);

        // Resolve the external metadata table once up front.
        let table = match &self.config.source.metadata_table_path {
            Some(path) => {
                let table =
                    MetadataTable::load(Path::new(path), self.config.source.key_match_policy)?;
                tracing::info!("Loaded metadata table with {} entries from {}", table.len(), path);
                Some(table)
            }
            None => None,
        };

        tracing::info!(
            "Dispatching {} items with concurrency {}, phase: {}",
            total,
            self.config.pipeline.concurrency,
            RunPhase::Processing
        );

        let processor = Arc::new(ItemProcessor::new(
            Arc::clone(&self.indexer),
            Arc::clone(&self.tabular),
            Arc::new(RateLimiter::new(self.config.pipeline.rate_limit_per_second)),
            RetryExecutor::new(
                self.config.pipeline.retry_attempts,
                Duration::from_secs_f64(self.config.pipeline.retry_delay_seconds),
            ),
            SupportedExtensions::from_config(&self.config.source.extensions),
            table,
            total as u64,
            self.config.pipeline.progress_interval,
        ));

        let pool = WorkerPool::new(self.config.pipeline.concurrency as usize);
        let worker = Arc::clone(&processor);
        let outcomes = pool
            .run(
                items,
                move |item| {
                    let processor = Arc::clone(&worker);
                    async move { processor.process(item).await }
                },
                cancel,
            )
            .await;

        let mut summary = CrawlRunSummary::new();
        for outcome in outcomes {
            summary.record(outcome);
        }

        tracing::info!(
            "Crawl completed: {} processed, {} succeeded, {} failed, {} skipped, phase: {}",
            summary.processed,
            summary.succeeded,
            summary.failed,
            summary.skipped,
            RunPhase::Completed
        );

        Ok(summary)
    }
}
