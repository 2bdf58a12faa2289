//! Bounded worker pool with per-item failure isolation
//!
//! Executes item-processing tasks under a concurrency limit. Every started
//! item yields exactly one outcome; a panic inside one task is converted
//! into a failure outcome and never aborts the other items. No ordering is
//! guaranteed across items.

use crate::model::{CrawlItem, IndexOutcome};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Run-level cancellation signal
///
/// Raising it stops submission of new items; in-flight items drain to
/// completion. Items never started produce no outcome.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Executes item-processing tasks with bounded concurrency
pub struct WorkerPool {
    concurrency: usize,
}

impl WorkerPool {
    /// Creates a pool; `concurrency <= 1` degrades to sequential
    /// processing on the caller's task with identical external behavior
    pub fn new(concurrency: usize) -> Self {
        Self { concurrency }
    }

    /// Processes every item and returns one outcome per started item
    ///
    /// Returns only after every started item has yielded an outcome.
    pub async fn run<F, Fut>(
        &self,
        items: Vec<CrawlItem>,
        process: F,
        cancel: &CancelSignal,
    ) -> Vec<IndexOutcome>
    where
        F: Fn(CrawlItem) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = IndexOutcome> + Send + 'static,
    {
        if self.concurrency <= 1 {
            return self.run_sequential(items, process, cancel).await;
        }

        let process = Arc::new(process);
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = JoinSet::new();
        let mut in_flight: HashMap<tokio::task::Id, String> = HashMap::new();
        let mut submitted = 0usize;
        let total = items.len();

        for item in items {
            if cancel.is_cancelled() {
                tracing::info!(
                    "Cancellation requested, stopping submission after {} of {} items",
                    submitted,
                    total
                );
                break;
            }

            // Blocks here once `concurrency` items are in flight.
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            // The signal may have been raised while parked on the permit.
            if cancel.is_cancelled() {
                drop(permit);
                tracing::info!(
                    "Cancellation requested, stopping submission after {} of {} items",
                    submitted,
                    total
                );
                break;
            }

            let item_id = item.source_id.clone();
            let process = Arc::clone(&process);
            let handle = join_set.spawn(async move {
                let _permit = permit;
                process(item).await
            });
            in_flight.insert(handle.id(), item_id);
            submitted += 1;
        }

        let mut outcomes = Vec::with_capacity(submitted);
        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((task_id, outcome)) => {
                    in_flight.remove(&task_id);
                    outcomes.push(outcome);
                }
                Err(join_error) => {
                    let item_id = in_flight
                        .remove(&join_error.id())
                        .unwrap_or_else(|| "<unknown>".to_string());
                    tracing::error!("Worker for {} panicked: {}", item_id, join_error);
                    outcomes.push(IndexOutcome::failed(
                        item_id,
                        format!("worker panicked: {}", join_error),
                        1,
                    ));
                }
            }
        }

        outcomes
    }

    async fn run_sequential<F, Fut>(
        &self,
        items: Vec<CrawlItem>,
        process: F,
        cancel: &CancelSignal,
    ) -> Vec<IndexOutcome>
    where
        F: Fn(CrawlItem) -> Fut,
        Fut: Future<Output = IndexOutcome>,
    {
        let mut outcomes = Vec::with_capacity(items.len());
        for item in items {
            if cancel.is_cancelled() {
                tracing::info!("Cancellation requested, stopping sequential processing");
                break;
            }
            outcomes.push(process(item).await);
        }
        outcomes
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }
}
