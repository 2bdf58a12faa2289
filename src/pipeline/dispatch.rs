//! Content-type classification and per-item processing
//!
//! Classification is a pure function of the item's content reference:
//! media extensions route to the media handler, extensions recognized by
//! the tabular sniffing rule route to the tabular handler, inline JSON
//! payloads route to the document handler, and everything else to the
//! generic file handler. Items rejected by an active extension allow-list
//! yield a `Skipped` outcome before dispatch, never an error.

use crate::indexer::{Indexer, TableMetadata, TabularParser};
use crate::model::{merge, ContentRef, CrawlItem, IndexOutcome, Metadata, MetadataTable};
use crate::pipeline::limiter::RateLimiter;
use crate::pipeline::retry::RetryExecutor;
use crate::IndexError;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Extensions routed to the media handler
pub const MEDIA_EXTENSIONS: &[&str] = &[".mp3", ".mp4"];

/// Extensions recognized by the tabular sniffing rule
pub const TABULAR_EXTENSIONS: &[&str] = &[".csv", ".tsv", ".xls", ".xlsx"];

/// The indexing strategy selected for an item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Inline JSON document, indexed as-is
    Document,

    /// Audio/video file
    Media,

    /// Tabular file, delegated to the tabular parser
    Tabular,

    /// Any other file
    GenericFile,
}

/// Selects the handler for an item's content reference
///
/// Pure: derives everything from the reference itself, no I/O.
pub fn classify(content: &ContentRef) -> HandlerKind {
    if content.as_inline().is_some() {
        return HandlerKind::Document;
    }
    match content.extension() {
        Some(ext) if MEDIA_EXTENSIONS.contains(&ext.as_str()) => HandlerKind::Media,
        Some(ext) if TABULAR_EXTENSIONS.contains(&ext.as_str()) => HandlerKind::Tabular,
        _ => HandlerKind::GenericFile,
    }
}

/// Checks that an inline document carries the fields the indexer requires
pub fn document_is_indexable(document: &Value) -> bool {
    document.get("id").is_some() && document.get("sections").is_some()
}

/// Extension allow-list applied before dispatch
#[derive(Debug, Clone)]
pub enum SupportedExtensions {
    /// Every extension is accepted (configured as `"*"`)
    All,

    /// Only the listed extensions are accepted
    Set(HashSet<String>),
}

impl SupportedExtensions {
    /// Builds an allow-list from config entries
    ///
    /// A `"*"` entry anywhere means everything is allowed. Entries are
    /// normalized to lowercase with a leading dot, so `pdf` and `.PDF`
    /// both match `.pdf`.
    pub fn from_config(entries: &[String]) -> Self {
        if entries.iter().any(|entry| entry.trim() == "*") {
            return SupportedExtensions::All;
        }
        let set = entries
            .iter()
            .map(|entry| {
                let trimmed = entry.trim().to_lowercase();
                if trimmed.starts_with('.') {
                    trimmed
                } else {
                    format!(".{}", trimmed)
                }
            })
            .collect();
        SupportedExtensions::Set(set)
    }

    /// Whether an item's content passes the allow-list
    ///
    /// Inline documents always pass; files without an extension pass only
    /// when everything is allowed.
    pub fn allows(&self, content: &ContentRef) -> bool {
        match self {
            SupportedExtensions::All => true,
            SupportedExtensions::Set(set) => {
                if content.as_inline().is_some() {
                    return true;
                }
                match content.extension() {
                    Some(ext) => set.contains(&ext),
                    None => false,
                }
            }
        }
    }
}

/// The resolved indexing call for one item
enum Invocation<'a> {
    Document(&'a Value),
    Media(&'a Path),
    Tabular,
    File { path: &'a Path, external_id: String },
}

/// Processes one item end to end: merge, classify, rate-limit, index
///
/// Shared by every worker; all state is either immutable or atomic. The
/// retry executor wraps only the indexing call itself, so classification
/// and payload failures are never retried.
pub struct ItemProcessor {
    indexer: Arc<dyn Indexer>,
    tabular: Arc<dyn TabularParser>,
    limiter: Arc<RateLimiter>,
    retry: RetryExecutor,
    allowed: SupportedExtensions,
    table: Option<MetadataTable>,
    total: u64,
    progress_interval: u64,
    started: AtomicU64,
}

impl ItemProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        indexer: Arc<dyn Indexer>,
        tabular: Arc<dyn TabularParser>,
        limiter: Arc<RateLimiter>,
        retry: RetryExecutor,
        allowed: SupportedExtensions,
        table: Option<MetadataTable>,
        total: u64,
        progress_interval: u64,
    ) -> Self {
        Self {
            indexer,
            tabular,
            limiter,
            retry,
            allowed,
            table,
            total,
            progress_interval,
            started: AtomicU64::new(0),
        }
    }

    /// Processes one item and reports exactly one outcome
    ///
    /// Never returns an error: every failure is converted into a
    /// `Failed` or `Skipped` outcome so one item can never abort a run.
    pub async fn process(&self, item: CrawlItem) -> IndexOutcome {
        let started = self.started.fetch_add(1, Ordering::Relaxed) + 1;
        if self.progress_interval > 0 && (started - 1) % self.progress_interval == 0 {
            tracing::info!("Processing item {} of {}", started, self.total);
        }

        if !self.allowed.allows(&item.content) {
            let extension = item.content.extension().unwrap_or_default();
            tracing::warn!(
                "Skipping {} due to unsupported file type '{}'",
                item.source_id,
                extension
            );
            return IndexOutcome::skipped(
                item.source_id,
                format!("unsupported file type '{}'", extension),
            );
        }

        let table_override = self
            .table
            .as_ref()
            .and_then(|table| table.lookup(&item.display_name));
        let merged = merge(&item.base_metadata, table_override, Some(&item.item_metadata));

        let kind = classify(&item.content);
        let invocation = match prepare(kind, &item, &merged) {
            Ok(invocation) => invocation,
            Err(reason) => {
                tracing::error!("Cannot index {}: {}", item.source_id, reason);
                return IndexOutcome::failed(item.source_id, reason, 0);
            }
        };

        self.limiter.acquire().await;

        let table_metadata = TableMetadata {
            name: item.display_name.clone(),
        };
        // Tabular parsing is item-level business logic, not a recoverable
        // network call; it gets exactly one attempt. Everything else is
        // wrapped in the retry executor.
        let (result, attempts) = match invocation {
            Invocation::Tabular => (
                self.invoke(&invocation, &table_metadata, &item.content, &merged)
                    .await,
                1,
            ),
            _ => {
                self.retry
                    .execute(&item.source_id, || {
                        self.invoke(&invocation, &table_metadata, &item.content, &merged)
                    })
                    .await
            }
        };

        match result {
            Ok(true) => IndexOutcome::success(item.source_id, attempts),
            Ok(false) => {
                tracing::error!("Indexing backend reported failure for {}", item.source_id);
                IndexOutcome::failed(item.source_id, "indexing backend reported failure", attempts)
            }
            Err(error) => {
                tracing::error!("Error while indexing {}: {}", item.source_id, error);
                IndexOutcome::failed(item.source_id, error.to_string(), attempts)
            }
        }
    }

    async fn invoke(
        &self,
        invocation: &Invocation<'_>,
        table_metadata: &TableMetadata,
        content: &ContentRef,
        metadata: &Metadata,
    ) -> std::result::Result<bool, IndexError> {
        match invocation {
            Invocation::Document(document) => self.indexer.index_document(document).await,
            Invocation::Media(path) => self.indexer.index_media_file(path, metadata).await,
            Invocation::Tabular => self
                .tabular
                .parse(table_metadata, content, metadata)
                .await
                .map(|_| true),
            Invocation::File { path, external_id } => {
                self.indexer.index_file(path, external_id, metadata).await
            }
        }
    }
}

/// Resolves the concrete indexing call, validating the item's payload
///
/// Payload problems (missing inline document fields, content that was
/// never materialized locally) are permanent per-item failures and are
/// reported before any indexing attempt is made.
fn prepare<'a>(
    kind: HandlerKind,
    item: &'a CrawlItem,
    merged: &Metadata,
) -> std::result::Result<Invocation<'a>, String> {
    match kind {
        HandlerKind::Document => {
            let document = item
                .content
                .as_inline()
                .ok_or_else(|| "document handler requires an inline payload".to_string())?;
            if !document_is_indexable(document) {
                return Err("invalid document payload: missing 'id' or 'sections'".to_string());
            }
            Ok(Invocation::Document(document))
        }
        HandlerKind::Media => {
            let path = require_path(&item.content)?;
            Ok(Invocation::Media(path))
        }
        HandlerKind::Tabular => {
            require_path(&item.content)?;
            Ok(Invocation::Tabular)
        }
        HandlerKind::GenericFile => {
            let path = require_path(&item.content)?;
            // Externally visible identifier: the download URL when one was
            // resolved, otherwise the display name.
            let external_id = merged
                .get("url")
                .and_then(|value| value.as_text())
                .map(|url| url.to_string())
                .unwrap_or_else(|| item.display_name.clone());
            Ok(Invocation::File { path, external_id })
        }
    }
}

fn require_path(content: &ContentRef) -> std::result::Result<&Path, String> {
    content
        .as_path()
        .ok_or_else(|| "content is not materialized locally".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OutcomeStatus;
    use async_trait::async_trait;
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records calls and fails a configurable number of times first
    struct FakeIndexer {
        fail_first: u32,
        report_false: bool,
        calls: AtomicU32,
        external_ids: Mutex<Vec<String>>,
    }

    impl FakeIndexer {
        fn new() -> Self {
            Self {
                fail_first: 0,
                report_false: false,
                calls: AtomicU32::new(0),
                external_ids: Mutex::new(Vec::new()),
            }
        }

        fn failing(fail_first: u32) -> Self {
            Self {
                fail_first,
                ..Self::new()
            }
        }

        fn reporting_false() -> Self {
            Self {
                report_false: true,
                ..Self::new()
            }
        }

        fn outcome(&self) -> std::result::Result<bool, IndexError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                Err(IndexError::Service("transient".to_string()))
            } else {
                Ok(!self.report_false)
            }
        }
    }

    #[async_trait]
    impl Indexer for FakeIndexer {
        async fn index_document(
            &self,
            _document: &Value,
        ) -> std::result::Result<bool, IndexError> {
            self.outcome()
        }

        async fn index_file(
            &self,
            _path: &Path,
            external_id: &str,
            _metadata: &Metadata,
        ) -> std::result::Result<bool, IndexError> {
            self.external_ids
                .lock()
                .unwrap()
                .push(external_id.to_string());
            self.outcome()
        }

        async fn index_media_file(
            &self,
            _path: &Path,
            _metadata: &Metadata,
        ) -> std::result::Result<bool, IndexError> {
            self.outcome()
        }
    }

    struct FakeTabular {
        calls: AtomicU32,
    }

    #[async_trait]
    impl TabularParser for FakeTabular {
        async fn parse(
            &self,
            _table: &TableMetadata,
            _content: &ContentRef,
            _metadata: &Metadata,
        ) -> std::result::Result<(), IndexError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn processor(
        indexer: Arc<FakeIndexer>,
        tabular: Arc<FakeTabular>,
        allowed: SupportedExtensions,
        retry_attempts: u32,
    ) -> ItemProcessor {
        ItemProcessor::new(
            indexer,
            tabular,
            Arc::new(RateLimiter::new(1000.0)),
            RetryExecutor::new(retry_attempts, Duration::ZERO),
            allowed,
            None,
            10,
            100,
        )
    }

    fn file_item(name: &str) -> CrawlItem {
        CrawlItem {
            source_id: name.to_string(),
            display_name: name.to_string(),
            content: ContentRef::Path(PathBuf::from(format!("/data/{}", name))),
            base_metadata: Metadata::new(),
            item_metadata: Metadata::new(),
        }
    }

    #[test]
    fn test_classify_by_extension() {
        let media = ContentRef::Path(PathBuf::from("clip.MP4"));
        assert_eq!(classify(&media), HandlerKind::Media);

        let audio = ContentRef::Path(PathBuf::from("talk.mp3"));
        assert_eq!(classify(&audio), HandlerKind::Media);

        let tabular = ContentRef::Path(PathBuf::from("data.csv"));
        assert_eq!(classify(&tabular), HandlerKind::Tabular);

        let sheet = ContentRef::Path(PathBuf::from("book.xlsx"));
        assert_eq!(classify(&sheet), HandlerKind::Tabular);

        let generic = ContentRef::Path(PathBuf::from("paper.pdf"));
        assert_eq!(classify(&generic), HandlerKind::GenericFile);

        let no_ext = ContentRef::Path(PathBuf::from("README"));
        assert_eq!(classify(&no_ext), HandlerKind::GenericFile);

        let inline = ContentRef::Inline(json!({"id": "d1", "sections": []}));
        assert_eq!(classify(&inline), HandlerKind::Document);
    }

    #[test]
    fn test_supported_extensions_star_allows_all() {
        let allowed = SupportedExtensions::from_config(&["*".to_string()]);
        assert!(allowed.allows(&ContentRef::Path(PathBuf::from("a.exe"))));
        assert!(allowed.allows(&ContentRef::Path(PathBuf::from("README"))));
    }

    #[test]
    fn test_supported_extensions_normalization() {
        let allowed =
            SupportedExtensions::from_config(&["pdf".to_string(), ".MD".to_string()]);
        assert!(allowed.allows(&ContentRef::Path(PathBuf::from("a.PDF"))));
        assert!(allowed.allows(&ContentRef::Path(PathBuf::from("notes.md"))));
        assert!(!allowed.allows(&ContentRef::Path(PathBuf::from("setup.exe"))));
        assert!(!allowed.allows(&ContentRef::Path(PathBuf::from("README"))));
    }

    #[tokio::test]
    async fn test_allow_list_rejection_is_skipped_not_error() {
        let indexer = Arc::new(FakeIndexer::new());
        let tabular = Arc::new(FakeTabular {
            calls: AtomicU32::new(0),
        });
        let allowed = SupportedExtensions::from_config(&[".pdf".to_string()]);
        let processor = processor(indexer.clone(), tabular, allowed, 3);

        let outcome = processor.process(file_item("setup.exe")).await;

        assert!(matches!(outcome.status, OutcomeStatus::Skipped { .. }));
        assert_eq!(outcome.attempts, 0);
        assert_eq!(indexer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generic_file_uses_url_as_external_id() {
        let indexer = Arc::new(FakeIndexer::new());
        let tabular = Arc::new(FakeTabular {
            calls: AtomicU32::new(0),
        });
        let processor = processor(indexer.clone(), tabular, SupportedExtensions::All, 1);

        let mut item = file_item("a.pdf");
        item.item_metadata
            .insert("url", "https://example.com/dl/a.pdf");
        let outcome = processor.process(item).await;

        assert!(outcome.is_success());
        let ids = indexer.external_ids.lock().unwrap();
        assert_eq!(ids.as_slice(), ["https://example.com/dl/a.pdf"]);
    }

    #[tokio::test]
    async fn test_generic_file_falls_back_to_display_name() {
        let indexer = Arc::new(FakeIndexer::new());
        let tabular = Arc::new(FakeTabular {
            calls: AtomicU32::new(0),
        });
        let processor = processor(indexer.clone(), tabular, SupportedExtensions::All, 1);

        let outcome = processor.process(file_item("docs/a.pdf")).await;

        assert!(outcome.is_success());
        let ids = indexer.external_ids.lock().unwrap();
        assert_eq!(ids.as_slice(), ["docs/a.pdf"]);
    }

    #[tokio::test]
    async fn test_backend_false_fails_without_retry() {
        let indexer = Arc::new(FakeIndexer::reporting_false());
        let tabular = Arc::new(FakeTabular {
            calls: AtomicU32::new(0),
        });
        let processor = processor(indexer.clone(), tabular, SupportedExtensions::All, 3);

        let outcome = processor.process(file_item("a.pdf")).await;

        assert!(matches!(outcome.status, OutcomeStatus::Failed { .. }));
        assert_eq!(outcome.attempts, 1);
        assert_eq!(indexer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_errors_retried_until_success() {
        let indexer = Arc::new(FakeIndexer::failing(2));
        let tabular = Arc::new(FakeTabular {
            calls: AtomicU32::new(0),
        });
        let processor = processor(indexer.clone(), tabular, SupportedExtensions::All, 3);

        let outcome = processor.process(file_item("a.pdf")).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(indexer.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_invalid_document_fails_without_indexing() {
        let indexer = Arc::new(FakeIndexer::new());
        let tabular = Arc::new(FakeTabular {
            calls: AtomicU32::new(0),
        });
        let processor = processor(indexer.clone(), tabular, SupportedExtensions::All, 3);

        let item = CrawlItem {
            source_id: "doc-1".to_string(),
            display_name: "doc-1".to_string(),
            content: ContentRef::Inline(json!({"title": "no id or sections"})),
            base_metadata: Metadata::new(),
            item_metadata: Metadata::new(),
        };
        let outcome = processor.process(item).await;

        assert!(matches!(outcome.status, OutcomeStatus::Failed { .. }));
        assert_eq!(outcome.attempts, 0);
        assert_eq!(indexer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unmaterialized_content_fails_permanently() {
        let indexer = Arc::new(FakeIndexer::new());
        let tabular = Arc::new(FakeTabular {
            calls: AtomicU32::new(0),
        });
        let processor = processor(indexer.clone(), tabular, SupportedExtensions::All, 3);

        let item = CrawlItem {
            source_id: "remote".to_string(),
            display_name: "remote.pdf".to_string(),
            content: ContentRef::Url("https://example.com/remote.pdf".to_string()),
            base_metadata: Metadata::new(),
            item_metadata: Metadata::new(),
        };
        let outcome = processor.process(item).await;

        assert!(matches!(outcome.status, OutcomeStatus::Failed { .. }));
        assert_eq!(outcome.attempts, 0);
        assert_eq!(indexer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_tabular_routes_to_parser() {
        let indexer = Arc::new(FakeIndexer::new());
        let tabular = Arc::new(FakeTabular {
            calls: AtomicU32::new(0),
        });
        let processor = processor(indexer.clone(), tabular.clone(), SupportedExtensions::All, 1);

        let outcome = processor.process(file_item("table.csv")).await;

        assert!(outcome.is_success());
        assert_eq!(tabular.calls.load(Ordering::SeqCst), 1);
        assert_eq!(indexer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_metadata_table_override_applies() {
        let indexer = Arc::new(FakeIndexer::new());
        let tabular = Arc::new(FakeTabular {
            calls: AtomicU32::new(0),
        });
        let table = MetadataTable::from_json_str(
            r#"{ "a.pdf": { "url": "https://override.example.com/a" } }"#,
            crate::model::KeyMatchPolicy::Exact,
        )
        .unwrap();
        let processor = ItemProcessor::new(
            indexer.clone(),
            tabular,
            Arc::new(RateLimiter::new(1000.0)),
            RetryExecutor::new(1, Duration::ZERO),
            SupportedExtensions::All,
            Some(table),
            10,
            100,
        );

        let outcome = processor.process(file_item("a.pdf")).await;

        assert!(outcome.is_success());
        let ids = indexer.external_ids.lock().unwrap();
        assert_eq!(ids.as_slice(), ["https://override.example.com/a"]);
    }
}
