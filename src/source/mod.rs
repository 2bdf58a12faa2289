//! Source connectors and the enumeration contract
//!
//! A source is an external system or filesystem location enumerated for
//! content. Connectors implement [`SourceEnumerator`]; the pipeline never
//! knows a source's protocol, only the items it produces.

mod bulk_json;
mod folder;

pub use bulk_json::BulkJsonSource;
pub use folder::FolderSource;

use crate::model::CrawlItem;
use crate::SourceError;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;

/// Which kind of source a run ingests from
///
/// Resolved once at orchestrator setup from configuration, never
/// re-checked per item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceMode {
    Folder,
    SharepointFolder,
    SharepointList,
    BulkJson,
    Catalog,
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceMode::Folder => "folder",
            SourceMode::SharepointFolder => "sharepoint-folder",
            SourceMode::SharepointList => "sharepoint-list",
            SourceMode::BulkJson => "bulk-json",
            SourceMode::Catalog => "catalog",
        };
        write!(f, "{}", name)
    }
}

/// Enumerates the items of one source for one crawl run
///
/// `setup` performs authentication/session work and is fatal on failure;
/// `enumerate` produces a finite, possibly large, one-shot sequence and is
/// not required to be restartable.
#[async_trait]
pub trait SourceEnumerator: Send {
    async fn setup(&mut self) -> Result<(), SourceError>;

    async fn enumerate(&mut self) -> Result<Vec<CrawlItem>, SourceError>;
}
