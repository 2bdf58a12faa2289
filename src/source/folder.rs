//! Filesystem source connector
//!
//! Walks a local directory tree and produces one item per file that passes
//! the extension filter, with the synthesized default metadata layer
//! (timestamps, size, source tag, parent/folder path) filled from the
//! file's stat data. The metadata-table file itself, when it lives inside
//! the crawled tree, is never enumerated.

use crate::model::{file_defaults, ContentRef, CrawlItem, FileStat, Metadata};
use crate::pipeline::SupportedExtensions;
use crate::source::SourceEnumerator;
use crate::SourceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

pub struct FolderSource {
    root: PathBuf,
    source_tag: String,
    extensions: SupportedExtensions,
    metadata_table_path: Option<PathBuf>,
}

impl FolderSource {
    pub fn new(
        root: impl Into<PathBuf>,
        source_tag: impl Into<String>,
        extensions: SupportedExtensions,
        metadata_table_path: Option<PathBuf>,
    ) -> Self {
        Self {
            root: root.into(),
            source_tag: source_tag.into(),
            extensions,
            metadata_table_path,
        }
    }

    fn stat(path: &Path) -> Result<FileStat, SourceError> {
        let meta = std::fs::metadata(path)?;
        let modified: DateTime<Utc> = meta.modified()?.into();
        // Creation time is not available on every filesystem; fall back to
        // the modification time.
        let created: DateTime<Utc> = meta
            .created()
            .map(DateTime::<Utc>::from)
            .unwrap_or(modified);
        Ok(FileStat {
            created,
            modified,
            size: meta.len(),
        })
    }

    fn walk(&self, dir: &Path, items: &mut Vec<CrawlItem>) -> Result<(), SourceError> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            // Decide recursion from the entry's own type so directory
            // symlinks are never followed; a link cycle would otherwise
            // recurse forever.
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                self.walk(&path, items)?;
                continue;
            }
            if file_type.is_symlink() && path.is_dir() {
                continue;
            }

            // Never index the metadata table itself.
            if let Some(table_path) = &self.metadata_table_path {
                if path == *table_path {
                    continue;
                }
            }

            let content = ContentRef::Path(path.clone());
            if !self.extensions.allows(&content) {
                continue;
            }

            let relative = path
                .strip_prefix(&self.root)
                .map_err(|_| {
                    SourceError::Enumeration(format!(
                        "{} is outside the crawl root",
                        path.display()
                    ))
                })?
                .to_string_lossy()
                .to_string();
            let parent = path.parent().unwrap_or(&self.root);
            let stat = Self::stat(&path)?;

            items.push(CrawlItem {
                source_id: relative.clone(),
                display_name: relative.clone(),
                content,
                base_metadata: file_defaults(&relative, parent, &self.source_tag, &stat),
                item_metadata: Metadata::new(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SourceEnumerator for FolderSource {
    async fn setup(&mut self) -> Result<(), SourceError> {
        if !self.root.is_dir() {
            return Err(SourceError::Setup(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }
        Ok(())
    }

    async fn enumerate(&mut self) -> Result<Vec<CrawlItem>, SourceError> {
        tracing::info!("Enumerating files under {}", self.root.display());
        let mut items = Vec::new();
        let root = self.root.clone();
        self.walk(&root, &mut items)?;
        tracing::info!("Found {} files", items.len());
        Ok(items)
    }
}
