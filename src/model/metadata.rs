//! Metadata values, layered merging, and the external metadata table
//!
//! Metadata is an ordered mapping of string keys to scalar values. Three
//! layers combine into the record attached to each indexed item, lowest to
//! highest precedence: synthesized defaults, an optional external metadata
//! table keyed by relative display name, and per-item metadata supplied by
//! the connector. Later layers overwrite identical keys; merging is pure.

use crate::GranaryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// A scalar metadata value
///
/// Untagged, so JSON metadata tables deserialize naturally: numbers map to
/// `Integer`/`Float`, strings to `Text`. Timestamps are produced internally
/// (never sniffed out of strings) and serialize as RFC 3339.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl MetadataValue {
    /// Returns the text content if this value is textual
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Integer(value)
    }
}

impl From<u64> for MetadataValue {
    fn from(value: u64) -> Self {
        MetadataValue::Integer(value as i64)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl From<DateTime<Utc>> for MetadataValue {
    fn from(value: DateTime<Utc>) -> Self {
        MetadataValue::Timestamp(value)
    }
}

/// Ordered mapping of string keys to scalar values
///
/// Keys are case-sensitive. Iteration order is deterministic (sorted by
/// key), which keeps merges and serialized output stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, MetadataValue>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetadataValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetadataValue)> {
        self.0.iter()
    }

    /// Copies every entry from `other`, overwriting existing keys
    pub fn extend_from(&mut self, other: &Metadata) {
        for (key, value) in other.iter() {
            self.0.insert(key.clone(), value.clone());
        }
    }
}

/// Merges the three metadata layers into one record
///
/// Precedence, lowest to highest: `base` (synthesized defaults), the
/// optional metadata-table override, and the optional per-item metadata.
/// Last writer wins per key; non-overlapping keys from all layers are
/// preserved. Pure and deterministic.
pub fn merge(
    base: &Metadata,
    table_override: Option<&Metadata>,
    per_item: Option<&Metadata>,
) -> Metadata {
    let mut merged = base.clone();
    if let Some(table) = table_override {
        merged.extend_from(table);
    }
    if let Some(item) = per_item {
        merged.extend_from(item);
    }
    merged
}

/// Filesystem facts about one file, gathered by the enumerator
///
/// A plain value struct so that default-metadata synthesis stays pure; the
/// connector performs the stat call.
#[derive(Debug, Clone, Copy)]
pub struct FileStat {
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub size: u64,
}

/// Synthesizes the default metadata layer for a file-backed item
///
/// Keys match the folder connector's established record: `created_at`,
/// `last_updated`, `file_size`, `source`, `title`, `parent_folder`, and
/// `folder_path`.
pub fn file_defaults(
    relative_name: &str,
    parent_dir: &Path,
    source_tag: &str,
    stat: &FileStat,
) -> Metadata {
    let mut defaults = Metadata::new();
    defaults.insert("created_at", stat.created);
    defaults.insert("last_updated", stat.modified);
    defaults.insert("file_size", stat.size);
    defaults.insert("source", source_tag);
    defaults.insert("title", relative_name);
    defaults.insert(
        "parent_folder",
        parent_dir
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default(),
    );
    defaults.insert("folder_path", parent_dir.to_string_lossy().to_string());
    defaults
}

/// How metadata-table keys are matched against item display names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyMatchPolicy {
    /// Keys are trimmed but compared case-sensitively (observed behavior)
    #[default]
    Exact,

    /// Keys and lookups are lowercased before comparison
    CaseInsensitive,
}

/// External metadata table, resolved once per run
///
/// Loaded from a JSON object mapping relative display names to metadata
/// records. Absent entries contribute nothing to the merge.
#[derive(Debug, Clone)]
pub struct MetadataTable {
    entries: HashMap<String, Metadata>,
    policy: KeyMatchPolicy,
}

impl MetadataTable {
    /// Parses a table from raw JSON
    ///
    /// Keys are trimmed of surrounding whitespace on load.
    pub fn from_json_str(raw: &str, policy: KeyMatchPolicy) -> serde_json::Result<Self> {
        let parsed: HashMap<String, Metadata> = serde_json::from_str(raw)?;
        let entries = parsed
            .into_iter()
            .map(|(key, value)| (Self::normalize(key.trim(), policy), value))
            .collect();
        Ok(Self { entries, policy })
    }

    /// Loads a table from a JSON file
    pub fn load(path: &Path, policy: KeyMatchPolicy) -> Result<Self, GranaryError> {
        let raw =
            std::fs::read_to_string(path).map_err(|error| GranaryError::MetadataTable {
                path: path.display().to_string(),
                message: error.to_string(),
            })?;
        Self::from_json_str(&raw, policy).map_err(|error| GranaryError::MetadataTable {
            path: path.display().to_string(),
            message: error.to_string(),
        })
    }

    /// Looks up the override record for an item's display name
    pub fn lookup(&self, display_name: &str) -> Option<&Metadata> {
        self.entries
            .get(&Self::normalize(display_name.trim(), self.policy))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn normalize(key: &str, policy: KeyMatchPolicy) -> String {
        match policy {
            KeyMatchPolicy::Exact => key.to_string(),
            KeyMatchPolicy::CaseInsensitive => key.to_lowercase(),
        }
    }
}
