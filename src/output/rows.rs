//! Display rows for table and JSON output
//!
//! Conversions from registry records and registration plans into
//! CLI-friendly rows with fixed column names.

use serde::Serialize;
use tabled::Tabled;

use crate::manifest::HandleOutcome;
use crate::output::formatters::{format_bytes, format_timestamp, truncate};
use crate::store::CategoryStats;
use crate::store::registry::{AssetRecord, ErrorRecord};

/// Cached asset row for `assets list`.
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct AssetRow {
    /// Original external URL
    #[tabled(rename = "URL")]
    pub url: String,

    /// Asset category
    #[tabled(rename = "TYPE")]
    pub category: String,

    /// Hashed filename on disk
    #[tabled(rename = "FILE")]
    pub file: String,

    /// When the cached copy was last written
    #[tabled(rename = "CACHED")]
    pub cached: String,
}

impl From<AssetRecord> for AssetRow {
    fn from(record: AssetRecord) -> Self {
        Self {
            url: record.original_url,
            category: record.category.to_string(),
            file: record.filename,
            cached: format_timestamp(record.cached_at),
        }
    }
}

impl From<&AssetRecord> for AssetRow {
    fn from(record: &AssetRecord) -> Self {
        AssetRow::from(record.clone())
    }
}

/// Error log row for `log list`.
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct ErrorRow {
    /// When the entry was appended
    #[tabled(rename = "WHEN")]
    pub when: String,

    /// warning or error
    #[tabled(rename = "SEVERITY")]
    pub severity: String,

    /// What went wrong
    #[tabled(rename = "MESSAGE")]
    pub message: String,
}

impl From<ErrorRecord> for ErrorRow {
    fn from(record: ErrorRecord) -> Self {
        Self {
            when: format_timestamp(record.logged_at),
            severity: record.severity.to_string(),
            message: truncate(&record.message, 100),
        }
    }
}

impl From<&ErrorRecord> for ErrorRow {
    fn from(record: &ErrorRecord) -> Self {
        ErrorRow::from(record.clone())
    }
}

/// Registration plan row for `sync` and `render`.
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct PlanRow {
    /// Handle name from the manifest
    #[tabled(rename = "HANDLE")]
    pub handle: String,

    /// Asset category
    #[tabled(rename = "TYPE")]
    pub category: String,

    /// What happened to the handle
    #[tabled(rename = "ACTION")]
    pub action: String,

    /// The URL the page will load
    #[tabled(rename = "SERVED FROM")]
    pub served_from: String,

    /// Extra context, usually empty
    #[tabled(rename = "NOTE")]
    pub note: String,
}

impl From<&HandleOutcome> for PlanRow {
    fn from(outcome: &HandleOutcome) -> Self {
        let served_from = outcome
            .local_src
            .clone()
            .unwrap_or_else(|| outcome.original_src.clone());
        Self {
            handle: outcome.handle.clone(),
            category: outcome.category.to_string(),
            action: outcome.action.as_str().to_string(),
            served_from,
            note: outcome.detail.clone().unwrap_or_default(),
        }
    }
}

/// Per-category storage row for `status`.
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct StatRow {
    /// Asset category
    #[tabled(rename = "TYPE")]
    pub category: String,

    /// Cached file count
    #[tabled(rename = "FILES")]
    pub files: usize,

    /// Total size on disk
    #[tabled(rename = "SIZE")]
    pub size: String,
}

impl From<&CategoryStats> for StatRow {
    fn from(stats: &CategoryStats) -> Self {
        Self {
            category: stats.category.to_string(),
            files: stats.files,
            size: format_bytes(stats.bytes),
        }
    }
}
