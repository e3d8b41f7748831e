//! Reusable formatting utilities for CLI output
//!
//! Common formatting functions for timestamps, byte counts, and other
//! display values used across multiple commands.

use chrono::DateTime;

/// Format a Unix timestamp (seconds) as an ISO datetime string.
///
/// Returns "N/A" if the timestamp is zero or out of range.
///
/// # Example output
/// `2025-01-15T14:30:00Z`
pub fn format_timestamp(secs: i64) -> String {
    if secs == 0 {
        return "N/A".to_string();
    }
    match DateTime::from_timestamp(secs, 0) {
        Some(dt) => dt.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        None => "N/A".to_string(),
    }
}

/// Format a byte count as a human-readable size.
///
/// # Example output
/// - `512 B`
/// - `1.4 KB`
/// - `3.2 MB`
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let bytes = bytes as f64;
    if bytes >= GB {
        format!("{:.1} GB", bytes / GB)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes / MB)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes / KB)
    } else {
        format!("{} B", bytes as u64)
    }
}

/// Truncate a string to a maximum length with an ellipsis.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
