//! `@import` statement extraction
//!
//! Tolerates both canonical forms, with or without a trailing media list:
//!
//! ```css
//! @import "reset.css";
//! @import url('grid.css') screen and (min-width: 600px);
//! ```

use std::sync::LazyLock;

use regex::Regex;

/// Matches one whole `@import ...;` statement. The target may be bare,
/// quoted, or wrapped in `url(...)`; everything between the target and the
/// terminating `;` is the media clause.
static IMPORT_STATEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)@import\s+(?:url\(\s*)?["']?([^"'()\s;]+)["']?\s*\)?\s*([^;]*);"#).unwrap()
});

/// Matches `/* ... */` comment spans, across newlines.
static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());

/// One extracted `@import` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    /// The full matched statement text, including the terminating `;`.
    pub statement: String,
    /// The import target exactly as written (possibly relative).
    pub target: String,
    /// Media clause between the target and the `;`; empty when absent.
    pub media: String,
}

impl ImportStatement {
    /// Reconstructs the statement against a replacement URL, carrying the
    /// media clause over verbatim.
    pub fn rewritten(&self, local_url: &str) -> String {
        if self.media.is_empty() {
            format!("@import url('{local_url}');")
        } else {
            format!("@import url('{}') {};", local_url, self.media)
        }
    }
}

/// Removes `/* ... */` spans so commented-out directives are never matched.
/// An unterminated comment is left in place.
pub fn strip_comments(css: &str) -> String {
    COMMENT.replace_all(css, "").into_owned()
}

/// Extracts every `@import` directive from `css`, comments stripped first,
/// in the order the statements appear. Duplicate targets are kept; the
/// resolution layer's visited set is the only dedupe.
pub fn extract_imports(css: &str) -> Vec<ImportStatement> {
    let stripped = strip_comments(css);
    IMPORT_STATEMENT
        .captures_iter(&stripped)
        .filter_map(|caps| {
            let statement = caps.get(0)?.as_str().to_string();
            let target = caps.get(1)?.as_str().trim().to_string();
            if target.is_empty() {
                return None;
            }
            let media = caps
                .get(2)
                .map(|m| m.as_str())
                .unwrap_or("")
                .trim_start_matches(')')
                .trim()
                .to_string();
            Some(ImportStatement {
                statement,
                target,
                media,
            })
        })
        .collect()
}
