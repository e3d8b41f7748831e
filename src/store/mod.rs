//! On-disk asset store
//!
//! Content files live under `<root>/{css,fonts,js}/` with hashed filenames.
//! Each category directory carries an ownership marker file so destructive
//! cleanup only ever touches directories this tool created. Publishes are
//! write-then-rename, so a concurrent reader never observes partial content.

pub mod key;
pub mod registry;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::category::Category;
use crate::error::AssetError;

// Re-export main types
pub use key::hashed_filename;
pub use registry::Registry;

/// Seconds in a day, for freshness math.
const DAY_SECS: i64 = 24 * 60 * 60;

/// True iff `path` exists and its age at `now` is under the window.
/// A missing path is never fresh.
pub fn is_fresh(path: &Path, expiration_days: u32, now: DateTime<Utc>) -> bool {
    match modified_time(path) {
        Some(mtime) => now.timestamp() - mtime < i64::from(expiration_days) * DAY_SECS,
        None => false,
    }
}

/// Modification time of `path` as a unix timestamp, if it exists.
pub fn modified_time(path: &Path) -> Option<i64> {
    let meta = std::fs::metadata(path).ok()?;
    let modified = meta.modified().ok()?;
    modified
        .duration_since(std::time::UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs() as i64)
}

/// Per-category usage numbers for the status display.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CategoryStats {
    pub category: Category,
    pub files: usize,
    pub bytes: u64,
}

/// What `uninstall` removed and what it refused to touch.
#[derive(Debug, Default)]
pub struct UninstallReport {
    pub removed: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Filesystem half of the cache: category directories under one root,
/// plus the public URL prefix those directories are served from.
pub struct AssetStore {
    root: PathBuf,
    public_base: String,
}

impl AssetStore {
    /// Marker file identifying directories owned by this tool.
    pub const MARKER_FILE: &'static str = ".cdnless";

    pub fn new(root: impl Into<PathBuf>, public_base: &str) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.root.join(category.dir_name())
    }

    pub fn asset_path(&self, category: Category, filename: &str) -> PathBuf {
        self.category_dir(category).join(filename)
    }

    /// Create the category directory and its ownership marker if missing.
    pub fn ensure_category_dir(&self, category: Category) -> Result<PathBuf, AssetError> {
        let dir = self.category_dir(category);
        std::fs::create_dir_all(&dir).map_err(|e| AssetError::DirectoryCreate {
            path: dir.display().to_string(),
            message: e.to_string(),
        })?;

        let marker = dir.join(Self::MARKER_FILE);
        if !marker.exists() {
            std::fs::write(&marker, b"").map_err(|e| AssetError::DirectoryCreate {
                path: marker.display().to_string(),
                message: e.to_string(),
            })?;
        }
        Ok(dir)
    }

    /// Atomically publish `body` as `filename`, replacing prior content.
    /// Returns the final path.
    pub fn publish(
        &self,
        category: Category,
        filename: &str,
        body: &[u8],
    ) -> Result<PathBuf, AssetError> {
        let dir = self.ensure_category_dir(category)?;
        let final_path = dir.join(filename);
        let tmp_path = dir.join(format!("{filename}.tmp"));

        std::fs::write(&tmp_path, body).map_err(|e| AssetError::Write {
            path: tmp_path.display().to_string(),
            message: e.to_string(),
        })?;
        std::fs::rename(&tmp_path, &final_path).map_err(|e| AssetError::Write {
            path: final_path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(final_path)
    }

    /// Public URL for a cached file, version-tagged with its modification
    /// time. None when the file does not exist; the caller falls back to
    /// the original external reference.
    pub fn local_url(&self, category: Category, filename: &str) -> Option<String> {
        let path = self.asset_path(category, filename);
        let ver = modified_time(&path)?;
        Some(format!(
            "{}/{}/{}?ver={}",
            self.public_base,
            category.dir_name(),
            filename,
            ver
        ))
    }

    pub fn exists(&self, category: Category, filename: &str) -> bool {
        self.asset_path(category, filename).exists()
    }

    /// Read a cached stylesheet back as text.
    pub fn read_text(&self, category: Category, filename: &str) -> std::io::Result<String> {
        std::fs::read_to_string(self.asset_path(category, filename))
    }

    /// Remove one cached file; true when something was removed.
    pub fn remove(&self, category: Category, filename: &str) -> std::io::Result<bool> {
        let path = self.asset_path(category, filename);
        if path.exists() {
            std::fs::remove_file(path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Per-category file counts and sizes. Marker and temp files are not
    /// counted.
    pub fn stats(&self) -> Vec<CategoryStats> {
        [Category::Stylesheet, Category::Font, Category::Script]
            .into_iter()
            .map(|category| {
                let mut files = 0;
                let mut bytes = 0;
                if let Ok(entries) = std::fs::read_dir(self.category_dir(category)) {
                    for entry in entries.flatten() {
                        let name = entry.file_name();
                        let name = name.to_string_lossy();
                        if name.starts_with('.') || name.ends_with(".tmp") {
                            continue;
                        }
                        if let Ok(meta) = entry.metadata()
                            && meta.is_file()
                        {
                            files += 1;
                            bytes += meta.len();
                        }
                    }
                }
                CategoryStats {
                    category,
                    files,
                    bytes,
                }
            })
            .collect()
    }

    /// Remove category directories, but only those carrying the ownership
    /// marker. Directories without the marker were not created by this tool
    /// and are left alone.
    pub fn uninstall(&self) -> Result<UninstallReport, AssetError> {
        let mut report = UninstallReport::default();
        for category in [Category::Stylesheet, Category::Font, Category::Script] {
            let dir = self.category_dir(category);
            if !dir.exists() {
                continue;
            }
            if dir.join(Self::MARKER_FILE).exists() {
                std::fs::remove_dir_all(&dir).map_err(|e| AssetError::Write {
                    path: dir.display().to_string(),
                    message: e.to_string(),
                })?;
                report.removed.push(dir);
            } else {
                report.skipped.push(dir);
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (AssetStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(dir.path(), "https://example.com/assets/");
        (store, dir)
    }

    #[test]
    fn test_ensure_category_dir_creates_marker() {
        let (store, _dir) = test_store();
        let dir = store.ensure_category_dir(Category::Font).unwrap();
        assert!(dir.ends_with("fonts"));
        assert!(dir.join(AssetStore::MARKER_FILE).exists());
    }

    #[test]
    fn test_publish_writes_content_and_cleans_temp() {
        let (store, _dir) = test_store();
        let path = store
            .publish(Category::Stylesheet, "abc.css", b"body{}")
            .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "body{}");
        assert!(!path.with_file_name("abc.css.tmp").exists());
    }

    #[test]
    fn test_publish_overwrites_in_place() {
        let (store, _dir) = test_store();
        store
            .publish(Category::Stylesheet, "abc.css", b"old")
            .unwrap();
        let path = store
            .publish(Category::Stylesheet, "abc.css", b"new")
            .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_freshness_window() {
        let (store, _dir) = test_store();
        let path = store
            .publish(Category::Stylesheet, "abc.css", b"body{}")
            .unwrap();

        let now = Utc::now();
        assert!(is_fresh(&path, 7, now));
        assert!(is_fresh(&path, 7, now + chrono::Duration::days(6)));
        assert!(!is_fresh(&path, 7, now + chrono::Duration::days(8)));
    }

    #[test]
    fn test_missing_path_is_never_fresh() {
        let (store, _dir) = test_store();
        let path = store.asset_path(Category::Stylesheet, "missing.css");
        assert!(!is_fresh(&path, 365, Utc::now()));
    }

    #[test]
    fn test_local_url_carries_version() {
        let (store, _dir) = test_store();
        store
            .publish(Category::Font, "f.woff2", b"\0font")
            .unwrap();

        let url = store.local_url(Category::Font, "f.woff2").unwrap();
        assert!(url.starts_with("https://example.com/assets/fonts/f.woff2?ver="));

        let ver: i64 = url.rsplit('=').next().unwrap().parse().unwrap();
        assert!(ver > 0);
    }

    #[test]
    fn test_local_url_none_when_missing() {
        let (store, _dir) = test_store();
        assert!(store.local_url(Category::Script, "nope.js").is_none());
    }

    #[test]
    fn test_remove() {
        let (store, _dir) = test_store();
        store.publish(Category::Script, "x.js", b"1;").unwrap();

        assert!(store.remove(Category::Script, "x.js").unwrap());
        assert!(!store.remove(Category::Script, "x.js").unwrap());
        assert!(!store.exists(Category::Script, "x.js"));
    }

    #[test]
    fn test_stats_skip_marker_and_temp_files() {
        let (store, _dir) = test_store();
        store
            .publish(Category::Stylesheet, "a.css", b"body{}")
            .unwrap();
        store
            .publish(Category::Stylesheet, "b.css", b"h1{}")
            .unwrap();

        let stats = store.stats();
        let css = stats
            .iter()
            .find(|s| s.category == Category::Stylesheet)
            .unwrap();
        assert_eq!(css.files, 2);
        assert!(css.bytes > 0);

        let js = stats.iter().find(|s| s.category == Category::Script).unwrap();
        assert_eq!(js.files, 0);
    }

    #[test]
    fn test_uninstall_removes_only_marked_dirs() {
        let (store, dir) = test_store();
        store.publish(Category::Stylesheet, "a.css", b"body{}").unwrap();

        // A js dir that exists but was not created by us: no marker.
        let foreign = dir.path().join("js");
        std::fs::create_dir_all(&foreign).unwrap();
        std::fs::write(foreign.join("keep.js"), b"1;").unwrap();

        let report = store.uninstall().unwrap();
        assert_eq!(report.removed.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(!dir.path().join("css").exists());
        assert!(foreign.join("keep.js").exists());
    }
}
