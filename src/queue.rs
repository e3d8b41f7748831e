//! Deferred localization queue
//!
//! The inline path resolves a stylesheet tree in one recursive pass. In
//! deferred mode the same work is flattened into durable tasks: a sync
//! enqueues one task per external handle, draining the queue fans out
//! child tasks as stylesheet bodies are scanned, and a final registry-
//! driven pass rewrites cached stylesheets against whatever local copies
//! exist by then. Rows survive restarts; freshness makes a re-drained
//! task a no-op instead of a second download.

use log::{debug, warn};

use crate::category::Category;
use crate::css;
use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::service::{CacheOutcome, MAX_IMPORT_DEPTH, Mirror};
use crate::store::registry::{Registry, Severity, TaskRow};
use crate::urls;

/// Attempts per task before a transient failure is dropped for good.
pub const MAX_RETRIES: u32 = 3;

/// A unit of deferred work. Persisted flat (kind label, URL, depth) and
/// decoded back exactly once, when the row is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Stylesheet { depth: u32 },
    Script,
    Font,
}

impl TaskKind {
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::Stylesheet { .. } => "stylesheet",
            TaskKind::Script => "script",
            TaskKind::Font => "font",
        }
    }

    pub fn depth(&self) -> u32 {
        match self {
            TaskKind::Stylesheet { depth } => *depth,
            TaskKind::Script | TaskKind::Font => 0,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            TaskKind::Stylesheet { .. } => Category::Stylesheet,
            TaskKind::Script => Category::Script,
            TaskKind::Font => Category::Font,
        }
    }

    /// None for rows written by a kind this build does not know.
    pub fn decode(row: &TaskRow) -> Option<TaskKind> {
        match row.kind.as_str() {
            "stylesheet" => Some(TaskKind::Stylesheet { depth: row.depth }),
            "script" => Some(TaskKind::Script),
            "font" => Some(TaskKind::Font),
            _ => None,
        }
    }
}

/// What one drain accomplished.
#[derive(Debug, Default, serde::Serialize)]
pub struct DrainSummary {
    /// Tasks taken off the queue.
    pub processed: usize,
    /// Tasks that hit the network and cached a body.
    pub fetched: usize,
    /// Transient failures put back for another attempt.
    pub requeued: usize,
    /// Tasks dropped: permanent failures, exhausted retries, unknown kinds.
    pub dropped: usize,
    /// Stylesheets updated by the rewrite pass.
    pub rewritten: usize,
}

/// Deferred-mode sync: enqueue the manifest's external handles, drain the
/// queue, then rewrite every cached stylesheet against the registry.
pub async fn run(mirror: &Mirror, manifest: &Manifest, force: bool) -> Result<DrainSummary> {
    let queued = enqueue_manifest(mirror, manifest).await?;
    debug!("queued {} tasks", queued);

    let mut summary = drain(mirror, force).await?;
    summary.rewritten = rewrite_cached(mirror).await?;
    Ok(summary)
}

/// Queue one task per external handle the configuration wants localized.
/// Returns how many rows were actually inserted; pending duplicates on
/// the same (kind, URL) are skipped.
pub async fn enqueue_manifest(mirror: &Mirror, manifest: &Manifest) -> Result<usize> {
    let mut queued = 0;
    let registry = mirror.registry_guard().await;

    if mirror.wants(Category::Stylesheet) {
        for style in &manifest.styles {
            if urls::is_external(&style.src, mirror.site_host())
                && enqueue(&registry, TaskKind::Stylesheet { depth: 0 }, &style.src)?
            {
                queued += 1;
            }
        }
    }
    if mirror.wants(Category::Script) {
        for script in &manifest.scripts {
            if urls::is_external(&script.src, mirror.site_host())
                && enqueue(&registry, TaskKind::Script, &script.src)?
            {
                queued += 1;
            }
        }
    }
    Ok(queued)
}

/// Pop and process tasks until the queue is empty.
///
/// Transient failures go back on the queue with a bumped retry counter
/// until [`MAX_RETRIES`] is spent; everything else is dropped and logged.
/// Child tasks enqueued while draining are picked up in the same loop.
pub async fn drain(mirror: &Mirror, force: bool) -> Result<DrainSummary> {
    let mut summary = DrainSummary::default();

    loop {
        let row = { mirror.registry_guard().await.take_next_task()? };
        let Some(row) = row else {
            break;
        };
        summary.processed += 1;

        let Some(kind) = TaskKind::decode(&row) else {
            warn!("Dropping queued task with unknown kind `{}`", row.kind);
            summary.dropped += 1;
            continue;
        };

        match process(mirror, kind, &row.url, force).await {
            Ok(fetched) => {
                if fetched {
                    summary.fetched += 1;
                }
            }
            Err(Error::Asset(err)) if err.is_transient() && row.retries < MAX_RETRIES => {
                debug!("Requeueing `{}` (retry {})", row.url, row.retries + 1);
                mirror
                    .registry_guard()
                    .await
                    .requeue_task(&row.kind, &row.url, row.depth, row.retries + 1)?;
                summary.requeued += 1;
            }
            Err(err) => {
                mirror.record(Severity::Error, &err.to_string()).await;
                summary.dropped += 1;
            }
        }
    }
    Ok(summary)
}

/// One task: fetch and cache, and for a freshly fetched stylesheet under
/// the depth bound, scan its body and enqueue what it references. A fresh
/// cached copy was scanned when first processed, so it fans out nothing.
async fn process(mirror: &Mirror, kind: TaskKind, url: &str, force: bool) -> Result<bool> {
    let outcome = mirror.fetch_and_cache(url, kind.category(), force).await?;
    let CacheOutcome::Fetched { body, .. } = outcome else {
        return Ok(false);
    };

    if let TaskKind::Stylesheet { depth } = kind {
        if depth >= MAX_IMPORT_DEPTH {
            mirror
                .record(
                    Severity::Warning,
                    &format!(
                        "Import depth limit ({MAX_IMPORT_DEPTH}) reached at `{url}`; nested imports left external"
                    ),
                )
                .await;
            return Ok(true);
        }

        let text = String::from_utf8_lossy(&body);
        let registry = mirror.registry_guard().await;
        for import in css::extract_imports(&text) {
            let absolute = urls::resolve_absolute(&import.target, url);
            enqueue(
                &registry,
                TaskKind::Stylesheet { depth: depth + 1 },
                &absolute,
            )?;
        }
        for font in css::extract_font_urls(&text) {
            let absolute = urls::resolve_absolute(&font, url);
            enqueue(&registry, TaskKind::Font, &absolute)?;
        }
    }
    Ok(true)
}

/// Rewrite pass over every cached stylesheet: substitute local URLs for
/// any import or font reference that has a cached copy by now. References
/// without one are left as they are, so the pass is safe to repeat.
pub async fn rewrite_cached(mirror: &Mirror) -> Result<usize> {
    let mut rewritten = 0;

    for record in mirror.list_assets().await? {
        if record.category != Category::Stylesheet {
            continue;
        }
        let original = match mirror.store().read_text(Category::Stylesheet, &record.filename) {
            Ok(text) => text,
            Err(err) => {
                warn!("Skipping `{}`: {}", record.filename, err);
                continue;
            }
        };

        let mut text = original.clone();
        for import in css::extract_imports(&text) {
            let absolute = urls::resolve_absolute(&import.target, &record.original_url);
            if let Some(local) = mirror
                .cached_local_url(&absolute, Category::Stylesheet)
                .await?
            {
                text = text.replace(&import.statement, &import.rewritten(&local));
            }
        }
        for font in css::extract_font_urls(&text) {
            let absolute = urls::resolve_absolute(&font, &record.original_url);
            if let Some(local) = mirror.cached_local_url(&absolute, Category::Font).await? {
                text = text.replace(&font, &local);
            }
        }

        if text != original {
            mirror
                .store()
                .publish(Category::Stylesheet, &record.filename, text.as_bytes())?;
            rewritten += 1;
        }
    }
    Ok(rewritten)
}

fn enqueue(registry: &Registry, kind: TaskKind, url: &str) -> Result<bool> {
    Ok(registry.enqueue_task(kind.label(), url, kind.depth())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::AssetError;
    use crate::fetch::MockFetcher;
    use crate::manifest::{ScriptHandle, StyleHandle};
    use crate::service::SystemClock;
    use crate::store::{self, AssetStore, Registry as StoreRegistry};
    use std::sync::Arc;
    use tempfile::TempDir;

    const BASE: &str = "https://example.com/assets";

    fn mirror(dir: &TempDir, fetcher: &MockFetcher) -> Mirror {
        let config = Config {
            site_host: Some("example.com".to_string()),
            public_base: Some(BASE.to_string()),
            self_host_js: true,
            ..Config::default()
        };
        let store = AssetStore::new(dir.path(), BASE);
        let registry = StoreRegistry::open_at(&dir.path().join(StoreRegistry::DB_FILE)).unwrap();
        Mirror::new(
            &config,
            store,
            registry,
            Arc::new(fetcher.clone()),
            Arc::new(SystemClock),
        )
    }

    fn styles_manifest(sources: &[(&str, &str)]) -> Manifest {
        Manifest {
            styles: sources
                .iter()
                .map(|(handle, src)| StyleHandle {
                    handle: handle.to_string(),
                    src: src.to_string(),
                    deps: vec![],
                    version: None,
                    media: "all".to_string(),
                })
                .collect(),
            scripts: vec![],
        }
    }

    fn scripts_manifest(sources: &[(&str, &str)]) -> Manifest {
        Manifest {
            styles: vec![],
            scripts: sources
                .iter()
                .map(|(handle, src)| ScriptHandle {
                    handle: handle.to_string(),
                    src: src.to_string(),
                    deps: vec![],
                    version: None,
                    position: Default::default(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_task_kind_round_trip() {
        let row = TaskRow {
            id: 1,
            kind: "stylesheet".to_string(),
            url: "https://cdn.example/a.css".to_string(),
            depth: 3,
            retries: 0,
        };
        assert_eq!(
            TaskKind::decode(&row),
            Some(TaskKind::Stylesheet { depth: 3 })
        );

        let row = TaskRow {
            kind: "font".to_string(),
            depth: 0,
            ..row
        };
        assert_eq!(TaskKind::decode(&row), Some(TaskKind::Font));

        let row = TaskRow {
            kind: "image".to_string(),
            ..row
        };
        assert_eq!(TaskKind::decode(&row), None);
    }

    #[tokio::test]
    async fn test_deferred_run_localizes_whole_tree() {
        let dir = TempDir::new().unwrap();
        let fetcher = MockFetcher::new();
        fetcher
            .route_css(
                "https://cdn.example/a.css",
                "@import url(\"b.css\");\n@font-face{src:url(f.woff2);}",
            )
            .await;
        fetcher
            .route_css("https://cdn.example/b.css", "@font-face{src:url(g.woff2);}")
            .await;
        fetcher.route_font("https://cdn.example/f.woff2").await;
        fetcher.route_font("https://cdn.example/g.woff2").await;
        let m = mirror(&dir, &fetcher);

        let manifest = styles_manifest(&[("theme", "https://cdn.example/a.css")]);
        let summary = run(&m, &manifest, false).await.unwrap();

        assert_eq!(summary.processed, 4);
        assert_eq!(summary.fetched, 4);
        assert_eq!(summary.dropped, 0);
        assert_eq!(summary.rewritten, 2);
        assert_eq!(m.list_assets().await.unwrap().len(), 4);

        let a_name = store::hashed_filename("https://cdn.example/a.css", Category::Stylesheet);
        let a_text = m.store().read_text(Category::Stylesheet, &a_name).unwrap();
        let b_name = store::hashed_filename("https://cdn.example/b.css", Category::Stylesheet);
        let b_text = m.store().read_text(Category::Stylesheet, &b_name).unwrap();

        assert!(a_text.contains(&format!("https://example.com/assets/css/{b_name}")));
        assert!(a_text.contains("https://example.com/assets/fonts/"));
        assert!(!a_text.contains("url(\"b.css\")"));
        assert!(b_text.contains("https://example.com/assets/fonts/"));
        assert!(!b_text.contains("url(g.woff2)"));
    }

    #[tokio::test]
    async fn test_transient_failure_retried_then_dropped() {
        let dir = TempDir::new().unwrap();
        let fetcher = MockFetcher::new();
        fetcher
            .route_error(
                "https://cdn.example/app.js",
                AssetError::Fetch {
                    url: "https://cdn.example/app.js".to_string(),
                    message: "request timed out".to_string(),
                },
            )
            .await;
        let m = mirror(&dir, &fetcher);

        let manifest = scripts_manifest(&[("app", "https://cdn.example/app.js")]);
        let summary = run(&m, &manifest, false).await.unwrap();

        // Initial attempt plus MAX_RETRIES requeues, then dropped once.
        assert_eq!(fetcher.call_count("https://cdn.example/app.js").await, 4);
        assert_eq!(summary.requeued, 3);
        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.fetched, 0);

        let errors = m.list_errors(10).await.unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("app.js"));
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let dir = TempDir::new().unwrap();
        let fetcher = MockFetcher::new();
        fetcher
            .route("https://cdn.example/a.css", "text/html", b"<html></html>")
            .await;
        let m = mirror(&dir, &fetcher);

        let manifest = styles_manifest(&[("theme", "https://cdn.example/a.css")]);
        let summary = run(&m, &manifest, false).await.unwrap();

        assert_eq!(fetcher.call_count("https://cdn.example/a.css").await, 1);
        assert_eq!(summary.requeued, 0);
        assert_eq!(summary.dropped, 1);
        assert_eq!(m.list_errors(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_depth_bound_holds_in_deferred_mode() {
        let dir = TempDir::new().unwrap();
        let fetcher = MockFetcher::new();
        for i in 1..=7 {
            let body = if i < 7 {
                format!("@import \"a{}.css\";", i + 1)
            } else {
                "body{}".to_string()
            };
            fetcher
                .route_css(&format!("https://cdn.example/a{i}.css"), &body)
                .await;
        }
        let m = mirror(&dir, &fetcher);

        let manifest = styles_manifest(&[("chain", "https://cdn.example/a1.css")]);
        run(&m, &manifest, false).await.unwrap();

        for i in 1..=6 {
            assert_eq!(
                fetcher.call_count(&format!("https://cdn.example/a{i}.css")).await,
                1,
                "a{i}.css"
            );
        }
        assert_eq!(fetcher.call_count("https://cdn.example/a7.css").await, 0);

        let warnings: Vec<_> = m
            .list_errors(10)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.severity == Severity::Warning)
            .collect();
        assert_eq!(warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_shared_reference_fetched_once() {
        let dir = TempDir::new().unwrap();
        let fetcher = MockFetcher::new();
        fetcher
            .route_css("https://cdn.example/a.css", "@font-face{src:url(f.woff2);}")
            .await;
        fetcher
            .route_css("https://cdn.example/b.css", "@font-face{src:url(f.woff2);}")
            .await;
        fetcher.route_font("https://cdn.example/f.woff2").await;
        let m = mirror(&dir, &fetcher);

        let manifest = styles_manifest(&[
            ("a", "https://cdn.example/a.css"),
            ("b", "https://cdn.example/b.css"),
        ]);
        let summary = run(&m, &manifest, false).await.unwrap();

        // Both sheets queue the same font; the pending row dedupes.
        assert_eq!(fetcher.call_count("https://cdn.example/f.woff2").await, 1);
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.rewritten, 2);
    }

    #[tokio::test]
    async fn test_enqueue_is_idempotent_while_pending() {
        let dir = TempDir::new().unwrap();
        let fetcher = MockFetcher::new();
        let m = mirror(&dir, &fetcher);

        let manifest = styles_manifest(&[("theme", "https://cdn.example/a.css")]);
        assert_eq!(enqueue_manifest(&m, &manifest).await.unwrap(), 1);
        assert_eq!(enqueue_manifest(&m, &manifest).await.unwrap(), 0);
        assert_eq!(m.registry_guard().await.pending_task_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_kind_dropped() {
        let dir = TempDir::new().unwrap();
        let fetcher = MockFetcher::new();
        let m = mirror(&dir, &fetcher);

        m.registry_guard()
            .await
            .enqueue_task("image", "https://cdn.example/logo.png", 0)
            .unwrap();

        let summary = drain(&m, false).await.unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.dropped, 1);
        assert_eq!(fetcher.total_calls().await, 0);
    }
}
