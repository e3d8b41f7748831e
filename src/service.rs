//! Asset localization service
//!
//! `Mirror` owns the whole pipeline: classify a reference, fetch it once,
//! gate it by content type, persist it under a hashed filename, rewrite
//! stylesheet internals to point at local copies, and answer read-path
//! lookups without touching the network. Dependencies (storage, registry,
//! fetcher, clock) are injected at construction so tests can swap in
//! doubles for the filesystem, the network, and time.

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, warn};
use tokio::sync::Mutex;
use url::Url;

use crate::category::Category;
use crate::config::{Config, ExpirationDays};
use crate::css;
use crate::error::{AssetError, Error, Result};
use crate::fetch::Fetcher;
use crate::manifest::{HandleAction, HandleOutcome, Manifest, RegistrationPlan};
use crate::store::registry::{AssetRecord, ErrorRecord, Registry, Severity};
use crate::store::{self, AssetStore, CategoryStats, UninstallReport};
use crate::urls;

/// Nesting levels of `@import` resolved before truncating.
pub const MAX_IMPORT_DEPTH: u32 = 5;

/// Concurrent script fetches within one pass. Stylesheets stay sequential
/// because recursive resolution threads one visited set through the tree.
const SCRIPT_FETCH_WINDOW: usize = 4;

/// Time source, injectable so freshness tests never sleep.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Result of the fetch-and-persist primitive.
#[derive(Debug)]
pub enum CacheOutcome {
    /// Cached copy was fresh; no network touched.
    Fresh { local_url: String },
    /// Fetched from upstream and published.
    Fetched {
        local_url: String,
        filename: String,
        body: Vec<u8>,
    },
}

impl CacheOutcome {
    pub fn local_url(&self) -> &str {
        match self {
            CacheOutcome::Fresh { local_url } => local_url,
            CacheOutcome::Fetched { local_url, .. } => local_url,
        }
    }

    pub fn was_fetched(&self) -> bool {
        matches!(self, CacheOutcome::Fetched { .. })
    }
}

/// Storage and registry numbers for the status display.
#[derive(Debug, serde::Serialize)]
pub struct StatusReport {
    pub storage_root: std::path::PathBuf,
    pub categories: Vec<CategoryStats>,
    pub tracked_assets: usize,
    pub error_count: usize,
    pub pending_tasks: usize,
}

type ScriptFuture<'a> = Pin<Box<dyn Future<Output = (usize, Option<String>)> + Send + 'a>>;

/// The localization service.
pub struct Mirror {
    store: AssetStore,
    registry: Mutex<Registry>,
    fetcher: Arc<dyn Fetcher>,
    clock: Arc<dyn Clock>,
    expiration: ExpirationDays,
    site_host: String,
    self_host_css: bool,
    self_host_js: bool,
}

impl Mirror {
    pub fn new(
        config: &Config,
        store: AssetStore,
        registry: Registry,
        fetcher: Arc<dyn Fetcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            registry: Mutex::new(registry),
            fetcher,
            clock,
            expiration: config.cache_expiration_days,
            site_host: config.site_host.clone().unwrap_or_default(),
            self_host_css: config.self_host_css,
            self_host_js: config.self_host_js,
        }
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    pub fn site_host(&self) -> &str {
        &self.site_host
    }

    pub fn wants(&self, category: Category) -> bool {
        match category {
            Category::Stylesheet => self.self_host_css,
            Category::Script => self.self_host_js,
            Category::Font => true,
        }
    }

    /// Create the category directories, markers, and registry tables.
    pub async fn provision(&self) -> Result<()> {
        for category in [Category::Stylesheet, Category::Font, Category::Script] {
            self.store.ensure_category_dir(category)?;
        }
        // Opening the registry already created its tables; touch it so a
        // read-only storage root fails here rather than mid-sync.
        self.registry.lock().await.asset_count()?;
        Ok(())
    }

    /// The fetch-and-persist primitive shared by every category.
    ///
    /// Fast path: a fresh cached copy short-circuits before any network
    /// I/O. Otherwise the body is fetched, gated by status / emptiness /
    /// content type, atomically published, and recorded in the registry.
    pub async fn fetch_and_cache(
        &self,
        url: &str,
        category: Category,
        force: bool,
    ) -> Result<CacheOutcome> {
        let parsed = Url::parse(url).map_err(|e| {
            Error::Asset(AssetError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            })
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AssetError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme `{}`", parsed.scheme()),
            }
            .into());
        }

        let filename = store::hashed_filename(url, category);
        let path = self.store.asset_path(category, &filename);

        if !force
            && store::is_fresh(&path, self.expiration.for_category(category), self.clock.now())
            && let Some(local_url) = self.store.local_url(category, &filename)
        {
            debug!("cache hit: {} -> {}", url, filename);
            return Ok(CacheOutcome::Fresh { local_url });
        }

        let asset = self.fetcher.fetch(url).await?;
        if asset.body.is_empty() {
            return Err(AssetError::EmptyContent {
                url: url.to_string(),
            }
            .into());
        }
        if !category.accepts_content_type(&asset.content_type) {
            return Err(AssetError::InvalidContentType {
                url: url.to_string(),
                content_type: asset.content_type.clone(),
                category: category.as_str().to_string(),
            }
            .into());
        }

        self.store.publish(category, &filename, &asset.body)?;
        self.registry
            .lock()
            .await
            .upsert(url, &filename, category)?;

        let local_url = self
            .store
            .local_url(category, &filename)
            .ok_or_else(|| Error::Other(format!("published file vanished: {filename}")))?;

        debug!("cached {} as {}", url, filename);
        Ok(CacheOutcome::Fetched {
            local_url,
            filename,
            body: asset.body,
        })
    }

    /// Localize one external stylesheet and everything it pulls in.
    ///
    /// Returns the local URL, or None when resolution failed; the caller
    /// leaves the original reference live. Failures along the way are
    /// appended to the durable error log.
    pub async fn localize_stylesheet(&self, url: &str, force: bool) -> Option<String> {
        let mut visited = HashSet::new();
        self.resolve_stylesheet(url, force, 0, &mut visited).await
    }

    /// One step of the recursive resolution state machine.
    ///
    /// Order matters: the cycle guard runs before the fetch so revisited
    /// sheets reuse the copy already on disk; the depth gate runs after the
    /// fetch so an over-deep sheet is still cached raw, with its own
    /// imports left external.
    async fn resolve_stylesheet(
        &self,
        url: &str,
        force: bool,
        depth: u32,
        visited: &mut HashSet<String>,
    ) -> Option<String> {
        if visited.contains(url) {
            // Expected on legitimately circular imports; reuse the copy
            // published when the URL was first seen. No log entry.
            let filename = store::hashed_filename(url, Category::Stylesheet);
            return self.store.local_url(Category::Stylesheet, &filename);
        }

        let (local_url, filename, body) =
            match self.fetch_and_cache(url, Category::Stylesheet, force).await {
                Ok(CacheOutcome::Fresh { local_url }) => {
                    // Fresh copies were fully rewritten when first cached;
                    // no rescan, no network.
                    return Some(local_url);
                }
                Ok(CacheOutcome::Fetched {
                    local_url,
                    filename,
                    body,
                }) => (local_url, filename, body),
                Err(err) => {
                    self.log_failure(&err).await;
                    return None;
                }
            };

        if depth >= MAX_IMPORT_DEPTH {
            self.record(
                Severity::Warning,
                &format!(
                    "Import depth limit ({MAX_IMPORT_DEPTH}) reached at `{url}`; nested imports left external"
                ),
            )
            .await;
            return Some(local_url);
        }

        visited.insert(url.to_string());

        let mut text = String::from_utf8_lossy(&body).into_owned();

        for import in css::extract_imports(&text) {
            let absolute = urls::resolve_absolute(&import.target, url);
            let child = Box::pin(self.resolve_stylesheet(&absolute, force, depth + 1, visited))
                .await;
            // On failure (already logged deeper in the tree) the original
            // statement stays live.
            if let Some(child_local) = child {
                text = text.replace(&import.statement, &import.rewritten(&child_local));
            }
        }

        text = self.rewrite_fonts(text, url, force).await;

        match self.store.publish(Category::Stylesheet, &filename, text.as_bytes()) {
            Ok(_) => self
                .store
                .local_url(Category::Stylesheet, &filename)
                .or(Some(local_url)),
            Err(err) => {
                // The raw copy from the fetch is still on disk and serves.
                self.log_failure(&err.into()).await;
                Some(local_url)
            }
        }
    }

    /// Fetch every font referenced by `text` and substitute local URLs.
    ///
    /// Substitution is textual: each original reference string is replaced
    /// everywhere it occurs. A reference that also appears outside a
    /// `url()` context gets replaced there too; known limitation.
    async fn rewrite_fonts(&self, mut text: String, base_url: &str, force: bool) -> String {
        for reference in css::extract_font_urls(&text) {
            let absolute = urls::resolve_absolute(&reference, base_url);
            match self.fetch_and_cache(&absolute, Category::Font, force).await {
                Ok(outcome) => {
                    text = text.replace(&reference, outcome.local_url());
                }
                Err(err) => self.log_failure(&err).await,
            }
        }
        text
    }

    /// Localize one external script.
    pub async fn localize_script(&self, url: &str, force: bool) -> Option<String> {
        match self.fetch_and_cache(url, Category::Script, force).await {
            Ok(outcome) => Some(outcome.local_url().to_string()),
            Err(err) => {
                self.log_failure(&err).await;
                None
            }
        }
    }

    /// Localize one font outside stylesheet rewriting (queue path).
    pub async fn localize_font(&self, url: &str, force: bool) -> Option<String> {
        match self.fetch_and_cache(url, Category::Font, force).await {
            Ok(outcome) => Some(outcome.local_url().to_string()),
            Err(err) => {
                self.log_failure(&err).await;
                None
            }
        }
    }

    /// One full resolution pass over a manifest.
    pub async fn sync(&self, manifest: &Manifest, force: bool) -> Result<RegistrationPlan> {
        let mut plan = RegistrationPlan::default();

        for style in &manifest.styles {
            let outcome = if !self.self_host_css {
                self.skip(style.handle.clone(), Category::Stylesheet, &style.src, HandleAction::Disabled)
            } else if !urls::is_external(&style.src, &self.site_host) {
                self.skip(style.handle.clone(), Category::Stylesheet, &style.src, HandleAction::Local)
            } else {
                match self.localize_stylesheet(&style.src, force).await {
                    Some(local) => HandleOutcome {
                        handle: style.handle.clone(),
                        category: Category::Stylesheet,
                        original_src: style.src.clone(),
                        local_src: Some(local),
                        action: HandleAction::Localized,
                        detail: None,
                    },
                    None => self.failed(style.handle.clone(), Category::Stylesheet, &style.src),
                }
            };
            plan.push(outcome);
        }

        let script_results = self.fetch_scripts(manifest, force).await;
        for (idx, script) in manifest.scripts.iter().enumerate() {
            let outcome = if !self.self_host_js {
                self.skip(script.handle.clone(), Category::Script, &script.src, HandleAction::Disabled)
            } else if !urls::is_external(&script.src, &self.site_host) {
                self.skip(script.handle.clone(), Category::Script, &script.src, HandleAction::Local)
            } else {
                match script_results.get(&idx).cloned().flatten() {
                    Some(local) => HandleOutcome {
                        handle: script.handle.clone(),
                        category: Category::Script,
                        original_src: script.src.clone(),
                        local_src: Some(local),
                        action: HandleAction::Localized,
                        detail: None,
                    },
                    None => self.failed(script.handle.clone(), Category::Script, &script.src),
                }
            };
            plan.push(outcome);
        }

        Ok(plan)
    }

    /// Fetch external scripts a few at a time, keyed by manifest index.
    async fn fetch_scripts(&self, manifest: &Manifest, force: bool) -> HashMap<usize, Option<String>> {
        let mut results = HashMap::new();
        if !self.self_host_js {
            return results;
        }

        let mut pending: VecDeque<(usize, String)> = manifest
            .scripts
            .iter()
            .enumerate()
            .filter(|(_, s)| urls::is_external(&s.src, &self.site_host))
            .map(|(idx, s)| (idx, s.src.clone()))
            .collect();

        let mut in_flight: FuturesUnordered<ScriptFuture<'_>> = FuturesUnordered::new();

        while !pending.is_empty() || !in_flight.is_empty() {
            while in_flight.len() < SCRIPT_FETCH_WINDOW {
                let Some((idx, src)) = pending.pop_front() else {
                    break;
                };
                in_flight.push(Box::pin(async move {
                    (idx, self.localize_script(&src, force).await)
                }));
            }
            if let Some((idx, local)) = in_flight.next().await {
                results.insert(idx, local);
            }
        }
        results
    }

    /// Read-path substitution: registry and filesystem probes only, no
    /// network I/O. Handles without a usable cached copy keep their
    /// original source.
    pub async fn render(&self, manifest: &Manifest) -> Result<RegistrationPlan> {
        let mut plan = RegistrationPlan::default();

        for style in &manifest.styles {
            plan.push(
                self.render_one(&style.handle, &style.src, Category::Stylesheet)
                    .await?,
            );
        }
        for script in &manifest.scripts {
            plan.push(
                self.render_one(&script.handle, &script.src, Category::Script)
                    .await?,
            );
        }
        Ok(plan)
    }

    async fn render_one(
        &self,
        handle: &str,
        src: &str,
        category: Category,
    ) -> Result<HandleOutcome> {
        if !self.wants(category) {
            return Ok(self.skip(handle.to_string(), category, src, HandleAction::Disabled));
        }
        if !urls::is_external(src, &self.site_host) {
            return Ok(self.skip(handle.to_string(), category, src, HandleAction::Local));
        }
        match self.cached_local_url(src, category).await? {
            Some(local) => Ok(HandleOutcome {
                handle: handle.to_string(),
                category,
                original_src: src.to_string(),
                local_src: Some(local),
                action: HandleAction::Localized,
                detail: None,
            }),
            None => Ok(HandleOutcome {
                handle: handle.to_string(),
                category,
                original_src: src.to_string(),
                local_src: None,
                action: HandleAction::Failed,
                detail: Some("no cached copy yet".to_string()),
            }),
        }
    }

    /// Local URL for an already-cached asset, if its file exists. Consults
    /// the registry first, falling back to the deterministic hash so a
    /// rebuilt registry still finds files on disk.
    pub async fn cached_local_url(&self, url: &str, category: Category) -> Result<Option<String>> {
        let filename = match self.registry.lock().await.lookup(url, category)? {
            Some(filename) => filename,
            None => store::hashed_filename(url, category),
        };
        Ok(self.store.local_url(category, &filename))
    }

    pub async fn list_assets(&self) -> Result<Vec<AssetRecord>> {
        Ok(self.registry.lock().await.list_all()?)
    }

    /// Drop one asset: registry row and cached file.
    pub async fn delete_asset(&self, url: &str, category: Category) -> Result<bool> {
        let registry = self.registry.lock().await;
        let filename = match registry.lookup(url, category)? {
            Some(filename) => filename,
            None => store::hashed_filename(url, category),
        };
        let row_removed = registry.delete(url, category)?;
        drop(registry);
        let file_removed = self.store.remove(category, &filename)?;
        Ok(row_removed || file_removed)
    }

    pub async fn list_errors(&self, limit: usize) -> Result<Vec<ErrorRecord>> {
        Ok(self.registry.lock().await.list_errors(limit)?)
    }

    pub async fn clear_errors(&self) -> Result<usize> {
        Ok(self.registry.lock().await.clear_errors()?)
    }

    pub async fn status(&self) -> Result<StatusReport> {
        let registry = self.registry.lock().await;
        Ok(StatusReport {
            storage_root: self.store.root().to_path_buf(),
            categories: self.store.stats(),
            tracked_assets: registry.asset_count()?,
            error_count: registry.error_count()?,
            pending_tasks: registry.pending_task_count()?,
        })
    }

    /// Remove marker-bearing category directories and the registry
    /// database. Consumes the service; the registry connection is closed
    /// before the database file is unlinked.
    pub fn uninstall(self) -> Result<UninstallReport> {
        let Mirror {
            store, registry, ..
        } = self;
        drop(registry);

        let report = store.uninstall()?;
        let db_path = store.root().join(Registry::DB_FILE);
        if db_path.exists() {
            std::fs::remove_file(&db_path)?;
        }
        Ok(report)
    }

    pub(crate) async fn registry_guard(&self) -> tokio::sync::MutexGuard<'_, Registry> {
        self.registry.lock().await
    }

    pub(crate) async fn record(&self, severity: Severity, message: &str) {
        debug!("recording {}: {}", severity, message);
        if let Err(err) = self.registry.lock().await.log_error(severity, message) {
            warn!("Failed to record error: {}", err);
        }
    }

    async fn log_failure(&self, err: &Error) {
        warn!("{}", err);
        self.record(Severity::Error, &err.to_string()).await;
    }

    fn skip(
        &self,
        handle: String,
        category: Category,
        src: &str,
        action: HandleAction,
    ) -> HandleOutcome {
        HandleOutcome {
            handle,
            category,
            original_src: src.to_string(),
            local_src: None,
            action,
            detail: None,
        }
    }

    fn failed(&self, handle: String, category: Category, src: &str) -> HandleOutcome {
        HandleOutcome {
            handle,
            category,
            original_src: src.to_string(),
            local_src: None,
            action: HandleAction::Failed,
            detail: Some("see error log".to_string()),
        }
    }
}
