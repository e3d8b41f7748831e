//! Command execution context
//!
//! Provides a unified context for command execution, eliminating boilerplate
//! for config loading, storage setup, and service construction.

use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::error::Result;
use crate::fetch::HttpFetcher;
use crate::service::{Mirror, SystemClock};
use crate::store::{AssetStore, Registry};

/// Context for command execution containing config and runtime options.
pub struct CommandContext {
    /// Loaded and normalized configuration
    pub config: Config,
    /// Output format preference
    pub format: OutputFormat,
    /// Where the config came from, so mutations land back in the same file
    config_path: Option<PathBuf>,
}

impl CommandContext {
    /// Load configuration from `config_path` (or the default location).
    pub fn new(format: OutputFormat, config_path: Option<&str>) -> Result<Self> {
        let config = match config_path {
            Some(path) => Config::load_from(PathBuf::from(path))?,
            None => Config::load()?,
        };
        Ok(Self {
            config,
            format,
            config_path: config_path.map(PathBuf::from),
        })
    }

    /// Where the active config file lives.
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Config::default_path(),
        }
    }

    /// Persist the (possibly mutated) config back to where it was loaded.
    pub fn save_config(&self) -> Result<()> {
        self.config.save_to(self.config_path()?)
    }

    /// Construct the localization service from the loaded config.
    ///
    /// Commands that hit the network should call
    /// [`Config::validate_for_sync`] first; read-only commands work with an
    /// unset public base, they just mint no local URLs.
    pub fn mirror(&self) -> Result<Mirror> {
        let public_base = self.config.public_base.clone().unwrap_or_default();
        let store = AssetStore::new(&self.config.storage_root, &public_base);
        let registry = Registry::open_at(&self.config.storage_root.join(Registry::DB_FILE))?;
        Ok(Mirror::new(
            &self.config,
            store,
            registry,
            Arc::new(HttpFetcher::new()?),
            Arc::new(SystemClock),
        ))
    }
}
