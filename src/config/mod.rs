//! Configuration management for cdnless

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::category::Category;
use crate::error::{ConfigError, Result};

/// Freshness windows are clamped into this range, in days.
pub const MIN_EXPIRATION_DAYS: u32 = 1;
pub const MAX_EXPIRATION_DAYS: u32 = 365;

/// Cadence for scheduled sync runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lower")]
pub enum Schedule {
    Hourly,
    TwiceDaily,
    #[default]
    Daily,
    Weekly,
}

impl Schedule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Schedule::Hourly => "hourly",
            Schedule::TwiceDaily => "twicedaily",
            Schedule::Daily => "daily",
            Schedule::Weekly => "weekly",
        }
    }

    /// Tick interval for watch mode.
    pub fn interval(&self) -> Duration {
        const HOUR: u64 = 60 * 60;
        match self {
            Schedule::Hourly => Duration::from_secs(HOUR),
            Schedule::TwiceDaily => Duration::from_secs(12 * HOUR),
            Schedule::Daily => Duration::from_secs(24 * HOUR),
            Schedule::Weekly => Duration::from_secs(7 * 24 * HOUR),
        }
    }
}

/// Per-category freshness windows, in days.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExpirationDays {
    #[serde(default = "default_css_days")]
    pub css: u32,

    #[serde(default = "default_font_days")]
    pub fonts: u32,

    #[serde(default = "default_js_days")]
    pub js: u32,
}

fn default_css_days() -> u32 {
    7
}

fn default_font_days() -> u32 {
    30
}

fn default_js_days() -> u32 {
    7
}

impl Default for ExpirationDays {
    fn default() -> Self {
        Self {
            css: default_css_days(),
            fonts: default_font_days(),
            js: default_js_days(),
        }
    }
}

impl ExpirationDays {
    pub fn for_category(&self, category: Category) -> u32 {
        match category {
            Category::Stylesheet => self.css,
            Category::Script => self.js,
            Category::Font => self.fonts,
        }
    }

    fn clamp_all(&mut self) {
        self.css = self.css.clamp(MIN_EXPIRATION_DAYS, MAX_EXPIRATION_DAYS);
        self.fonts = self.fonts.clamp(MIN_EXPIRATION_DAYS, MAX_EXPIRATION_DAYS);
        self.js = self.js.clamp(MIN_EXPIRATION_DAYS, MAX_EXPIRATION_DAYS);
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// The site's own host. References to any other host are candidates
    /// for mirroring.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_host: Option<String>,

    /// Directory holding mirrored assets and the registry database.
    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,

    /// Public URL prefix the storage root is served from, e.g.
    /// `https://example.com/cdnless-assets`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_base: Option<String>,

    /// Mirror external stylesheets (and everything they pull in).
    #[serde(default = "default_true")]
    pub self_host_css: bool,

    /// Mirror external scripts.
    #[serde(default)]
    pub self_host_js: bool,

    #[serde(default)]
    pub cache_expiration_days: ExpirationDays,

    /// One-shot flag: the next sync run ignores freshness, then clears it.
    #[serde(default)]
    pub force_refresh: bool,

    #[serde(default)]
    pub cron_schedule: Schedule,

    /// Resolve through the persisted task queue instead of inline recursion.
    #[serde(default)]
    pub deferred_queue: bool,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("cdnless-assets")
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_host: None,
            storage_root: default_storage_root(),
            public_base: None,
            self_host_css: true,
            self_host_js: false,
            cache_expiration_days: ExpirationDays::default(),
            force_refresh: false,
            cron_schedule: Schedule::default(),
            deferred_queue: false,
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".cdnless").join("config.yaml"))
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path()?)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound.into());
        }

        let contents = std::fs::read_to_string(&path)?;
        let mut config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        config.normalize();

        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(Self::default_path()?)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(&path, contents)?;

        Ok(())
    }

    /// Bring loaded values into canonical form: windows clamped, host
    /// lowercased and stripped of any scheme, base without a trailing slash.
    pub fn normalize(&mut self) {
        self.cache_expiration_days.clamp_all();

        if let Some(host) = &self.site_host {
            let mut host = host.trim().to_ascii_lowercase();
            if host.contains("://")
                && let Ok(url) = Url::parse(&host)
                && let Some(h) = url.host_str()
            {
                host = h.to_string();
            }
            self.site_host = Some(host.trim_matches('/').to_string());
        }

        if let Some(base) = &self.public_base {
            self.public_base = Some(base.trim().trim_end_matches('/').to_string());
        }
    }

    /// Consume the one-shot force-refresh flag. The caller is responsible
    /// for saving the cleared config.
    pub fn take_force_refresh(&mut self) -> bool {
        std::mem::take(&mut self.force_refresh)
    }

    /// Expiration window for one category, in days.
    pub fn expiration_for(&self, category: Category) -> u32 {
        self.cache_expiration_days.for_category(category)
    }

    /// Validate that a sync pass can run: it needs the site's own host to
    /// classify references and a public base to mint local URLs.
    pub fn validate_for_sync(&self) -> Result<()> {
        match &self.site_host {
            None => return Err(ConfigError::MissingSiteHost.into()),
            Some(host) if host.is_empty() => return Err(ConfigError::MissingSiteHost.into()),
            Some(_) => {}
        }
        match &self.public_base {
            None => Err(ConfigError::Invalid(
                "public_base is not set; mirrored assets need a public URL prefix".to_string(),
            )
            .into()),
            Some(base) if Url::parse(base).is_err() => Err(ConfigError::Invalid(format!(
                "public_base `{base}` is not a valid URL"
            ))
            .into()),
            Some(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.site_host.is_none());
        assert!(config.self_host_css);
        assert!(!config.self_host_js);
        assert_eq!(config.cache_expiration_days.css, 7);
        assert_eq!(config.cache_expiration_days.fonts, 30);
        assert_eq!(config.cache_expiration_days.js, 7);
        assert_eq!(config.cron_schedule, Schedule::Daily);
        assert!(!config.force_refresh);
        assert!(!config.deferred_queue);
    }

    #[test]
    fn test_expiration_clamping() {
        let mut config = Config::default();
        config.cache_expiration_days.css = 0;
        config.cache_expiration_days.fonts = 4000;
        config.normalize();

        assert_eq!(config.cache_expiration_days.css, 1);
        assert_eq!(config.cache_expiration_days.fonts, 365);
        assert_eq!(config.cache_expiration_days.js, 7);
    }

    #[test]
    fn test_expiration_per_category() {
        let config = Config::default();
        assert_eq!(config.expiration_for(Category::Stylesheet), 7);
        assert_eq!(config.expiration_for(Category::Script), 7);
        assert_eq!(config.expiration_for(Category::Font), 30);
    }

    #[test]
    fn test_site_host_normalization() {
        let mut config = Config::default();
        config.site_host = Some("HTTPS://Example.COM/".to_string());
        config.normalize();
        assert_eq!(config.site_host.as_deref(), Some("example.com"));

        let mut config = Config::default();
        config.site_host = Some("Example.com".to_string());
        config.normalize();
        assert_eq!(config.site_host.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_public_base_trailing_slash_trimmed() {
        let mut config = Config::default();
        config.public_base = Some("https://example.com/assets///".to_string());
        config.normalize();
        assert_eq!(
            config.public_base.as_deref(),
            Some("https://example.com/assets")
        );
    }

    #[test]
    fn test_take_force_refresh_is_one_shot() {
        let mut config = Config {
            force_refresh: true,
            ..Config::default()
        };
        assert!(config.take_force_refresh());
        assert!(!config.force_refresh);
        assert!(!config.take_force_refresh());
    }

    #[test]
    fn test_schedule_intervals() {
        assert_eq!(Schedule::Hourly.interval(), Duration::from_secs(3600));
        assert_eq!(Schedule::TwiceDaily.interval(), Duration::from_secs(12 * 3600));
        assert_eq!(Schedule::Daily.interval(), Duration::from_secs(24 * 3600));
        assert_eq!(Schedule::Weekly.interval(), Duration::from_secs(7 * 24 * 3600));
    }

    #[test]
    fn test_schedule_serde_names() {
        let yaml = "cron_schedule: twicedaily\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.cron_schedule, Schedule::TwiceDaily);
        assert_eq!(config.cron_schedule.as_str(), "twicedaily");
    }

    #[test]
    fn test_validate_for_sync() {
        let mut config = Config::default();
        assert!(config.validate_for_sync().is_err());

        config.site_host = Some("example.com".to_string());
        assert!(config.validate_for_sync().is_err());

        config.public_base = Some("https://example.com/assets".to_string());
        assert!(config.validate_for_sync().is_ok());

        config.public_base = Some("not a url".to_string());
        assert!(config.validate_for_sync().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = Config::default();
        config.site_host = Some("example.com".to_string());
        config.public_base = Some("https://example.com/assets".to_string());
        config.cron_schedule = Schedule::Weekly;
        config.save_to(path.clone()).unwrap();

        let loaded = Config::load_from(path).unwrap();
        assert_eq!(loaded.site_host.as_deref(), Some("example.com"));
        assert_eq!(loaded.cron_schedule, Schedule::Weekly);
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let result = Config::load_from(dir.path().join("nope.yaml"));
        assert!(matches!(
            result,
            Err(crate::error::Error::Config(ConfigError::NotFound))
        ));
    }
}
