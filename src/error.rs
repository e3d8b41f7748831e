//! Error types for the cdnless CLI

use thiserror::Error;

/// Result type alias for cdnless operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Interactive prompt error: {0}")]
    Dialoguer(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Operation failed: {0}")]
    Other(String),
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        Error::Dialoguer(err.to_string())
    }
}

/// Failures while localizing a single remote asset.
///
/// Every variant names the URL it concerns; the service layer appends these
/// to the durable error log and then degrades to the original external
/// reference, so a failed asset never breaks the page that uses it.
#[derive(Debug, Clone, Error)]
pub enum AssetError {
    #[error("Invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to fetch `{url}`: {message}")]
    Fetch { url: String, message: String },

    #[error("HTTP {status} fetching `{url}`")]
    Http { url: String, status: u16 },

    #[error("Empty response body from `{url}`")]
    EmptyContent { url: String },

    #[error("`{url}` served content type `{content_type}`, which is not allowed for {category} assets")]
    InvalidContentType {
        url: String,
        content_type: String,
        category: String,
    },

    #[error("Failed to create directory `{path}`: {message}")]
    DirectoryCreate { path: String, message: String },

    #[error("Failed to write `{path}`: {message}")]
    Write { path: String, message: String },
}

impl AssetError {
    /// Transport and server failures may succeed on a later attempt;
    /// validation failures will not.
    pub fn is_transient(&self) -> bool {
        matches!(self, AssetError::Fetch { .. } | AssetError::Http { .. })
    }
}

impl From<reqwest::Error> for AssetError {
    fn from(err: reqwest::Error) -> Self {
        let url = err.url().map(|u| u.to_string()).unwrap_or_default();
        if err.is_timeout() {
            AssetError::Fetch {
                url,
                message: "request timed out".to_string(),
            }
        } else if err.is_connect() {
            AssetError::Fetch {
                url,
                message: "connection failed".to_string(),
            }
        } else {
            AssetError::Fetch {
                url,
                message: err.to_string(),
            }
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found. Run `cdnless init` to set up.")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),

    #[error("Site host not configured. Run `cdnless init` to set up your site.")]
    MissingSiteHost,
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Registry and on-disk storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Registry database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Storage I/O error: {0}")]
    Io(String),
}
