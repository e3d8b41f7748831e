//! Remote asset transport

use async_trait::async_trait;

use crate::error::AssetError;

#[cfg(test)]
pub mod mock;

pub mod http;

#[cfg(test)]
#[allow(unused_imports)]
pub use mock::MockFetcher;
pub use http::HttpFetcher;

/// One successfully fetched remote asset: the raw body plus the declared
/// content type (empty when the upstream sent none).
#[derive(Debug, Clone)]
pub struct RemoteAsset {
    pub body: Vec<u8>,
    pub content_type: String,
}

/// Transport boundary for asset fetches.
///
/// Implementations return the body and content type for any 2xx response,
/// `AssetError::Http` for status >= 400, and `AssetError::Fetch` for
/// transport failures. Content-type gating happens above this boundary.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> std::result::Result<RemoteAsset, AssetError>;
}
