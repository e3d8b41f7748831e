//! Canned-response fetcher for tests
//!
//! Configure routes up front, then assert on per-URL call counts to verify
//! freshness fast paths really skip the network.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Fetcher, RemoteAsset};
use crate::error::AssetError;

/// A stand-in font payload; content never matters, only bytes on disk.
pub const FONT_BYTES: &[u8] = b"\x77\x4f\x46\x32fake-font";

enum Route {
    Success(RemoteAsset),
    Failure(AssetError),
}

/// Mock fetcher with canned per-URL responses.
///
/// Unrouted URLs answer HTTP 404. Clone handles share routes and counters.
#[derive(Clone, Default)]
pub struct MockFetcher {
    routes: Arc<Mutex<HashMap<String, Route>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn route(&self, url: &str, content_type: &str, body: &[u8]) {
        self.routes.lock().await.insert(
            url.to_string(),
            Route::Success(RemoteAsset {
                body: body.to_vec(),
                content_type: content_type.to_string(),
            }),
        );
    }

    pub async fn route_css(&self, url: &str, body: &str) {
        self.route(url, "text/css", body.as_bytes()).await;
    }

    pub async fn route_js(&self, url: &str, body: &str) {
        self.route(url, "application/javascript", body.as_bytes()).await;
    }

    pub async fn route_font(&self, url: &str) {
        self.route(url, "font/woff2", FONT_BYTES).await;
    }

    pub async fn route_error(&self, url: &str, error: AssetError) {
        self.routes
            .lock()
            .await
            .insert(url.to_string(), Route::Failure(error));
    }

    /// Every fetched URL, in call order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    /// How many times `url` was fetched.
    pub async fn call_count(&self, url: &str) -> usize {
        self.calls.lock().await.iter().filter(|u| *u == url).count()
    }

    pub async fn total_calls(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<RemoteAsset, AssetError> {
        self.calls.lock().await.push(url.to_string());
        match self.routes.lock().await.get(url) {
            Some(Route::Success(asset)) => Ok(asset.clone()),
            Some(Route::Failure(err)) => Err(err.clone()),
            None => Err(AssetError::Http {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_routed_asset_returned() {
        let mock = MockFetcher::new();
        mock.route_css("https://cdn.example/a.css", "body{}").await;

        let asset = mock.fetch("https://cdn.example/a.css").await.unwrap();
        assert_eq!(asset.content_type, "text/css");
        assert_eq!(asset.body, b"body{}");
    }

    #[tokio::test]
    async fn test_unrouted_url_is_404() {
        let mock = MockFetcher::new();
        match mock.fetch("https://cdn.example/missing.css").await {
            Err(AssetError::Http { status: 404, .. }) => (),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_call_counting() {
        let mock = MockFetcher::new();
        mock.route_font("https://cdn.example/f.woff2").await;

        let _ = mock.fetch("https://cdn.example/f.woff2").await;
        let _ = mock.fetch("https://cdn.example/f.woff2").await;
        let _ = mock.fetch("https://cdn.example/other.woff2").await;

        assert_eq!(mock.call_count("https://cdn.example/f.woff2").await, 2);
        assert_eq!(mock.total_calls().await, 3);
    }
}
