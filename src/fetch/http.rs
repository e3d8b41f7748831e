//! reqwest-backed fetcher with a polite outbound rate limit

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use log::debug;
use reqwest::redirect::Policy;

use super::{Fetcher, RemoteAsset};
use crate::error::{AssetError, Error, Result};

/// Timeout for one asset fetch.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Redirect hops before giving up.
const MAX_REDIRECTS: usize = 10;

/// Upstream requests per second; CDNs tolerate far more, but a refresh run
/// over a large stylesheet tree should not look like a scraper.
const REQUESTS_PER_SECOND: u32 = 8;

/// Production fetcher over a shared reqwest client.
pub struct HttpFetcher {
    client: reqwest::Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!("cdnless/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Other(format!("Failed to build HTTP client: {e}")))?;

        let quota = Quota::per_second(
            NonZeroU32::new(REQUESTS_PER_SECOND).unwrap_or(NonZeroU32::MIN),
        );

        Ok(Self {
            client,
            rate_limiter: RateLimiter::direct(quota),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<RemoteAsset, AssetError> {
        self.rate_limiter.until_ready().await;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| with_url(AssetError::from(e), url))?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(AssetError::Http {
                url: url.to_string(),
                status,
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response
            .bytes()
            .await
            .map_err(|e| with_url(AssetError::from(e), url))?
            .to_vec();

        Ok(RemoteAsset { body, content_type })
    }
}

/// reqwest errors do not always carry their URL; make sure ours do.
fn with_url(mut err: AssetError, url: &str) -> AssetError {
    if let AssetError::Fetch { url: slot, .. } = &mut err
        && slot.is_empty()
    {
        *slot = url.to_string();
    }
    err
}
