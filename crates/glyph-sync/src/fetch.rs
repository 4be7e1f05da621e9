//! Image fetching with retry
//!
//! [`ImageSource`] is the seam between the reconciler and the network, so
//! tests run against scripted sources. Failures are classified as permanent
//! (retrying cannot help) or transient (retry up to the domain's budget,
//! with a linearly growing backoff).

use std::time::Duration;

use async_trait::async_trait;

use crate::config::DomainConfig;
use crate::limiter::RateLimiter;

/// Base of the linear retry backoff; attempt `n` waits `n` times this.
const RETRY_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Why one image could not be fetched.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Retrying cannot help (4xx status, unusable URL)
    #[error("permanent fetch failure: {0}")]
    Permanent(String),

    /// Worth retrying (5xx status, timeout, connection failure, empty body)
    #[error("transient fetch failure: {0}")]
    Transient(String),
}

impl FetchError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, FetchError::Permanent(_))
    }
}

/// Where image bytes come from.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Fetch the encoded bytes of one image. One attempt, no retry.
    async fn fetch(&self, config: &DomainConfig, filename: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetches images over HTTP with per-domain headers and timeouts.
#[derive(Debug, Clone)]
pub struct HttpImageSource {
    client: reqwest::Client,
}

impl HttpImageSource {
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be constructed.
    pub fn new() -> crate::Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch(&self, config: &DomainConfig, filename: &str) -> Result<Vec<u8>, FetchError> {
        let url = config.build_image_url(filename);

        let mut request = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(config.timeout_secs));
        for (name, value) in config.request_headers() {
            request = request.header(&name, &value);
        }

        let response = request.send().await.map_err(classify)?;
        let status = response.status();
        if status.is_client_error() {
            return Err(FetchError::Permanent(format!("{url}: HTTP {status}")));
        }
        if !status.is_success() {
            return Err(FetchError::Transient(format!("{url}: HTTP {status}")));
        }

        let bytes = response.bytes().await.map_err(classify)?;
        if bytes.is_empty() {
            return Err(FetchError::Transient(format!("{url}: empty response body")));
        }
        Ok(bytes.to_vec())
    }
}

fn classify(error: reqwest::Error) -> FetchError {
    if error.is_builder() {
        FetchError::Permanent(error.to_string())
    } else {
        // timeouts, connection resets, truncated bodies
        FetchError::Transient(error.to_string())
    }
}

/// Fetch one image, retrying transient failures up to the domain's budget.
///
/// Every attempt takes a rate limiter slot first. Attempt `n` (1-based) is
/// followed by a backoff of `n` seconds before the next try; a permanent
/// failure ends the loop immediately.
///
/// # Errors
///
/// The last [`FetchError`] when all attempts fail.
pub async fn fetch_with_retry(
    source: &dyn ImageSource,
    limiter: &RateLimiter,
    config: &DomainConfig,
    filename: &str,
) -> Result<Vec<u8>, FetchError> {
    let attempts = config.max_retries.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        limiter.acquire().await;
        match source.fetch(config, filename).await {
            Ok(bytes) => {
                tracing::debug!(filename, attempt, bytes = bytes.len(), "fetched image");
                return Ok(bytes);
            }
            Err(error) if error.is_permanent() => {
                tracing::warn!(filename, %error, "fetch failed permanently");
                return Err(error);
            }
            Err(error) => {
                tracing::warn!(filename, attempt, attempts, %error, "fetch attempt failed");
                if attempt < attempts {
                    tokio::time::sleep(RETRY_BACKOFF_BASE * attempt).await;
                }
                last_error = Some(error);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| FetchError::Transient(format!("{filename}: no attempts made"))))
}
