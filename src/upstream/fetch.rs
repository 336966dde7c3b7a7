//! Direct image download for URLs that point at an image file.
//!
//! Redirects are not followed: a redirect could lead to an address the URL
//! checks never saw. The body is read in chunks and reading stops one byte
//! past the size cap, so an oversized image never lands in memory whole and
//! the file validator still reports it as too large.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use url::Url;

use crate::analysis::{UpstreamError, UpstreamKind};
use crate::config::FetchConfig;
use crate::upstream::transport_error;

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".bmp", ".svg"];

/// Raw bytes and declared type, not yet validated.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Download at most `max_bytes + 1` bytes from `url`.
    async fn fetch(&self, url: &Url, max_bytes: usize) -> Result<FetchedImage, UpstreamError>;
}

/// True when the URL path names an image file rather than a page.
pub fn is_direct_image_url(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| UpstreamError::new(UpstreamKind::Generic, format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &Url, max_bytes: usize) -> Result<FetchedImage, UpstreamError> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::new(
                UpstreamKind::Generic,
                format!("image URL {url} answered {status}"),
            )
            .with_status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let cap = max_bytes.saturating_add(1);
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(transport_error)? {
            bytes.extend_from_slice(&chunk);
            if bytes.len() >= cap {
                bytes.truncate(cap);
                tracing::warn!(url = %url, limit = max_bytes, "Image body exceeds size cap");
                break;
            }
        }

        Ok(FetchedImage { bytes, content_type })
    }
}
