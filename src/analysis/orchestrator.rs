//! End-to-end request policy.
//!
//! ```text
//! Received → Validating ─reject→ Invalid
//!          → RateLimiting ─deny→ RateLimited
//!          → CacheLookup ─hit→ Served (from_cache = true)
//!          → ExternalAnalyze ─fail→ UpstreamError
//!          → Normalize → cache set → Served (from_cache = false)
//! ```
//!
//! Every admitted request consumes rate-limit budget, hit or miss. A miss
//! calls the analyzer exactly once and writes the cache exactly once on
//! success. Concurrent identical misses are not coalesced.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use url::Url;

use crate::analysis::error::{AnalysisError, UpstreamError};
use crate::analysis::normalize::{normalize, NormalizedAnalysis};
use crate::analysis::prompt::build_prompt;
use crate::analysis::types::{AnalysisResult, ImageInfo};
use crate::cache::{key, CacheStore, Namespace};
use crate::config::AppConfig;
use crate::observability::metrics;
use crate::security::{Endpoint, RateLimitDecision, RateLimiter};
use crate::upstream::{is_direct_image_url, Analyzer, ImageFetcher, PageCapture};
use crate::validation::{
    verify_resolution, FileValidator, RawUpload, UrlValidator, ValidatedImage,
};

/// External capabilities the orchestrator drives.
#[derive(Clone)]
pub struct Collaborators {
    pub analyzer: Arc<dyn Analyzer>,
    pub fetcher: Arc<dyn ImageFetcher>,
    pub capture: Arc<dyn PageCapture>,
}

/// A served analysis plus the admission decision that let it through.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub result: AnalysisResult,
    pub rate_limit: RateLimitDecision,
}

pub struct AnalysisOrchestrator {
    files: FileValidator,
    urls: UrlValidator,
    verify_dns: bool,
    limiter: Arc<RateLimiter>,
    cache: Arc<CacheStore>,
    collaborators: Collaborators,
}

impl AnalysisOrchestrator {
    pub fn new(
        config: &AppConfig,
        limiter: Arc<RateLimiter>,
        cache: Arc<CacheStore>,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            files: FileValidator::new(config.uploads.clone()),
            urls: UrlValidator::new(&config.url_policy),
            verify_dns: config.url_policy.verify_dns,
            limiter,
            cache,
            collaborators,
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    /// Analyze an uploaded image.
    pub async fn analyze_upload(
        &self,
        client: &str,
        upload: RawUpload,
        context: Option<&str>,
    ) -> Result<Outcome, AnalysisError> {
        let filename = upload.filename.clone();
        let image = self.files.validate(upload).map_err(|failure| {
            tracing::info!(client = %client, filename = %filename, kind = ?failure.kind, "Rejected upload");
            failure
        })?;
        let rate_limit = self.admit(client, Endpoint::Upload)?;

        let cache_key = key::upload_key(&image.content_hash(), context);
        if let Some(result) = self.cached(&cache_key) {
            return Ok(Outcome { result, rate_limit });
        }

        let analysis = self.analyze_image(&image, context).await?;
        let result = build_result(analysis, &image, None, None);
        self.store(cache_key, &result, Namespace::UploadAnalysis);
        Ok(Outcome { result, rate_limit })
    }

    /// Analyze the image at, or a screenshot of, a URL.
    pub async fn analyze_url(
        &self,
        client: &str,
        raw_url: &str,
        context: Option<&str>,
    ) -> Result<Outcome, AnalysisError> {
        let url = self.urls.validate(raw_url).map_err(|failure| {
            tracing::info!(client = %client, kind = ?failure.kind, "Rejected URL");
            failure
        })?;
        let rate_limit = self.admit(client, Endpoint::Url)?;
        self.remember_verdict(&url);

        let cache_key = key::url_key(url.as_str(), context);
        if let Some(result) = self.cached(&cache_key) {
            return Ok(Outcome { result, rate_limit });
        }

        // Resolve immediately before any network I/O.
        if self.verify_dns {
            verify_resolution(&url).await?;
        }

        let (image, screenshot) = if is_direct_image_url(&url) {
            let fetched = self
                .collaborators
                .fetcher
                .fetch(&url, self.files.max_file_size())
                .await
                .map_err(upstream_failure)?;
            let image = self
                .files
                .validate_fetched(fetched.bytes, &fetched.content_type)?;
            (image, None)
        } else {
            let png = self
                .collaborators
                .capture
                .capture(&url)
                .await
                .map_err(upstream_failure)?;
            let image = self.files.validate_fetched(png, "image/png")?;
            let data = format!("data:image/png;base64,{}", STANDARD.encode(image.bytes()));
            (image, Some(data))
        };

        let analysis = self.analyze_image(&image, context).await?;
        let result = build_result(analysis, &image, Some(url.to_string()), screenshot);
        self.store(cache_key, &result, Namespace::UrlAnalysis);
        Ok(Outcome { result, rate_limit })
    }

    /// Record an accepted URL under its normalized form. Only admitted
    /// requests get here, so denied clients cannot grow the cache.
    fn remember_verdict(&self, url: &Url) {
        self.cache.set(
            key::url_validation_key(url.as_str()),
            serde_json::Value::String(url.to_string()),
            self.cache.ttl_for(Namespace::UrlValidation),
        );
    }

    fn admit(&self, client: &str, endpoint: Endpoint) -> Result<RateLimitDecision, AnalysisError> {
        let decision = self.limiter.check(client, endpoint);
        if decision.allowed {
            Ok(decision)
        } else {
            Err(AnalysisError::RateLimited(decision))
        }
    }

    fn cached(&self, cache_key: &str) -> Option<AnalysisResult> {
        let value = self.cache.get(cache_key)?;
        match serde_json::from_value::<AnalysisResult>(value) {
            Ok(mut result) => {
                result.from_cache = true;
                tracing::debug!(key = %cache_key, "Serving cached analysis");
                Some(result)
            }
            Err(e) => {
                tracing::warn!(key = %cache_key, error = %e, "Discarding unreadable cache entry");
                self.cache.delete(cache_key);
                None
            }
        }
    }

    fn store(&self, cache_key: String, result: &AnalysisResult, namespace: Namespace) {
        match serde_json::to_value(result) {
            Ok(value) => self.cache.set(cache_key, value, self.cache.ttl_for(namespace)),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize analysis for caching"),
        }
    }

    async fn analyze_image(
        &self,
        image: &ValidatedImage,
        context: Option<&str>,
    ) -> Result<NormalizedAnalysis, AnalysisError> {
        let prompt = build_prompt(context);
        let raw = self
            .collaborators
            .analyzer
            .analyze(image, &prompt)
            .await
            .map_err(upstream_failure)?;
        Ok(normalize(&raw, context))
    }
}

/// Log the full failure server-side; the client only sees the kind.
fn upstream_failure(error: UpstreamError) -> AnalysisError {
    tracing::error!(
        kind = error.kind.as_str(),
        status = ?error.status,
        detail = %error.detail,
        "Upstream call failed"
    );
    metrics::record_upstream_failure(error.kind.as_str());
    AnalysisError::Upstream(error)
}

fn build_result(
    analysis: NormalizedAnalysis,
    image: &ValidatedImage,
    source_url: Option<String>,
    screenshot_data: Option<String>,
) -> AnalysisResult {
    AnalysisResult {
        success: true,
        overall_assessment: analysis.overall_assessment,
        user_context: analysis.user_context,
        recommendations: analysis.recommendations,
        image_info: ImageInfo::from(image),
        source_url,
        screenshot_data,
        analysis_timestamp: now_millis(),
        from_cache: false,
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
