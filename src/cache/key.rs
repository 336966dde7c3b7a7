//! Cache key derivation.
//!
//! Keys are `{namespace}:{base64(k1:v1|k2:v2|...)}` with parameters sorted by
//! name, so parameter order never changes the key.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::config::CacheConfig;

/// Context sentinel used when the client sent none.
pub const DEFAULT_CONTEXT: &str = "default";

/// Logical cache namespaces, each with its own TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    UrlAnalysis,
    UploadAnalysis,
    UrlValidation,
}

impl Namespace {
    pub fn prefix(&self) -> &'static str {
        match self {
            Namespace::UrlAnalysis => "url_analysis",
            Namespace::UploadAnalysis => "upload_analysis",
            Namespace::UrlValidation => "url_validation",
        }
    }

    pub fn ttl(&self, config: &CacheConfig) -> Duration {
        let secs = match self {
            Namespace::UrlAnalysis => config.url_analysis_ttl_secs,
            Namespace::UploadAnalysis => config.upload_analysis_ttl_secs,
            Namespace::UrlValidation => config.url_validation_ttl_secs,
        };
        Duration::from_secs(secs)
    }
}

/// Deterministic, order-independent key for `params` under `prefix`.
pub fn generate_key(prefix: &str, params: &[(&str, &str)]) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by_key(|(k, _)| *k);

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}:{v}"))
        .collect::<Vec<_>>()
        .join("|");

    format!("{prefix}:{}", STANDARD.encode(joined))
}

/// Blank or missing context collapses to [`DEFAULT_CONTEXT`].
pub fn normalize_context(context: Option<&str>) -> &str {
    match context.map(str::trim) {
        Some(text) if !text.is_empty() => text,
        _ => DEFAULT_CONTEXT,
    }
}

/// Key for an upload analysis: content hash plus context.
pub fn upload_key(content_hash: &str, context: Option<&str>) -> String {
    generate_key(
        Namespace::UploadAnalysis.prefix(),
        &[("hash", content_hash), ("context", normalize_context(context))],
    )
}

/// Key for a URL analysis: encoded URL plus context.
pub fn url_key(url: &str, context: Option<&str>) -> String {
    let encoded = STANDARD.encode(url);
    generate_key(
        Namespace::UrlAnalysis.prefix(),
        &[("url", encoded.as_str()), ("context", normalize_context(context))],
    )
}

/// Key for a cached URL verdict.
pub fn url_validation_key(url: &str) -> String {
    let encoded = STANDARD.encode(url);
    generate_key(Namespace::UrlValidation.prefix(), &[("url", encoded.as_str())])
}
