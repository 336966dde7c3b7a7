//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files, and
//! every default mirrors the production constants.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the analysis service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Transport-level hardening.
    pub security: SecurityConfig,

    /// Uploaded file validation rules.
    pub uploads: UploadConfig,

    /// URL safety rules.
    pub url_policy: UrlPolicyConfig,

    /// Per-endpoint admission control.
    pub rate_limit: RateLimitConfig,

    /// Response cache TTLs and sweep cadence.
    pub cache: CacheConfig,

    /// Client identity header chain.
    pub client_identity: ClientIdentityConfig,

    /// Vision model client.
    pub analyzer: AnalyzerConfig,

    /// Direct image fetching.
    pub fetch: FetchConfig,

    /// Headless page capture.
    pub capture: CaptureConfig,

    /// Admin endpoints.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Service identity reported by the health endpoint.
    pub service: ServiceConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request deadline in seconds. Must cover capture + analysis.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 180 }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes. Kept above `uploads.max_file_size`
    /// so oversized files reach the validator and get a classified answer.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 12 * 1024 * 1024,
        }
    }
}

/// Upload validation rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Maximum accepted file size in bytes.
    pub max_file_size: usize,

    /// Allowed filename extensions, lowercase with leading dot.
    pub allowed_extensions: Vec<String>,

    /// Declared MIME type -> extensions it may carry.
    pub mime_types: BTreeMap<String, Vec<String>>,

    /// Declared MIME type -> expected leading bytes.
    pub signatures: BTreeMap<String, Vec<u8>>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        let jpeg_exts = vec![".jpg".to_string(), ".jpeg".to_string()];
        let mut mime_types = BTreeMap::new();
        mime_types.insert("image/png".to_string(), vec![".png".to_string()]);
        mime_types.insert("image/jpeg".to_string(), jpeg_exts.clone());
        mime_types.insert("image/jpg".to_string(), jpeg_exts);

        let mut signatures = BTreeMap::new();
        signatures.insert("image/png".to_string(), vec![0x89, 0x50, 0x4E, 0x47]);
        signatures.insert("image/jpeg".to_string(), vec![0xFF, 0xD8, 0xFF]);
        signatures.insert("image/jpg".to_string(), vec![0xFF, 0xD8, 0xFF]);

        Self {
            max_file_size: 5 * 1024 * 1024,
            allowed_extensions: vec![".png".into(), ".jpg".into(), ".jpeg".into()],
            mime_types,
            signatures,
        }
    }
}

/// URL safety rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UrlPolicyConfig {
    /// Substrings that make a URL unsafe wherever they appear.
    pub blocked_patterns: Vec<String>,

    /// Known-safe domains (suffix match). Only consulted for IP-literal hosts.
    pub allowed_domains: Vec<String>,

    /// Resolve the host right before fetching and reject internal addresses.
    pub verify_dns: bool,
}

impl Default for UrlPolicyConfig {
    fn default() -> Self {
        let mut blocked_patterns: Vec<String> = [
            "localhost",
            "127.0.0.1",
            "0.0.0.0",
            "::1",
            "10.",
            "192.168.",
            "file:",
            "ftp:",
            "data:",
            "javascript:",
            "vbscript:",
            "mailto:",
            "tel:",
            "sms:",
        ]
        .iter()
        .map(|p| p.to_string())
        .collect();
        blocked_patterns.extend((16..=31).map(|octet| format!("172.{octet}.")));

        Self {
            blocked_patterns,
            allowed_domains: Vec::new(),
            verify_dns: true,
        }
    }
}

/// Limit and window for one endpoint.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct EndpointLimit {
    /// Admitted requests per window.
    pub limit: u32,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl EndpointLimit {
    pub const fn per_minute(limit: u32) -> Self {
        Self {
            limit,
            window_secs: 60,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// How often expired windows are reclaimed, in seconds.
    pub sweep_interval_secs: u64,

    pub upload: EndpointLimit,
    pub url: EndpointLimit,
    pub health: EndpointLimit,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_interval_secs: 300,
            upload: EndpointLimit::per_minute(10),
            url: EndpointLimit::per_minute(5),
            health: EndpointLimit::per_minute(100),
        }
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How often expired entries are reclaimed, in seconds.
    pub sweep_interval_secs: u64,

    pub url_analysis_ttl_secs: u64,
    pub upload_analysis_ttl_secs: u64,
    pub url_validation_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 300,
            url_analysis_ttl_secs: 60 * 60,
            upload_analysis_ttl_secs: 2 * 60 * 60,
            url_validation_ttl_secs: 30 * 60,
        }
    }
}

/// Which headers identify the client, in order of preference.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientIdentityConfig {
    pub trusted_headers: Vec<String>,
}

impl Default for ClientIdentityConfig {
    fn default() -> Self {
        Self {
            trusted_headers: vec![
                "cf-connecting-ip".to_string(),
                "x-real-ip".to_string(),
                "x-forwarded-for".to_string(),
            ],
        }
    }
}

/// Vision model client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// OpenAI-compatible API base URL.
    pub api_base: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,

    /// Total attempts for transient failures (1 = no retry).
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "gpt-4o".to_string(),
            max_tokens: 2000,
            timeout_secs: 60,
            max_attempts: 2,
            base_delay_ms: 250,
            max_delay_ms: 2000,
        }
    }
}

/// Direct image fetch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
        }
    }
}

/// Headless browser capture configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Enable web page screenshots.
    pub enabled: bool,

    /// Chromium/Chrome executable.
    pub browser_path: String,

    /// Hard navigation deadline in seconds.
    pub timeout_secs: u64,

    /// Virtual time the page gets to settle before the screenshot, in ms.
    pub settle_ms: u64,

    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            browser_path: "chromium".to_string(),
            timeout_secs: 30,
            settle_ms: 3000,
            viewport_width: 1920,
            viewport_height: 1080,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        }
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount `/admin/*` routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

/// Placeholder key rejected by config validation when admin is enabled.
pub const PLACEHOLDER_ADMIN_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_ADMIN_KEY.to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Service identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub version: String,
    pub environment: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "audito-backend".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}
