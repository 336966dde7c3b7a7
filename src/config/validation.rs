//! Configuration validation.
//!
//! Serde handles the syntax; this pass checks the values make sense together.
//! Every violation is reported, not just the first.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{AppConfig, EndpointLimit, PLACEHOLDER_ADMIN_KEY};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ConfigViolation {
    pub field: String,
    pub message: String,
}

impl ConfigViolation {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ConfigViolation>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ConfigViolation::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    let worst_case = config.capture.timeout_secs.saturating_add(
        u64::from(config.analyzer.max_attempts).saturating_mul(config.analyzer.timeout_secs),
    );
    if config.timeouts.request_secs == 0 {
        errors.push(ConfigViolation::new("timeouts.request_secs", "must be > 0"));
    } else if config.timeouts.request_secs < worst_case {
        errors.push(ConfigViolation::new(
            "timeouts.request_secs",
            format!("must cover capture plus every analyzer attempt ({worst_case}s)"),
        ));
    }

    let uploads = &config.uploads;
    if uploads.max_file_size == 0 {
        errors.push(ConfigViolation::new("uploads.max_file_size", "must be > 0"));
    }
    if config.security.max_body_size <= uploads.max_file_size {
        errors.push(ConfigViolation::new(
            "security.max_body_size",
            "must exceed uploads.max_file_size so oversized files are classified",
        ));
    }
    for (mime, extensions) in &uploads.mime_types {
        if !uploads.signatures.contains_key(mime) {
            errors.push(ConfigViolation::new(
                format!("uploads.signatures.{mime}"),
                "MIME type has no magic-number signature",
            ));
        }
        for ext in extensions {
            if !uploads.allowed_extensions.contains(ext) {
                errors.push(ConfigViolation::new(
                    format!("uploads.mime_types.{mime}"),
                    format!("extension '{ext}' is not in allowed_extensions"),
                ));
            }
        }
    }
    for (mime, signature) in &uploads.signatures {
        if signature.is_empty() {
            errors.push(ConfigViolation::new(
                format!("uploads.signatures.{mime}"),
                "signature must not be empty",
            ));
        }
    }

    let limits = [
        ("rate_limit.upload", config.rate_limit.upload),
        ("rate_limit.url", config.rate_limit.url),
        ("rate_limit.health", config.rate_limit.health),
    ];
    for (field, EndpointLimit { limit, window_secs }) in limits {
        if limit == 0 {
            errors.push(ConfigViolation::new(format!("{field}.limit"), "must be > 0"));
        }
        if window_secs == 0 {
            errors.push(ConfigViolation::new(format!("{field}.window_secs"), "must be > 0"));
        }
    }
    if config.rate_limit.sweep_interval_secs == 0 {
        errors.push(ConfigViolation::new("rate_limit.sweep_interval_secs", "must be > 0"));
    }

    let cache = &config.cache;
    let ttls = [
        ("cache.url_analysis_ttl_secs", cache.url_analysis_ttl_secs),
        ("cache.upload_analysis_ttl_secs", cache.upload_analysis_ttl_secs),
        ("cache.url_validation_ttl_secs", cache.url_validation_ttl_secs),
        ("cache.sweep_interval_secs", cache.sweep_interval_secs),
    ];
    for (field, value) in ttls {
        if value == 0 {
            errors.push(ConfigViolation::new(field, "must be > 0"));
        }
    }

    if config.client_identity.trusted_headers.is_empty() {
        errors.push(ConfigViolation::new(
            "client_identity.trusted_headers",
            "at least one header is required",
        ));
    }
    if config.analyzer.max_attempts == 0 {
        errors.push(ConfigViolation::new("analyzer.max_attempts", "must be >= 1"));
    }
    if url::Url::parse(&config.analyzer.api_base).is_err() {
        errors.push(ConfigViolation::new("analyzer.api_base", "not a valid URL"));
    }
    if config.capture.timeout_secs == 0 {
        errors.push(ConfigViolation::new("capture.timeout_secs", "must be > 0"));
    }
    if config.admin.enabled && config.admin.api_key == PLACEHOLDER_ADMIN_KEY {
        errors.push(ConfigViolation::new(
            "admin.api_key",
            "admin is enabled with the placeholder key",
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ConfigViolation::new(
            "observability.metrics_address",
            "not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&AppConfig::default()), Ok(()));
    }

    #[test]
    fn test_reports_all_violations() {
        let mut config = AppConfig::default();
        config.rate_limit.url.limit = 0;
        config.cache.upload_analysis_ttl_secs = 0;
        config.admin.enabled = true;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"rate_limit.url.limit"));
        assert!(fields.contains(&"cache.upload_analysis_ttl_secs"));
        assert!(fields.contains(&"admin.api_key"));
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_request_deadline_covers_capture_and_retries() {
        let mut config = AppConfig::default();
        config.timeouts.request_secs = 120;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "timeouts.request_secs");
        assert!(errors[0].message.contains("150s"));

        config.analyzer.max_attempts = 1;
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_mime_without_signature() {
        let mut config = AppConfig::default();
        config.uploads.signatures.remove("image/png");
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "uploads.signatures.image/png");
    }
}
