//! Failure taxonomy for analysis requests.
//!
//! Every variant maps to an HTTP status, a client-facing severity and a
//! retry hint. Upstream detail never leaves the process; clients only see
//! the fixed message for the failure kind.

use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::security::RateLimitDecision;
use crate::validation::{Severity, ValidationFailure};

/// Classification of a failed external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamKind {
    /// Credentials missing or rejected. Permanent until an operator acts.
    AuthConfig,
    Quota,
    Timeout,
    Network,
    Generic,
}

impl UpstreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamKind::AuthConfig => "auth_config",
            UpstreamKind::Quota => "quota",
            UpstreamKind::Timeout => "timeout",
            UpstreamKind::Network => "network",
            UpstreamKind::Generic => "generic",
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(self, UpstreamKind::AuthConfig)
    }

    fn status(&self) -> StatusCode {
        match self {
            UpstreamKind::AuthConfig | UpstreamKind::Generic => StatusCode::INTERNAL_SERVER_ERROR,
            UpstreamKind::Quota | UpstreamKind::Network => StatusCode::SERVICE_UNAVAILABLE,
            UpstreamKind::Timeout => StatusCode::REQUEST_TIMEOUT,
        }
    }

    fn severity(&self) -> Severity {
        match self {
            UpstreamKind::Quota | UpstreamKind::Timeout => Severity::Warning,
            _ => Severity::Error,
        }
    }

    fn client_message(&self) -> &'static str {
        match self {
            UpstreamKind::AuthConfig => {
                "The analysis service is not configured correctly. Contact the administrator."
            }
            UpstreamKind::Quota => "Analysis capacity exceeded. Try again later.",
            UpstreamKind::Timeout => "The analysis took too long to complete. Try again.",
            UpstreamKind::Network => "Could not reach the analysis service. Try again.",
            UpstreamKind::Generic => "The analysis failed. Try again.",
        }
    }
}

/// Map a free-text failure onto a kind by keyword.
pub fn classify_message(text: &str) -> UpstreamKind {
    let lowered = text.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lowered.contains(n));

    if has(&["api key", "api_key", "credential", "unauthorized", "openai_api_key"]) {
        UpstreamKind::AuthConfig
    } else if has(&["quota", "rate limit", "too many requests"]) {
        UpstreamKind::Quota
    } else if has(&["timeout", "timed out"]) {
        UpstreamKind::Timeout
    } else if has(&["network", "connect", "dns", "fetch"]) {
        UpstreamKind::Network
    } else {
        UpstreamKind::Generic
    }
}

/// An external collaborator (model, fetcher, browser) failed.
#[derive(Debug, Clone, Error)]
#[error("{} upstream failure: {detail}", .kind.as_str())]
pub struct UpstreamError {
    pub kind: UpstreamKind,
    /// Server-side detail. Logged, never returned to clients.
    pub detail: String,
    /// HTTP status returned by the collaborator, if it answered at all.
    pub status: Option<u16>,
}

impl UpstreamError {
    pub fn new(kind: UpstreamKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Worth repeating: transport failures and server-side (5xx) errors.
    pub fn is_transient(&self) -> bool {
        match self.kind {
            UpstreamKind::Network => true,
            UpstreamKind::Generic => self.status.map_or(true, |s| s >= 500),
            _ => false,
        }
    }

    /// Build from a message whose kind is only known by its wording.
    pub fn classified(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self::new(classify_message(&detail), detail)
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error("rate limit exceeded")]
    RateLimited(RateLimitDecision),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AnalysisError {
    pub fn status(&self) -> StatusCode {
        match self {
            AnalysisError::Validation(_) => StatusCode::BAD_REQUEST,
            AnalysisError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AnalysisError::Upstream(e) => e.kind.status(),
            AnalysisError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            AnalysisError::Validation(failure) => failure.severity,
            AnalysisError::RateLimited(_) => Severity::Warning,
            AnalysisError::Upstream(e) => e.kind.severity(),
            AnalysisError::Internal(_) => Severity::Error,
        }
    }

    pub fn retryable(&self) -> bool {
        match self {
            AnalysisError::Validation(_) | AnalysisError::Internal(_) => false,
            AnalysisError::RateLimited(_) => true,
            AnalysisError::Upstream(e) => e.kind.is_retryable(),
        }
    }

    /// Text safe to return to the client.
    pub fn client_message(&self) -> String {
        match self {
            AnalysisError::Validation(failure) => failure.message.clone(),
            AnalysisError::RateLimited(decision) => format!(
                "Too many requests. Try again in {} seconds.",
                decision.retry_after_secs()
            ),
            AnalysisError::Upstream(e) => e.kind.client_message().to_string(),
            AnalysisError::Internal(_) => "Internal server error".to_string(),
        }
    }
}
