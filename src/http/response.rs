//! Response shaping.
//!
//! Success and failure bodies share one top-level shape so clients have a
//! single parsing path. Analysis responses always carry the rate-limit
//! headers of the admission that served them.

use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::analysis::{AnalysisError, Outcome, Recommendation};
use crate::security::RateLimitDecision;

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// Uniform failure body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub error_type: &'static str,
    pub retryable: bool,
    pub overall_assessment: &'static str,
    pub user_context: &'static str,
    pub recommendations: Vec<Recommendation>,
}

impl ErrorBody {
    pub fn from_error(error: &AnalysisError) -> Self {
        let placeholder = match error {
            AnalysisError::Validation(_) => "Validation failed",
            AnalysisError::RateLimited(_) => "Rate limit exceeded",
            AnalysisError::Upstream(_) | AnalysisError::Internal(_) => "Analysis failed",
        };
        Self {
            success: false,
            error: error.client_message(),
            error_type: error.severity().as_str(),
            retryable: error.retryable(),
            overall_assessment: placeholder,
            user_context: placeholder,
            recommendations: Vec::new(),
        }
    }
}

/// Write the `X-RateLimit-*` headers for `decision`.
pub fn insert_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(decision.reset_unix_secs()));
}

impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        if let AnalysisError::Internal(detail) = &self {
            tracing::error!(detail = %detail, "Internal error while handling analysis");
        }
        let mut response = (self.status(), Json(ErrorBody::from_error(&self))).into_response();
        if let AnalysisError::RateLimited(decision) = &self {
            let headers = response.headers_mut();
            insert_rate_limit_headers(headers, decision);
            headers.insert(header::RETRY_AFTER, HeaderValue::from(decision.retry_after_secs()));
        }
        response
    }
}

/// Successful analysis.
pub struct AnalysisResponse(pub Outcome);

impl IntoResponse for AnalysisResponse {
    fn into_response(self) -> Response {
        let Outcome { result, rate_limit } = self.0;
        let mut response = Json(result).into_response();
        insert_rate_limit_headers(response.headers_mut(), &rate_limit);
        response
    }
}
