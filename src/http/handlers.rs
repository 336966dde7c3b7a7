//! Public API handlers.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisError;
use crate::http::response::{insert_rate_limit_headers, AnalysisResponse};
use crate::http::server::AppState;
use crate::security::Endpoint;
use crate::validation::{RawUpload, ValidationErrorKind, ValidationFailure};

const FILE_FIELD: &str = "file";
const CONTEXT_FIELD: &str = "product_context";

#[derive(Debug, Deserialize)]
pub struct UrlAnalysisRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub product_context: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: u64,
    pub service: String,
    pub version: String,
    pub environment: String,
}

fn malformed(message: &str) -> AnalysisError {
    ValidationFailure::new(ValidationErrorKind::Malformed, message).into()
}

fn multipart_error(e: MultipartError, max_file_size: usize) -> AnalysisError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ValidationFailure::new(
            ValidationErrorKind::TooLarge,
            format!("File too large. Maximum allowed: {}MB", max_file_size / (1024 * 1024)),
        )
        .into()
    } else {
        tracing::debug!(error = %e, "Unreadable multipart body");
        malformed("Could not read the uploaded form")
    }
}

/// POST /api/analyze/upload (multipart: `file`, optional `product_context`).
pub async fn analyze_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<AnalysisResponse, AnalysisError> {
    let mut multipart = multipart.map_err(|_| malformed("Expected a multipart form upload"))?;
    let max_file_size = state.max_file_size;

    let mut upload = None;
    let mut context = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_file_size))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            FILE_FIELD => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, max_file_size))?;
                upload = Some(RawUpload {
                    bytes: bytes.to_vec(),
                    filename,
                    content_type,
                });
            }
            CONTEXT_FIELD => {
                context = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| multipart_error(e, max_file_size))?,
                );
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| {
        AnalysisError::from(ValidationFailure::new(
            ValidationErrorKind::Empty,
            "No file provided",
        ))
    })?;

    let client = state.identity.resolve(&headers);
    let outcome = state
        .orchestrator
        .analyze_upload(&client, upload, context.as_deref())
        .await?;
    tracing::info!(
        client = %client,
        from_cache = outcome.result.from_cache,
        recommendations = outcome.result.recommendations.len(),
        "Upload analysis served"
    );
    Ok(AnalysisResponse(outcome))
}

/// POST /api/analyze/url (JSON: `url`, optional `product_context`).
pub async fn analyze_url(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<UrlAnalysisRequest>, JsonRejection>,
) -> Result<AnalysisResponse, AnalysisError> {
    let Json(request) = payload.map_err(|e| {
        tracing::debug!(error = %e, "Unreadable JSON body");
        malformed("Request body must be JSON with a `url` field")
    })?;

    let url = request
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| {
            AnalysisError::from(ValidationFailure::new(
                ValidationErrorKind::BadUrlFormat,
                "URL is required",
            ))
        })?;

    let client = state.identity.resolve(&headers);
    let outcome = state
        .orchestrator
        .analyze_url(&client, &url, request.product_context.as_deref())
        .await?;
    tracing::info!(
        client = %client,
        from_cache = outcome.result.from_cache,
        screenshot = outcome.result.screenshot_data.is_some(),
        "URL analysis served"
    );
    Ok(AnalysisResponse(outcome))
}

/// GET /api/health. Rate-limited on its own, much larger allowance.
pub async fn health(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AnalysisError> {
    let client = state.identity.resolve(&headers);
    let decision = state.orchestrator.limiter().check(&client, Endpoint::Health);
    if !decision.allowed {
        return Err(AnalysisError::RateLimited(decision));
    }

    let status = HealthStatus {
        status: "healthy".to_string(),
        timestamp: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64,
        service: state.service.name.clone(),
        version: state.service.version.clone(),
        environment: state.service.environment.clone(),
    };
    let mut response = Json(status).into_response();
    insert_rate_limit_headers(response.headers_mut(), &decision);
    Ok(response)
}
