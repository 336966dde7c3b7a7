use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::cache::CacheStats;
use crate::http::server::AppState;

#[derive(Debug, Deserialize)]
pub struct InvalidateParams {
    pub pattern: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvalidateSummary {
    pub pattern: Option<String>,
    pub removed: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RateLimitSummary {
    pub tracked_windows: usize,
}

pub async fn get_cache(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.orchestrator.cache().stats())
}

/// Drop keys containing `pattern`, or everything when no pattern is given.
pub async fn invalidate_cache(
    State(state): State<AppState>,
    Query(params): Query<InvalidateParams>,
) -> Json<InvalidateSummary> {
    let cache = state.orchestrator.cache();
    let pattern = params.pattern.filter(|p| !p.is_empty());
    let removed = match &pattern {
        Some(pattern) => cache.invalidate_by_pattern(pattern),
        None => cache.clear(),
    };
    tracing::info!(pattern = ?pattern, removed, "Cache invalidated by admin");
    Json(InvalidateSummary { pattern, removed })
}

pub async fn get_rate_limits(State(state): State<AppState>) -> Json<RateLimitSummary> {
    Json(RateLimitSummary {
        tracked_windows: state.orchestrator.limiter().tracked(),
    })
}
