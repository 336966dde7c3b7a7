//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the shared components (limiter, cache, orchestrator) once
//! - Create the Axum router with the public and admin routes
//! - Wire up middleware (request ID, tracing, timeout, body limit, metrics)
//! - Start the background sweepers and serve until shutdown

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{DefaultBodyLimit, MatchedPath, Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::admin::admin_router;
use crate::analysis::{AnalysisError, AnalysisOrchestrator, Collaborators, UpstreamError, UpstreamKind};
use crate::cache::CacheStore;
use crate::config::{AppConfig, ServiceConfig};
use crate::http::handlers;
use crate::http::request::{make_request_span, propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::{spawn_sweeper, Shutdown};
use crate::observability::metrics;
use crate::security::{ClientIdentityResolver, HeaderChainResolver, RateLimiter};
use crate::upstream::{ChromeCapture, HttpImageFetcher, OpenAiAnalyzer};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AnalysisOrchestrator>,
    pub identity: Arc<dyn ClientIdentityResolver>,
    pub service: Arc<ServiceConfig>,
    pub admin_key: Arc<str>,
    pub max_file_size: usize,
}

/// HTTP server for the analysis API.
pub struct HttpServer {
    config: AppConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a server backed by the real analyzer, fetcher and browser.
    pub fn new(config: AppConfig) -> Result<Self, UpstreamError> {
        let collaborators = Collaborators {
            analyzer: Arc::new(OpenAiAnalyzer::new(&config.analyzer)?),
            fetcher: Arc::new(HttpImageFetcher::new(&config.fetch)?),
            capture: Arc::new(ChromeCapture::new(config.capture.clone())),
        };
        Ok(Self::with_collaborators(config, collaborators))
    }

    /// Create a server around caller-supplied collaborators.
    pub fn with_collaborators(config: AppConfig, collaborators: Collaborators) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        let cache = Arc::new(CacheStore::new(config.cache.clone()));
        let orchestrator = Arc::new(AnalysisOrchestrator::new(
            &config,
            limiter,
            cache,
            collaborators,
        ));

        let state = AppState {
            orchestrator,
            identity: Arc::new(HeaderChainResolver::new(
                &config.client_identity.trusted_headers,
            )),
            service: Arc::new(config.service.clone()),
            admin_key: Arc::from(config.admin.api_key.as_str()),
            max_file_size: config.uploads.max_file_size,
        };

        Self { config, state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn router(&self) -> Router {
        build_router(&self.config, self.state.clone())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            service = %self.config.service.name,
            environment = %self.config.service.environment,
            "HTTP server starting"
        );

        let cache = self.state.orchestrator.cache().clone();
        let limiter = self.state.orchestrator.limiter().clone();
        let cache_sweeper = spawn_sweeper(cache.clone(), cache.sweep_interval(), shutdown.subscribe());
        let limit_sweeper = spawn_sweeper(
            limiter.clone(),
            limiter.sweep_interval(),
            shutdown.subscribe(),
        );

        let app = self.router();
        let mut stop = shutdown.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
                tracing::info!("Draining in-flight requests");
            })
            .await?;

        let _ = tokio::join!(cache_sweeper, limit_sweeper);
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(config: &AppConfig, state: AppState) -> Router {
    let mut routes = Router::new()
        .route("/api/analyze/upload", post(handlers::analyze_upload))
        .route("/api/analyze/url", post(handlers::analyze_url))
        .route("/api/health", get(handlers::health));

    if config.admin.enabled {
        routes = routes.merge(admin_router(state.clone()));
    }

    routes
        .route_layer(middleware::from_fn(track_metrics))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.security.max_body_size))
        .layer(middleware::from_fn_with_state(
            Duration::from_secs(config.timeouts.request_secs),
            enforce_deadline,
        ))
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(set_request_id_layer())
}

/// Record count and latency per matched route.
async fn track_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    let response = next.run(request).await;
    metrics::record_request(&endpoint, response.status().as_u16(), start);
    response
}

/// Whole-request deadline. An expired request gets the regular timeout body.
async fn enforce_deadline(State(deadline): State<Duration>, request: Request, next: Next) -> Response {
    match tokio::time::timeout(deadline, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(deadline_secs = deadline.as_secs(), "Request deadline exceeded");
            AnalysisError::from(UpstreamError::new(
                UpstreamKind::Timeout,
                "request deadline exceeded",
            ))
            .into_response()
        }
    }
}
