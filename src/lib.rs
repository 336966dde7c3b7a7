//! Audito: UX critique service for UI screenshots and web pages.

// Request path
pub mod analysis;
pub mod http;
pub mod upstream;
pub mod validation;

// Shared state
pub mod cache;
pub mod security;

// Cross-cutting concerns
pub mod admin;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
