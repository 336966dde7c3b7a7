//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, tracing span)
//!     → handlers.rs (extract form / JSON, resolve client identity)
//!     → analysis orchestrator
//!     → response.rs (JSON body, status, rate-limit headers)
//!     → Send to client
//! ```
//!
//! # Design Decisions
//! - Handlers stay thin; policy lives in the orchestrator
//! - Every error becomes a JSON body through one `IntoResponse` impl

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{build_router, AppState, HttpServer};
