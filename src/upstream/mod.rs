//! External collaborators.
//!
//! # Data Flow
//! ```text
//! Orchestrator (after validation, admission and cache miss)
//!     → fetch.rs (direct image URL → bytes + declared type)
//!     → capture.rs (web page URL → PNG screenshot)
//!     → analyzer.rs (image + prompt → model text)
//! ```
//!
//! # Design Decisions
//! - Each collaborator is a trait so tests substitute counting fakes
//! - Every call has a deadline; failures are classified into `UpstreamKind`
//! - Retries happen inside the clients, never in the orchestrator

pub mod analyzer;
pub mod capture;
pub mod fetch;

pub use analyzer::{Analyzer, OpenAiAnalyzer};
pub use capture::{ChromeCapture, PageCapture};
pub use fetch::{is_direct_image_url, FetchedImage, HttpImageFetcher, ImageFetcher};

use crate::analysis::{UpstreamError, UpstreamKind};

/// Classify a reqwest failure.
pub(crate) fn transport_error(e: reqwest::Error) -> UpstreamError {
    let kind = if e.is_timeout() {
        UpstreamKind::Timeout
    } else if e.is_connect() || e.is_request() {
        UpstreamKind::Network
    } else if e.is_decode() || e.is_body() {
        UpstreamKind::Generic
    } else {
        return UpstreamError::classified(e.to_string());
    };
    UpstreamError::new(kind, e.to_string())
}
