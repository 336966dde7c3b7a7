//! Analysis subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP handler (upload or URL)
//!     → orchestrator.rs
//!         → validation (file / URL rules)
//!         → security (rate limit admission)
//!         → cache (lookup by derived key)
//!         → upstream (fetch / capture, then analyzer with prompt.rs text)
//!         → normalize.rs (model text → structured fields)
//!         → cache (store)
//!     → AnalysisResult or AnalysisError (error.rs)
//! ```
//!
//! # Design Decisions
//! - Components are injected; no process-wide singletons
//! - `from_cache` is true only on the cache-hit path
//! - Upstream detail is logged, never returned

pub mod error;
pub mod normalize;
pub mod orchestrator;
pub mod prompt;
pub mod types;

pub use error::{classify_message, AnalysisError, UpstreamError, UpstreamKind};
pub use orchestrator::{AnalysisOrchestrator, Collaborators, Outcome};
pub use types::{AnalysisResult, Category, ImageInfo, Recommendation};
