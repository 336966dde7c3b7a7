//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to an external collaborator:
//!     → timeouts.rs (enforce a deadline)
//!     → On transient failure: retries.rs (retry with jittered exponential delays)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retries live in the collaborator clients, never in the orchestrator
//! - Jittered backoff prevents thundering herd

pub mod retries;
pub mod timeouts;

pub use retries::RetryPolicy;
pub use timeouts::with_deadline;
