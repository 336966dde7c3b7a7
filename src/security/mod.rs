//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming analysis request (after input validation):
//!     → client_ip.rs (derive client identity from trusted headers)
//!     → rate_limit.rs (fixed-window check-and-increment per client+endpoint)
//!     → admitted: continue to cache lookup
//!     → denied: 429 with retry guidance
//! ```
//!
//! # Design Decisions
//! - Admission is linearizable per key (shard lock around check-and-increment)
//! - Cache hits still consume budget; the limiter runs before the cache
//! - Header trust order is deployment configuration, not code

pub mod client_ip;
pub mod rate_limit;

pub use client_ip::{ClientIdentityResolver, HeaderChainResolver, UNKNOWN_CLIENT};
pub use rate_limit::{Endpoint, RateLimitDecision, RateLimiter};
