//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! Validated request data
//!     → key.rs (namespace + sorted params → deterministic key)
//!     → store.rs get (lazy expiry on read)
//!     → hit: payload returned as-is
//!     → miss: caller computes, then store.rs set with the namespace TTL
//!
//! Sweeper (lifecycle) → store.rs sweep (eager expiry, memory only)
//! ```
//!
//! # Design Decisions
//! - Keys are only derived from validated data
//! - Liveness is computed on every read; the sweep never decides correctness
//! - Process-local; a multi-instance deployment needs a shared store

pub mod key;
pub mod store;

pub use key::{generate_key, normalize_context, Namespace, DEFAULT_CONTEXT};
pub use store::{CacheStats, CacheStore};
