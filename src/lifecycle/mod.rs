//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     broadcast → HTTP server drains → sweepers exit
//!
//! Sweepers (sweeper.rs):
//!     interval tick → cache / rate-limit sweep → metrics
//! ```
//!
//! # Design Decisions
//! - One broadcast channel fans shutdown out to every background task
//! - Background tasks own an `Arc` to their target; no globals

pub mod shutdown;
pub mod signals;
pub mod sweeper;

pub use shutdown::Shutdown;
pub use signals::{spawn_signal_listener, wait_for_signal};
pub use sweeper::{spawn_sweeper, Sweep};
