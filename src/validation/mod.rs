//! Input validation subsystem.
//!
//! # Data Flow
//! ```text
//! Upload (bytes, filename, MIME)
//!     → file.rs (size → empty → extension → MIME → pairing → magic number → name)
//!     → ValidatedImage (only constructible here)
//!
//! URL string
//!     → url.rs (format → denylist → IP-literal allow-list)
//!     → Url
//!     → url.rs verify_resolution (again, right before network I/O)
//! ```
//!
//! # Design Decisions
//! - First failure wins; every failure carries a kind, severity and client-safe message
//! - Pure computation over bytes already in memory; no I/O except DNS re-check
//! - Fail closed: anything not explicitly allowed is rejected

pub mod file;
pub mod image;
pub mod result;
pub mod url;

pub use file::{FileValidator, RawUpload, ValidatedImage};
pub use result::{Severity, ValidationErrorKind, ValidationFailure, ValidationResult};
pub use url::{is_forbidden_ip, verify_resolution, UrlValidator};
