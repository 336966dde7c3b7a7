//! Validation verdict types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the client should present a failure.
///
/// `Error` means "retry with different input"; `Warning` means the input could
/// work under adjusted limits; `Info` is neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

/// Why an input was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    TooLarge,
    Empty,
    BadExtension,
    BadMimeType,
    MimeExtensionMismatch,
    BadSignature,
    BadName,
    UnsafeUrl,
    BadUrlFormat,
    /// The request body itself could not be read (bad multipart, bad JSON).
    Malformed,
}

impl ValidationErrorKind {
    /// Default severity for the kind. Only size violations are advisory.
    pub fn severity(&self) -> Severity {
        match self {
            ValidationErrorKind::TooLarge => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// A rejected input, with a message safe to show the client.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ValidationFailure {
    pub kind: ValidationErrorKind,
    pub severity: Severity,
    pub message: String,
}

impl ValidationFailure {
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            message: message.into(),
        }
    }
}

/// Result of a validation pass.
pub type ValidationResult<T> = Result<T, ValidationFailure>;
