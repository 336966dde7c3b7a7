//! Uploaded file validation.
//!
//! Checks run in a fixed order and the first failure wins:
//! size, emptiness, extension, MIME type, extension/MIME pairing,
//! magic number, filename characters.

use sha2::{Digest, Sha256};

use crate::config::UploadConfig;
use crate::validation::image;
use crate::validation::result::{ValidationErrorKind as Kind, ValidationFailure, ValidationResult};

/// A file as received from the client, not yet trusted.
#[derive(Debug, Clone)]
pub struct RawUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

/// Image bytes that passed validation. Only the validator constructs these.
#[derive(Debug, Clone)]
pub struct ValidatedImage {
    bytes: Vec<u8>,
    mime: String,
}

impl ValidatedImage {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Hex SHA-256 of the content.
    pub fn content_hash(&self) -> String {
        format!("{:x}", Sha256::digest(&self.bytes))
    }

    /// `(width, height)`, or zeros when the header is unreadable.
    pub fn dimensions(&self) -> (u32, u32) {
        image::dimensions(&self.bytes).unwrap_or((0, 0))
    }
}

/// Validates uploaded and fetched image files.
#[derive(Debug, Clone)]
pub struct FileValidator {
    config: UploadConfig,
}

impl FileValidator {
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    pub fn max_file_size(&self) -> usize {
        self.config.max_file_size
    }

    /// Validate a client upload.
    pub fn validate(&self, upload: RawUpload) -> ValidationResult<ValidatedImage> {
        self.check_size(upload.bytes.len())?;

        let extension = extension_of(&upload.filename);
        let allowed = extension
            .as_ref()
            .is_some_and(|ext| self.config.allowed_extensions.contains(ext));
        if !allowed {
            return Err(ValidationFailure::new(
                Kind::BadExtension,
                format!(
                    "Unsupported format. Use: {}",
                    self.config.allowed_extensions.join(", ")
                ),
            ));
        }

        let mime = normalize_mime(&upload.content_type);
        let expected_extensions = self.allowed_mime(&mime)?;
        if let Some(ext) = &extension {
            if !expected_extensions.contains(ext) {
                return Err(ValidationFailure::new(
                    Kind::MimeExtensionMismatch,
                    "File extension does not match the file type",
                ));
            }
        }

        self.check_signature(&mime, &upload.bytes)?;

        if !is_safe_filename(&upload.filename) {
            return Err(ValidationFailure::new(
                Kind::BadName,
                "File name may only contain letters, digits, dots and hyphens",
            ));
        }

        Ok(ValidatedImage {
            bytes: upload.bytes,
            mime,
        })
    }

    /// Validate bytes obtained from a URL fetch or page capture. There is no
    /// client filename, so only size, MIME and signature apply.
    pub fn validate_fetched(&self, bytes: Vec<u8>, content_type: &str) -> ValidationResult<ValidatedImage> {
        self.check_size(bytes.len())?;
        let mime = normalize_mime(content_type);
        self.allowed_mime(&mime)?;
        self.check_signature(&mime, &bytes)?;
        Ok(ValidatedImage { bytes, mime })
    }

    fn check_size(&self, len: usize) -> ValidationResult<()> {
        if len > self.config.max_file_size {
            return Err(ValidationFailure::new(
                Kind::TooLarge,
                format!(
                    "File too large. Maximum allowed: {}MB",
                    self.config.max_file_size / (1024 * 1024)
                ),
            ));
        }
        if len == 0 {
            return Err(ValidationFailure::new(Kind::Empty, "Empty files are not allowed"));
        }
        Ok(())
    }

    fn allowed_mime(&self, mime: &str) -> ValidationResult<&Vec<String>> {
        self.config.mime_types.get(mime).ok_or_else(|| {
            ValidationFailure::new(Kind::BadMimeType, "Unsupported file type")
        })
    }

    fn check_signature(&self, mime: &str, bytes: &[u8]) -> ValidationResult<()> {
        let matches = self
            .config
            .signatures
            .get(mime)
            .is_some_and(|signature| bytes.starts_with(signature));
        if matches {
            Ok(())
        } else {
            Err(ValidationFailure::new(
                Kind::BadSignature,
                "File content does not match its declared type",
            ))
        }
    }
}

fn extension_of(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| format!(".{}", ext.to_ascii_lowercase()))
}

fn normalize_mime(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}
