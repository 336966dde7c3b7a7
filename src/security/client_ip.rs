//! Client identity resolution.
//!
//! The header order decides who is trusted. Only put a header first if the
//! deployment guarantees an intermediary overwrites it.

use axum::http::{HeaderMap, HeaderName};

/// Identity used when no configured header is present.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Derives a rate-limit identity from request headers.
pub trait ClientIdentityResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> String;
}

/// Takes the first configured header that is present. Comma-separated values
/// (as in `x-forwarded-for`) contribute their first entry.
#[derive(Debug, Clone)]
pub struct HeaderChainResolver {
    headers: Vec<HeaderName>,
}

impl HeaderChainResolver {
    pub fn new(names: &[String]) -> Self {
        let headers = names
            .iter()
            .filter_map(|name| match HeaderName::try_from(name.as_str()) {
                Ok(header) => Some(header),
                Err(_) => {
                    tracing::warn!(header = %name, "Ignoring invalid client identity header");
                    None
                }
            })
            .collect();
        Self { headers }
    }
}

impl ClientIdentityResolver for HeaderChainResolver {
    fn resolve(&self, headers: &HeaderMap) -> String {
        self.headers
            .iter()
            .filter_map(|name| headers.get(name))
            .filter_map(|value| value.to_str().ok())
            .map(|value| value.split(',').next().unwrap_or_default().trim())
            .find(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
    }
}
