//! URL validation and SSRF defenses.
//!
//! Two stages run before any network I/O: the URL must be a well-formed
//! absolute http(s) URL, then it must clear the denylist. IP-literal hosts
//! are refused unless explicitly allow-listed. Right before a fetch or page
//! navigation, [`verify_resolution`] resolves the host and refuses internal
//! addresses so a rebinding DNS answer cannot slip through.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use url::{Host, Url};

use crate::config::UrlPolicyConfig;
use crate::validation::result::{ValidationErrorKind as Kind, ValidationFailure, ValidationResult};

const UNSAFE_MESSAGE: &str = "URL not allowed for security reasons";

/// Validates user-supplied URLs against the configured policy.
#[derive(Debug, Clone)]
pub struct UrlValidator {
    blocked_patterns: Vec<String>,
    allowed_domains: Vec<String>,
}

impl UrlValidator {
    pub fn new(config: &UrlPolicyConfig) -> Self {
        Self {
            blocked_patterns: config
                .blocked_patterns
                .iter()
                .map(|p| p.to_ascii_lowercase())
                .collect(),
            allowed_domains: config
                .allowed_domains
                .iter()
                .map(|d| d.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Parse and vet a raw URL string.
    pub fn validate(&self, raw: &str) -> ValidationResult<Url> {
        let raw = raw.trim();
        let url = Url::parse(raw).map_err(|_| bad_format("Invalid URL. Check the format."))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(bad_format("Only HTTP and HTTPS URLs are allowed."));
        }
        let host = url
            .host()
            .ok_or_else(|| bad_format("URL must include a host."))?;

        let host_text = match &host {
            Host::Domain(domain) => domain.to_ascii_lowercase(),
            Host::Ipv4(ip) => ip.to_string(),
            Host::Ipv6(ip) => ip.to_string(),
        };
        let lowered = raw.to_ascii_lowercase();

        if self
            .blocked_patterns
            .iter()
            .any(|pattern| pattern_matches(pattern, &host_text, &lowered))
        {
            return Err(unsafe_url());
        }

        let literal = match host {
            Host::Domain(_) => None,
            Host::Ipv4(ip) => Some(IpAddr::V4(ip)),
            Host::Ipv6(ip) => Some(IpAddr::V6(ip)),
        };
        if let Some(ip) = literal {
            if is_forbidden_ip(ip) || !self.is_allow_listed(&host_text) {
                return Err(unsafe_url());
            }
        }

        Ok(url)
    }

    /// Suffix match against the allow-list (`cdn.example.com` matches `example.com`).
    pub fn is_allow_listed(&self, host: &str) -> bool {
        self.allowed_domains.iter().any(|domain| {
            host == domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

/// Patterns ending in `:` are schemes and match anywhere in the URL.
/// Patterns ending in `.` are address prefixes and match the start of the host.
/// Anything else names a host: exact match, or a subdomain of it.
fn pattern_matches(pattern: &str, host: &str, full: &str) -> bool {
    if pattern.ends_with(':') {
        full.contains(pattern)
    } else if pattern.ends_with('.') {
        host.starts_with(pattern)
    } else {
        host == pattern
            || host
                .strip_suffix(pattern)
                .is_some_and(|prefix| prefix.ends_with('.'))
    }
}

/// True for addresses a server-side fetch must never reach.
pub fn is_forbidden_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_forbidden_v4(v4),
        IpAddr::V6(v6) => is_forbidden_v6(v6),
    }
}

fn is_forbidden_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_multicast()
        || ip.is_documentation()
        || a == 0
        // 100.64.0.0/10 carrier-grade NAT
        || (a == 100 && (b & 0xC0) == 64)
}

fn is_forbidden_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_forbidden_v4(v4);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        // fc00::/7 unique local
        || (first & 0xFE00) == 0xFC00
        // fe80::/10 link local
        || (first & 0xFFC0) == 0xFE80
}

/// Resolve the URL's host and refuse it if any answer is an internal address.
pub async fn verify_resolution(url: &Url) -> ValidationResult<()> {
    let host = url
        .host_str()
        .ok_or_else(|| bad_format("URL must include a host."))?;
    let port = url.port_or_known_default().unwrap_or(80);
    let host = host.trim_start_matches('[').trim_end_matches(']');

    let addrs: Vec<_> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|_| bad_format("Host could not be resolved."))?
        .collect();
    if addrs.is_empty() {
        return Err(bad_format("Host could not be resolved."));
    }
    if let Some(addr) = addrs.iter().find(|addr| is_forbidden_ip(addr.ip())) {
        tracing::warn!(host = %host, resolved = %addr.ip(), "Host resolved to an internal address");
        return Err(unsafe_url());
    }
    Ok(())
}

fn bad_format(message: &str) -> ValidationFailure {
    ValidationFailure::new(Kind::BadUrlFormat, message)
}

fn unsafe_url() -> ValidationFailure {
    ValidationFailure::new(Kind::UnsafeUrl, UNSAFE_MESSAGE)
}
