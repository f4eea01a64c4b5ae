//! URL validation for outbound fetches (SSRF protection)
//!
//! User-supplied URLs fetched by the server must:
//! - use http or https
//! - name a host, not a raw IP address
//! - resolve only to public addresses

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use thiserror::Error;
use tracing::warn;
use url::Url;

#[derive(Debug, Error)]
pub enum UrlValidationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(#[from] url::ParseError),

    #[error("URL scheme must be http or https, got: {0}")]
    UnsupportedScheme(String),

    #[error("URL must have a host")]
    MissingHost,

    #[error("URL resolves to private/internal IP address: {0}")]
    PrivateIpDetected(IpAddr),

    #[error("Failed to resolve hostname: {0}")]
    DnsResolutionFailed(String),

    #[error("URL host is a raw IP address which is not allowed")]
    RawIpNotAllowed,
}

/// Loopback, private, link-local, broadcast, unspecified, documentation,
/// CGNAT (100.64.0.0/10) and benchmarking (198.18.0.0/15) ranges
pub fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_unspecified()
        || ip.is_documentation()
        || (a == 100 && (b & 0xC0) == 64)
        || (a == 198 && (b == 18 || b == 19))
}

/// Loopback, unspecified, link-local (fe80::/10), unique local (fc00::/7),
/// documentation (2001:db8::/32) and IPv4-mapped private addresses
pub fn is_private_ipv6(ip: &Ipv6Addr) -> bool {
    let segments = ip.segments();
    if ip.is_loopback()
        || ip.is_unspecified()
        || segments[0] & 0xFFC0 == 0xFE80
        || segments[0] & 0xFE00 == 0xFC00
        || (segments[0] == 0x2001 && segments[1] == 0x0DB8)
    {
        return true;
    }
    ip.to_ipv4_mapped().is_some_and(|v4| is_private_ipv4(&v4))
}

pub fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => is_private_ipv4(ipv4),
        IpAddr::V6(ipv6) => is_private_ipv6(ipv6),
    }
}

/// Validate a URL the server is about to fetch on a user's behalf
///
/// # Example
/// ```rust,ignore
/// use pitchvoice::utils::url_validation::validate_public_url;
///
/// assert!(validate_public_url("https://example.com/pricing").await.is_ok());
/// assert!(validate_public_url("http://localhost:8080/admin").await.is_err());
/// assert!(validate_public_url("https://10.0.0.1/").await.is_err());
/// ```
pub async fn validate_public_url(url: &str) -> Result<Url, UrlValidationError> {
    validate_url(url, false).await
}

/// Like [`validate_public_url`], but loopback IP literals are accepted.
///
/// Only for local development and tests that fetch from a local server.
pub async fn validate_url(url: &str, allow_loopback: bool) -> Result<Url, UrlValidationError> {
    let parsed = Url::parse(url.trim())?;

    let scheme = parsed.scheme();
    if scheme != "https" && scheme != "http" {
        return Err(UrlValidationError::UnsupportedScheme(scheme.to_string()));
    }

    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or(UrlValidationError::MissingHost)?
        .to_string();

    let is_loopback = match parsed.host() {
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        _ => false,
    };
    if allow_loopback && is_loopback {
        return Ok(parsed);
    }

    // host() tells IP literals apart; host_str() brackets IPv6
    match parsed.host() {
        Some(url::Host::Ipv4(_)) | Some(url::Host::Ipv6(_)) => {
            warn!(host = %host, "URL contains raw IP address");
            return Err(UrlValidationError::RawIpNotAllowed);
        }
        Some(url::Host::Domain(_)) => {}
        None => return Err(UrlValidationError::MissingHost),
    }

    let port = parsed.port_or_known_default().unwrap_or(443);
    resolve_public_host(&host, port).await?;

    Ok(parsed)
}

/// Resolve a host name, failing if any address it resolves to is private
pub async fn resolve_public_host(
    host: &str,
    port: u16,
) -> Result<Vec<SocketAddr>, UrlValidationError> {
    let addrs: Vec<_> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| UrlValidationError::DnsResolutionFailed(format!("{host}: {e}")))?
        .collect();

    if addrs.is_empty() {
        return Err(UrlValidationError::DnsResolutionFailed(format!(
            "No addresses found for {host}"
        )));
    }

    if let Some(addr) = addrs.iter().find(|addr| is_private_ip(&addr.ip())) {
        warn!(
            host = %host,
            resolved_ip = %addr.ip(),
            "Host resolves to private IP address (SSRF protection)"
        );
        return Err(UrlValidationError::PrivateIpDetected(addr.ip()));
    }

    Ok(addrs)
}
