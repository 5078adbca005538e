//! Input checks for tracker URLs, names and selectors.

use std::net::IpAddr;

use url::{Host, Url};

use crate::error::PricewatchError;

pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_SELECTOR_LENGTH: usize = 500;

/// Why a tracker URL was refused.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("could not parse url: {0}")]
    Malformed(String),
    #[error("unsupported scheme '{0}', only http and https are allowed")]
    Scheme(String),
    #[error("url has no host")]
    MissingHost,
    #[error("host {0} does not resolve")]
    Unresolvable(String),
    #[error("host {host} resolves to non-public address {addr}")]
    NonPublic { host: String, addr: IpAddr },
}

/// Host of `url` in lower case, without a leading `www.`.
pub fn domain_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").map(str::to_string).unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Parses `url` and checks scheme and host without touching the network.
pub fn check_url_shape(url: &str) -> Result<Url, ValidationError> {
    let parsed = Url::parse(url.trim()).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(ValidationError::Scheme(other.to_string())),
    }
    if parsed.host().is_none() {
        return Err(ValidationError::MissingHost);
    }
    Ok(parsed)
}

/// Accepts only public http(s) URLs: the host must resolve and none of its
/// addresses may be private, loopback, link-local, unspecified or multicast.
pub async fn validate_tracker_url(url: &str) -> Result<Url, ValidationError> {
    let parsed = check_url_shape(url)?;
    let port = parsed.port_or_known_default().unwrap_or(80);

    let (host, addrs): (String, Vec<IpAddr>) = match parsed.host() {
        Some(Host::Ipv4(ip)) => (ip.to_string(), vec![IpAddr::V4(ip)]),
        Some(Host::Ipv6(ip)) => (ip.to_string(), vec![IpAddr::V6(ip)]),
        Some(Host::Domain(name)) => {
            let resolved = tokio::net::lookup_host((name, port))
                .await
                .map_err(|_| ValidationError::Unresolvable(name.to_string()))?;
            (name.to_string(), resolved.map(|sa| sa.ip()).collect())
        }
        None => return Err(ValidationError::MissingHost),
    };

    if addrs.is_empty() {
        return Err(ValidationError::Unresolvable(host));
    }
    if let Some(addr) = addrs.into_iter().find(|a| !is_public_ip(*a)) {
        return Err(ValidationError::NonPublic { host, addr });
    }
    Ok(parsed)
}

/// Whether `ip` is routable on the public internet.
pub fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_multicast()
                || v4.is_broadcast())
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_public_ip(IpAddr::V4(mapped));
            }
            let first = v6.segments()[0];
            let unique_local = (first & 0xfe00) == 0xfc00;
            let link_local = (first & 0xffc0) == 0xfe80;
            !(v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_multicast()
                || unique_local
                || link_local)
        }
    }
}

/// Strip ASCII control characters, trim whitespace, and enforce a
/// byte-length limit.
pub fn sanitize_text(input: &str, max_len: usize) -> Result<String, PricewatchError> {
    if input.len() > max_len {
        return Err(PricewatchError::InvalidInput(format!(
            "input exceeds maximum length of {} bytes",
            max_len
        )));
    }
    let sanitized: String = input
        .chars()
        .filter(|c| !c.is_ascii_control() || *c == ' ')
        .collect::<String>()
        .trim()
        .to_string();
    if sanitized.is_empty() {
        return Err(PricewatchError::InvalidInput(
            "input is empty after sanitization".to_string(),
        ));
    }
    Ok(sanitized)
}

pub fn validate_name(input: &str) -> Result<String, PricewatchError> {
    sanitize_text(input, MAX_NAME_LENGTH)
}

/// A selector must be non-empty and parse as CSS.
pub fn validate_selector(input: &str) -> Result<String, PricewatchError> {
    let selector = sanitize_text(input, MAX_SELECTOR_LENGTH)?;
    scraper::Selector::parse(&selector).map_err(|e| {
        PricewatchError::InvalidInput(format!("invalid CSS selector '{}': {:?}", selector, e))
    })?;
    Ok(selector)
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;

    #[test]
    fn domain_strips_www_and_case() {
        assert_eq!(domain_of("https://WWW.Shop.example/p/1").as_deref(), Some("shop.example"));
        assert_eq!(domain_of("http://shop.example:8080/").as_deref(), Some("shop.example"));
        assert_eq!(domain_of("not a url"), None);
    }

    #[test]
    fn shape_rejects_other_schemes() {
        assert!(matches!(check_url_shape("ftp://shop.example/"), Err(ValidationError::Scheme(_))));
        assert!(matches!(check_url_shape("file:///etc/passwd"), Err(ValidationError::Scheme(_))));
        assert!(matches!(check_url_shape("nope"), Err(ValidationError::Malformed(_))));
        assert!(check_url_shape("https://shop.example/item").is_ok());
    }

    #[test]
    fn private_ranges_are_not_public() {
        for ip in [
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3)),
            IpAddr::V4(Ipv4Addr::new(192, 168, 0, 1)),
            IpAddr::V4(Ipv4Addr::new(172, 16, 5, 5)),
            IpAddr::V4(Ipv4Addr::new(169, 254, 1, 1)),
            IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            IpAddr::V4(Ipv4Addr::new(224, 0, 0, 1)),
            IpAddr::V6(Ipv6Addr::LOCALHOST),
            IpAddr::V6("fe80::1".parse().unwrap()),
            IpAddr::V6("fd00::1".parse().unwrap()),
            IpAddr::V6("::ffff:10.0.0.1".parse().unwrap()),
        ] {
            assert!(!is_public_ip(ip), "{ip} should not be public");
        }
        assert!(is_public_ip(IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34))));
        assert!(is_public_ip(IpAddr::V6("2606:4700::1111".parse().unwrap())));
    }

    #[tokio::test]
    async fn literal_addresses_are_checked_without_dns() {
        assert!(validate_tracker_url("http://93.184.216.34/item").await.is_ok());
        assert!(matches!(
            validate_tracker_url("http://127.0.0.1:8080/").await,
            Err(ValidationError::NonPublic { .. })
        ));
        assert!(matches!(
            validate_tracker_url("http://[::1]/").await,
            Err(ValidationError::NonPublic { .. })
        ));
    }

    #[test]
    fn names_are_sanitized() {
        assert_eq!(validate_name("  Desk\tlamp ").unwrap(), "Desklamp");
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn selectors_must_parse() {
        assert_eq!(validate_selector(" span.price ").unwrap(), "span.price");
        assert!(validate_selector("span[").is_err());
    }
}
