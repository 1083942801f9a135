//! Device name resolution.
//!
//! IPv4 literals pass through untouched. Anything else is treated as a host
//! name, qualified with the organisation's DNS suffix and looked up.

use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr};
use tracing::debug;

/// What the operator's device string turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostQuery {
    /// Already an IPv4 address.
    Address(Ipv4Addr),
    /// A fully qualified name that still needs a DNS lookup.
    Name(String),
}

/// Classifies `input` and qualifies bare names with `domain`.
///
/// `domain` may be given with or without its leading dot.
pub fn qualify(input: &str, domain: &str) -> HostQuery {
    let clean = input.trim();
    if let Ok(addr) = clean.parse::<Ipv4Addr>() {
        return HostQuery::Address(addr);
    }

    let domain = domain.trim().trim_start_matches('.');
    if domain.is_empty() {
        return HostQuery::Name(clean.to_string());
    }
    let suffix = format!(".{}", domain);
    if clean.ends_with(&suffix) {
        HostQuery::Name(clean.to_string())
    } else {
        HostQuery::Name(format!("{}{}", clean, suffix))
    }
}

/// Looks up IPv4 addresses for host names.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Returns the first IPv4 address for `name`, or `None` if it has none.
    async fn lookup(&self, name: &str) -> Option<Ipv4Addr>;
}

/// Resolver backed by the system resolver.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn lookup(&self, name: &str) -> Option<Ipv4Addr> {
        let addrs = match tokio::net::lookup_host((name, 0)).await {
            Ok(addrs) => addrs,
            Err(e) => {
                debug!(name = %name, error = %e, "DNS lookup failed");
                return None;
            }
        };
        addrs.into_iter().find_map(|addr| match addr.ip() {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_qualify_ipv4_literal() {
        assert_eq!(
            qualify(" 10.20.30.40 ", "example.org"),
            HostQuery::Address(Ipv4Addr::new(10, 20, 30, 40))
        );
    }

    #[test]
    fn test_qualify_appends_domain() {
        assert_eq!(
            qualify("access-sw3", "example.org"),
            HostQuery::Name("access-sw3.example.org".to_string())
        );
        assert_eq!(
            qualify("access-sw3", ".example.org"),
            HostQuery::Name("access-sw3.example.org".to_string())
        );
    }

    #[test]
    fn test_qualify_keeps_existing_domain() {
        assert_eq!(
            qualify("access-sw3.example.org", "example.org"),
            HostQuery::Name("access-sw3.example.org".to_string())
        );
    }

    #[test]
    fn test_qualify_without_domain() {
        assert_eq!(
            qualify("access-sw3", ""),
            HostQuery::Name("access-sw3".to_string())
        );
    }

    #[test]
    fn test_qualify_rejects_partial_ipv4() {
        assert_eq!(
            qualify("10.1.1", "example.org"),
            HostQuery::Name("10.1.1.example.org".to_string())
        );
    }

    #[tokio::test]
    async fn test_system_resolver_unknown_name() {
        let addr = SystemResolver.lookup("no-such-switch.invalid.").await;
        assert_eq!(addr, None);
    }
}
