//! Reverse DNS resolution through the system resolver

use super::{NameResolver, ResolutionRecord};
use crate::{Result, SweepError};
use async_trait::async_trait;
use log::debug;
use std::net::{IpAddr, Ipv4Addr};

/// Resolves addresses with `getnameinfo`, requiring a registered name.
#[derive(Debug, Clone, Default)]
pub struct ReverseDnsResolver;

impl ReverseDnsResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NameResolver for ReverseDnsResolver {
    fn label(&self) -> &str {
        "reverse-dns"
    }

    async fn resolve(&self, address: Ipv4Addr) -> Result<ResolutionRecord> {
        let ip = IpAddr::V4(address);

        // getnameinfo blocks; keep it off the async workers
        let lookup = tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&ip))
            .await
            .map_err(|e| SweepError::ResolverError(format!("lookup task for {} failed: {}", address, e)))?;

        match lookup {
            Ok(name) if is_real_name(&name, address) => Ok(ResolutionRecord::resolved(address, name)),
            Ok(name) => {
                debug!("{} echoed back as {:?}, treating as unresolved", address, name);
                Ok(ResolutionRecord::unresolved(address))
            }
            Err(e) => {
                debug!("{}: {}", address, e);
                Ok(ResolutionRecord::unresolved(address))
            }
        }
    }
}

/// Some resolvers hand the numeric address back instead of failing.
fn is_real_name(name: &str, address: Ipv4Addr) -> bool {
    let name = name.trim_end_matches('.');
    !name.is_empty() && name.parse::<Ipv4Addr>() != Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_echo_is_not_a_name() {
        let addr = Ipv4Addr::new(192, 0, 2, 10);
        assert!(!is_real_name("192.0.2.10", addr));
        assert!(!is_real_name("", addr));
        assert!(!is_real_name(".", addr));
        assert!(is_real_name("printer.lan", addr));
        assert!(is_real_name("printer.lan.", addr));
    }

    #[tokio::test]
    async fn test_unregistered_address_is_a_miss() {
        // TEST-NET-1 is reserved for documentation and never has a PTR record
        let addr = Ipv4Addr::new(192, 0, 2, 77);
        let record = ReverseDnsResolver::new().resolve(addr).await.unwrap();
        assert_eq!(record.address, addr);
        assert!(!record.is_valid());
    }

    #[tokio::test]
    async fn test_loopback_lookup_succeeds() {
        let addr = Ipv4Addr::LOCALHOST;
        let record = ReverseDnsResolver::new().resolve(addr).await.unwrap();
        assert_eq!(record.address, addr);
    }
}
