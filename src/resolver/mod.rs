//! Name resolution strategies
//!
//! A [`NameResolver`] turns one address into a [`ResolutionRecord`]. Two
//! strategies ship with the crate: system reverse DNS and an external
//! NetBIOS query tool. The strategy is chosen once per sweep.

pub mod dns;
pub mod netbios;

use crate::config::SweepConfig;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::Arc;

pub use dns::ReverseDnsResolver;
pub use netbios::NetbiosResolver;

/// Outcome of resolving a single address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub address: Ipv4Addr,
    pub name: Option<String>,
}

impl ResolutionRecord {
    /// A record for an address that resolved to `name`
    pub fn resolved(address: Ipv4Addr, name: impl Into<String>) -> Self {
        Self {
            address,
            name: Some(name.into()),
        }
    }

    /// A record for an address with no discoverable name
    pub fn unresolved(address: Ipv4Addr) -> Self {
        Self { address, name: None }
    }

    pub fn is_valid(&self) -> bool {
        self.name.is_some()
    }

    pub fn hostname(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Display for ResolutionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} is \"{}\"", self.address, name),
            None => write!(f, "{}: unknown host", self.address),
        }
    }
}

/// Resolution strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolverKind {
    ReverseDns,
    Netbios,
}

impl FromStr for ResolverKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dns" | "reverse-dns" | "rdns" => Ok(ResolverKind::ReverseDns),
            "netbios" | "nbtstat" | "nbt" => Ok(ResolverKind::Netbios),
            _ => Err(format!("Unknown resolver: {}", s)),
        }
    }
}

impl fmt::Display for ResolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverKind::ReverseDns => write!(f, "reverse-dns"),
            ResolverKind::Netbios => write!(f, "netbios"),
        }
    }
}

/// Resolve one address to a name.
///
/// `Ok` with an unresolved record means "no name found". `Err` is reserved
/// for failures of the resolution machinery itself.
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Short name used in logs
    fn label(&self) -> &str;

    /// Checks run once before any address is queued
    async fn preflight(&self) -> Result<()> {
        Ok(())
    }

    async fn resolve(&self, address: Ipv4Addr) -> Result<ResolutionRecord>;
}

/// Build the resolver selected by the configuration
pub fn from_config(config: &SweepConfig) -> Arc<dyn NameResolver> {
    match config.resolver {
        ResolverKind::ReverseDns => Arc::new(ReverseDnsResolver::new()),
        ResolverKind::Netbios => Arc::new(NetbiosResolver::new(&config.netbios)),
    }
}
