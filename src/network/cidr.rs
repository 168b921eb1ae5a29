//! CIDR expansion for IPv4 networks
//!
//! A [`CidrNetwork`] denotes every address under its prefix, network and
//! broadcast addresses included. Expansion is lazy and can be restarted any
//! number of times.

use crate::{Result, SweepError};
use ipnetwork::Ipv4Network;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// A validated IPv4 network specification (`a.b.c.d/p`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CidrNetwork {
    inner: Ipv4Network,
}

impl CidrNetwork {
    /// Parse a network specification.
    ///
    /// Accepts `address/prefix`, `address/netmask` or a bare address
    /// (treated as `/32`). The address must be a strict dotted quad and must
    /// not have host bits set for the given prefix.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(SweepError::InvalidNetwork("network cannot be empty".to_string()));
        }

        // ipnetwork pads short forms like "10.0.0", so check the quad first
        let addr_part = spec.split_once('/').map_or(spec, |(addr, _)| addr);
        let address = Ipv4Addr::from_str(addr_part)
            .map_err(|_| SweepError::InvalidNetwork(format!("invalid IPv4 address: {}", addr_part)))?;

        let inner = Ipv4Network::from_str(spec)
            .map_err(|e| SweepError::InvalidNetwork(format!("{}: {}", spec, e)))?;

        if inner.network() != address {
            return Err(SweepError::InvalidNetwork(format!(
                "{} has host bits set (did you mean {}/{}?)",
                spec,
                inner.network(),
                inner.prefix()
            )));
        }

        Ok(Self { inner })
    }

    pub fn network(&self) -> Ipv4Addr {
        self.inner.network()
    }

    pub fn broadcast(&self) -> Ipv4Addr {
        self.inner.broadcast()
    }

    pub fn prefix(&self) -> u8 {
        self.inner.prefix()
    }

    /// Number of addresses the prefix denotes, `2^(32 - prefix)`.
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix()))
    }

    /// Iterate every address in ascending numeric order.
    pub fn addresses(&self) -> AddressIter {
        AddressIter {
            next: u64::from(u32::from(self.network())),
            end: u64::from(u32::from(self.broadcast())),
        }
    }

    pub fn contains(&self, address: Ipv4Addr) -> bool {
        self.inner.contains(address)
    }
}

impl FromStr for CidrNetwork {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CidrNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network(), self.prefix())
    }
}

/// Ascending iterator over the addresses of a [`CidrNetwork`]
#[derive(Debug, Clone)]
pub struct AddressIter {
    // u64 so that 255.255.255.255 can be yielded without wrapping
    next: u64,
    end: u64,
}

impl Iterator for AddressIter {
    type Item = Ipv4Addr;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.end {
            return None;
        }
        let addr = Ipv4Addr::from(self.next as u32);
        self.next += 1;
        Some(addr)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end + 1).saturating_sub(self.next);
        match usize::try_from(remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}
