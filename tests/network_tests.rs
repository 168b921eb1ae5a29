//! Property tests for CIDR expansion

use hostsweep::{CidrNetwork, SweepError};
use proptest::prelude::*;
use std::net::Ipv4Addr;

fn network_for(raw: u32, prefix: u8) -> CidrNetwork {
    let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) };
    let spec = format!("{}/{}", Ipv4Addr::from(raw & mask), prefix);
    CidrNetwork::parse(&spec).unwrap()
}

proptest! {
    #[test]
    fn expansion_covers_exactly_the_prefix(raw in any::<u32>(), prefix in 18u8..=32) {
        let net = network_for(raw, prefix);
        let addrs: Vec<u32> = net.addresses().map(u32::from).collect();

        prop_assert_eq!(addrs.len() as u64, 1u64 << (32 - prefix));
        prop_assert_eq!(addrs.len() as u64, net.size());
        prop_assert!(addrs.windows(2).all(|w| w[1] == w[0] + 1));
        prop_assert_eq!(addrs[0], u32::from(net.network()));
        prop_assert_eq!(*addrs.last().unwrap(), u32::from(net.broadcast()));
        prop_assert!(addrs.iter().all(|&a| net.contains(Ipv4Addr::from(a))));
    }

    #[test]
    fn host_bits_are_rejected(raw in any::<u32>(), prefix in 0u8..32) {
        let host_mask = u32::MAX >> prefix;
        prop_assume!(raw & host_mask != 0);
        let spec = format!("{}/{}", Ipv4Addr::from(raw), prefix);
        prop_assert!(matches!(CidrNetwork::parse(&spec), Err(SweepError::InvalidNetwork(_))));
    }

    #[test]
    fn display_round_trips(raw in any::<u32>(), prefix in 0u8..=32) {
        let net = network_for(raw, prefix);
        prop_assert_eq!(net.to_string().parse::<CidrNetwork>().unwrap(), net);
    }
}

#[test]
fn test_whole_address_space_is_lazy() {
    let net = CidrNetwork::parse("0.0.0.0/0").unwrap();
    assert_eq!(net.size(), 1u64 << 32);

    let first: Vec<Ipv4Addr> = net.addresses().take(3).collect();
    assert_eq!(
        first,
        vec![
            Ipv4Addr::new(0, 0, 0, 0),
            Ipv4Addr::new(0, 0, 0, 1),
            Ipv4Addr::new(0, 0, 0, 2),
        ]
    );
}

#[test]
fn test_invalid_octet_rejected() {
    let err = CidrNetwork::parse("999.1.1.1/24").unwrap_err();
    assert!(err.is_configuration_error());
    assert!(err.to_string().contains("999.1.1.1"));
}
