//! Network address handling

pub mod cidr;

pub use cidr::{AddressIter, CidrNetwork};
