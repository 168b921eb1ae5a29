//! hostsweep - find the named hosts on an IPv4 subnet
//!
//! Every address of a CIDR network is queued and resolved by a fixed pool of
//! workers, either through reverse DNS or an external NetBIOS query tool.
//! Only addresses that resolve to a name are reported.

pub mod config;
pub mod error;
pub mod network;
pub mod output;
pub mod resolver;
pub mod scanner;

// Re-export commonly used types
pub use config::SweepConfig;
pub use error::SweepError;
pub use network::CidrNetwork;
pub use resolver::{NameResolver, ResolutionRecord, ResolverKind};
pub use scanner::{SortOrder, SweepEngine, SweepResult, SweepStats};

pub type Result<T> = std::result::Result<T, SweepError>;
