//! Scanner module containing the sweep engine

pub mod engine;
pub mod queue;

use crate::resolver::ResolutionRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub use engine::SweepEngine;
pub use queue::WorkQueue;

/// Ordering applied to the final report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Numeric address order
    #[default]
    Address,
    /// Hostname order, ties broken by address
    Hostname,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "address" | "ip" => Ok(SortOrder::Address),
            "hostname" | "name" => Ok(SortOrder::Hostname),
            _ => Err(format!("Unknown sort order: {}", s)),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Address => write!(f, "address"),
            SortOrder::Hostname => write!(f, "hostname"),
        }
    }
}

/// Complete sweep result: the named hosts plus bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResult {
    /// Network that was swept
    pub network: String,

    /// When the sweep started
    pub started_at: DateTime<Utc>,

    /// Valid records only, in report order
    pub records: Vec<ResolutionRecord>,

    /// Total sweep duration
    pub duration: Duration,

    /// Sweep statistics
    pub stats: SweepStats,
}

impl SweepResult {
    pub fn new(network: String) -> Self {
        Self {
            network,
            started_at: Utc::now(),
            records: Vec::new(),
            duration: Duration::from_secs(0),
            stats: SweepStats::default(),
        }
    }

    /// Sort records for the report
    pub fn sort(&mut self, order: SortOrder) {
        match order {
            SortOrder::Address => self.records.sort_by_key(|r| r.address),
            SortOrder::Hostname => self
                .records
                .sort_by(|a, b| a.name.cmp(&b.name).then(a.address.cmp(&b.address))),
        }
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration = duration;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Per-sweep counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepStats {
    /// Addresses put on the queue
    pub enumerated: u64,

    /// Addresses processed and acknowledged by a worker
    pub acknowledged: u64,

    /// Addresses that resolved to a name
    pub resolved: u64,

    /// Addresses with no discoverable name
    pub misses: u64,

    /// Lookups abandoned after the timeout
    pub timeouts: u64,

    /// Lookups where the resolver itself failed
    pub tool_failures: u64,
}

impl SweepStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share of acknowledged addresses that resolved
    pub fn hit_rate(&self) -> f64 {
        if self.acknowledged == 0 {
            0.0
        } else {
            self.resolved as f64 / self.acknowledged as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn sample() -> SweepResult {
        let mut result = SweepResult::new("10.0.0.0/24".to_string());
        result.records = vec![
            ResolutionRecord::resolved(Ipv4Addr::new(10, 0, 0, 20), "alpha"),
            ResolutionRecord::resolved(Ipv4Addr::new(10, 0, 0, 3), "zulu"),
            ResolutionRecord::resolved(Ipv4Addr::new(10, 0, 0, 100), "alpha"),
            ResolutionRecord::resolved(Ipv4Addr::new(10, 0, 0, 9), "mike"),
        ];
        result
    }

    #[test]
    fn test_address_sort_is_numeric() {
        let mut result = sample();
        result.sort(SortOrder::Address);
        let order: Vec<u8> = result.records.iter().map(|r| r.address.octets()[3]).collect();
        assert_eq!(order, vec![3, 9, 20, 100]);
    }

    #[test]
    fn test_hostname_sort_breaks_ties_by_address() {
        let mut result = sample();
        result.sort(SortOrder::Hostname);
        let order: Vec<(String, u8)> = result
            .records
            .iter()
            .map(|r| (r.name.clone().unwrap(), r.address.octets()[3]))
            .collect();
        assert_eq!(
            order,
            vec![
                ("alpha".to_string(), 20),
                ("alpha".to_string(), 100),
                ("mike".to_string(), 9),
                ("zulu".to_string(), 3),
            ]
        );
    }

    #[test]
    fn test_sort_order_parsing() {
        assert_eq!("hostname".parse::<SortOrder>(), Ok(SortOrder::Hostname));
        assert_eq!("IP".parse::<SortOrder>(), Ok(SortOrder::Address));
        assert!("random".parse::<SortOrder>().is_err());
    }

    #[test]
    fn test_hit_rate() {
        let stats = SweepStats {
            acknowledged: 4,
            resolved: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.25).abs() < f64::EPSILON);
        assert_eq!(SweepStats::new().hit_rate(), 0.0);
    }
}
