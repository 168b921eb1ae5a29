//! Configuration module for the hostsweep scanner

use crate::resolver::ResolverKind;
use crate::scanner::SortOrder;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default number of concurrent resolver workers
pub const DEFAULT_THREADS: usize = 10;

/// Default per-lookup timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Largest network expanded without an explicit override (a /16)
pub const DEFAULT_MAX_ADDRESSES: u64 = 65536;

/// Main configuration structure for sweep operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Network to sweep, e.g. `192.168.1.0/24`
    pub network: String,

    /// Number of concurrent resolver workers
    pub threads: usize,

    /// Resolution strategy
    pub resolver: ResolverKind,

    /// Final ordering of the report
    pub sort_order: SortOrder,

    /// Timeout for each lookup in milliseconds
    pub timeout: u64,

    /// Upper bound on the number of addresses a sweep may enqueue
    pub max_addresses: u64,

    /// External NetBIOS query tool
    pub netbios: NetbiosConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            network: String::new(),
            threads: DEFAULT_THREADS,
            resolver: ResolverKind::ReverseDns,
            sort_order: SortOrder::Address,
            timeout: DEFAULT_TIMEOUT_MS,
            max_addresses: DEFAULT_MAX_ADDRESSES,
            netbios: NetbiosConfig::default(),
        }
    }
}

/// How the NetBIOS query tool is invoked.
///
/// `{address}` in `args` is replaced by the address being queried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetbiosConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for NetbiosConfig {
    #[cfg(windows)]
    fn default() -> Self {
        Self {
            program: "nbtstat".to_string(),
            args: vec!["-a".to_string(), "{address}".to_string()],
        }
    }

    #[cfg(not(windows))]
    fn default() -> Self {
        Self {
            program: "nmblookup".to_string(),
            args: vec!["-A".to_string(), "{address}".to_string()],
        }
    }
}

impl SweepConfig {
    /// Create a new sweep configuration
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            ..Default::default()
        }
    }

    /// Set the number of workers
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the resolution strategy
    pub fn with_resolver(mut self, resolver: ResolverKind) -> Self {
        self.resolver = resolver;
        self
    }

    /// Set the report ordering
    pub fn with_sort_order(mut self, sort_order: SortOrder) -> Self {
        self.sort_order = sort_order;
        self
    }

    /// Set the per-lookup timeout
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_addresses(mut self, max_addresses: u64) -> Self {
        self.max_addresses = max_addresses;
        self
    }

    /// Get timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    /// Load configuration from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            crate::SweepError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: SweepConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Location of the per-user config file, `~/.hostsweep.toml`
    pub fn default_config_path() -> PathBuf {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home_dir.join(".hostsweep.toml")
    }

    /// Load configuration from default locations
    pub fn load_default_config() -> Self {
        let path = Self::default_config_path();

        if path.exists() {
            match Self::from_toml_file(&path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    return config;
                }
                Err(e) => log::warn!("Ignoring {}: {}", path.display(), e),
            }
        }

        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.network.trim().is_empty() {
            return Err(crate::SweepError::ConfigError(
                "Network cannot be empty".to_string(),
            ));
        }

        if self.threads < 1 {
            return Err(crate::SweepError::ConfigError(
                "Thread count must be at least 1".to_string(),
            ));
        }

        if self.timeout == 0 {
            return Err(crate::SweepError::ConfigError(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if self.max_addresses == 0 {
            return Err(crate::SweepError::ConfigError(
                "max_addresses must be greater than 0".to_string(),
            ));
        }

        if self.resolver == ResolverKind::Netbios && self.netbios.program.trim().is_empty() {
            return Err(crate::SweepError::ConfigError(
                "NetBIOS program cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
