//! Error handling for the hostsweep scanner
//!
//! Configuration-level errors abort a sweep before any address is queued.
//! Per-address failures are recorded in the sweep statistics and never stop
//! the worker pool.

use std::net::Ipv4Addr;
use thiserror::Error;

/// Main error type for sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Invalid network: {0}")]
    InvalidNetwork(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("External tool `{tool}` failed: {reason}")]
    ExternalToolError { tool: String, reason: String },

    #[error("Lookup for {0} timed out")]
    TimeoutError(Ipv4Addr),

    #[error("Resolver error: {0}")]
    ResolverError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Output error: {0}")]
    OutputError(String),
}

impl SweepError {
    /// Errors the user caused through arguments or config files.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            SweepError::InvalidNetwork(_) | SweepError::ConfigError(_) | SweepError::ParseError(_)
        )
    }

    pub fn external_tool(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        SweepError::ExternalToolError {
            tool: tool.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for SweepError {
    fn from(err: serde_json::Error) -> Self {
        SweepError::OutputError(err.to_string())
    }
}

impl From<csv::Error> for SweepError {
    fn from(err: csv::Error) -> Self {
        SweepError::OutputError(err.to_string())
    }
}

impl From<toml::de::Error> for SweepError {
    fn from(err: toml::de::Error) -> Self {
        SweepError::ParseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_are_classified() {
        assert!(SweepError::InvalidNetwork("999.1.1.1/24".into()).is_configuration_error());
        assert!(SweepError::ConfigError("threads".into()).is_configuration_error());
        assert!(!SweepError::external_tool("nbtstat", "missing").is_configuration_error());
        assert!(!SweepError::TimeoutError(Ipv4Addr::LOCALHOST).is_configuration_error());
    }

    #[test]
    fn test_external_tool_message() {
        let err = SweepError::external_tool("nmblookup", "exit status 1");
        assert_eq!(err.to_string(), "External tool `nmblookup` failed: exit status 1");
    }
}
