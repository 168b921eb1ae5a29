//! Output formatting and management

use crate::scanner::{SweepResult, SweepStats};
use crate::{Result, SweepError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

/// Output format options
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `<address> is "<name>"`, one host per line
    #[default]
    Text,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub file: Option<PathBuf>,
}

#[derive(Serialize)]
struct JsonHost<'a> {
    address: String,
    hostname: &'a str,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    network: &'a str,
    started_at: DateTime<Utc>,
    duration_ms: u128,
    stats: &'a SweepStats,
    hosts: Vec<JsonHost<'a>>,
}

/// Renders sweep results and writes them out
pub struct OutputManager {
    config: OutputConfig,
}

impl OutputManager {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Render the named hosts of `result` in the configured format
    pub fn render(&self, result: &SweepResult) -> Result<String> {
        match self.config.format {
            OutputFormat::Text => Ok(render_text(result)),
            OutputFormat::Json => render_json(result),
            OutputFormat::Csv => render_csv(result),
        }
    }

    /// Write the rendered result to the output file, or stdout
    pub fn write(&self, result: &SweepResult) -> Result<()> {
        let rendered = self.render(result)?;

        match &self.config.file {
            Some(path) => {
                let mut file = File::create(path).map_err(|e| {
                    SweepError::OutputError(format!("Cannot create {}: {}", path.display(), e))
                })?;
                file.write_all(rendered.as_bytes())?;
                log::info!("Results written to {}", path.display());
            }
            None => {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle.write_all(rendered.as_bytes())?;
                handle.flush()?;
            }
        }

        Ok(())
    }
}

fn render_text(result: &SweepResult) -> String {
    let mut out = String::new();
    for record in result.records.iter().filter(|r| r.is_valid()) {
        out.push_str(&record.to_string());
        out.push('\n');
    }
    out
}

fn render_json(result: &SweepResult) -> Result<String> {
    let report = JsonReport {
        network: &result.network,
        started_at: result.started_at,
        duration_ms: result.duration.as_millis(),
        stats: &result.stats,
        hosts: result
            .records
            .iter()
            .filter_map(|r| {
                r.hostname().map(|hostname| JsonHost {
                    address: r.address.to_string(),
                    hostname,
                })
            })
            .collect(),
    };

    let mut json = serde_json::to_string_pretty(&report)?;
    json.push('\n');
    Ok(json)
}

fn render_csv(result: &SweepResult) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["address", "hostname"])?;
    for record in &result.records {
        if let Some(hostname) = record.hostname() {
            writer.write_record([record.address.to_string().as_str(), hostname])?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| SweepError::OutputError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| SweepError::OutputError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolutionRecord;
    use std::net::Ipv4Addr;

    fn sample() -> SweepResult {
        let mut result = SweepResult::new("10.0.0.0/30".to_string());
        result.records = vec![
            ResolutionRecord::resolved(Ipv4Addr::new(10, 0, 0, 1), "alpha"),
            ResolutionRecord::resolved(Ipv4Addr::new(10, 0, 0, 2), "bravo, inc"),
        ];
        result
    }

    fn manager(format: OutputFormat) -> OutputManager {
        OutputManager::new(OutputConfig { format, file: None })
    }

    #[test]
    fn test_text_lines() {
        let text = manager(OutputFormat::Text).render(&sample()).unwrap();
        assert_eq!(text, "10.0.0.1 is \"alpha\"\n10.0.0.2 is \"bravo, inc\"\n");
    }

    #[test]
    fn test_text_skips_unresolved() {
        let mut result = sample();
        result.records.push(ResolutionRecord::unresolved(Ipv4Addr::new(10, 0, 0, 3)));
        let text = manager(OutputFormat::Text).render(&result).unwrap();
        assert!(!text.contains("10.0.0.3"));
    }

    #[test]
    fn test_empty_text_output() {
        let result = SweepResult::new("10.0.0.0/30".to_string());
        assert_eq!(manager(OutputFormat::Text).render(&result).unwrap(), "");
    }

    #[test]
    fn test_json_report() {
        let json = manager(OutputFormat::Json).render(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["network"], "10.0.0.0/30");
        assert_eq!(value["hosts"][0]["address"], "10.0.0.1");
        assert_eq!(value["hosts"][1]["hostname"], "bravo, inc");
        assert!(value["stats"]["acknowledged"].is_u64());
    }

    #[test]
    fn test_csv_quotes_commas() {
        let csv = manager(OutputFormat::Csv).render(&sample()).unwrap();
        assert_eq!(csv, "address,hostname\n10.0.0.1,alpha\n10.0.0.2,\"bravo, inc\"\n");
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hosts.txt");
        let manager = OutputManager::new(OutputConfig {
            format: OutputFormat::Text,
            file: Some(path.clone()),
        });
        manager.write(&sample()).unwrap();
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.starts_with("10.0.0.1 is \"alpha\""));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("txt".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
