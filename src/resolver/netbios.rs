//! NetBIOS name queries through an external tool
//!
//! Works with `nbtstat -a` on Windows and Samba's `nmblookup -A` elsewhere.
//! The tool's stdout is scanned for the first unique name record.

use super::{NameResolver, ResolutionRecord};
use crate::config::NetbiosConfig;
use crate::{Result, SweepError};
use async_trait::async_trait;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::env;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

const ADDRESS_PLACEHOLDER: &str = "{address}";

/// `NAME <xx> UNIQUE` (nbtstat, any locale spelling of "unique") or
/// `NAME <xx> - B <ACTIVE>` (nmblookup). Group records never match.
static UNIQUE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^\s*([^\s<]+)\s+<[0-9A-F]{2}>\s+(?:UNIQUE|.nico|-\s+(?:[BMHP]\s+)?<ACTIVE>)")
        .expect("valid NetBIOS name pattern")
});

/// Output the tools print when the target simply did not answer
static NO_ANSWER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)host not found|host no encontrado|no reply from|name_query failed")
        .expect("valid no-answer pattern")
});

/// Extract the first unique NetBIOS name from tool output.
pub fn parse_unique_name(output: &str) -> Option<String> {
    UNIQUE_NAME
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn is_no_answer(output: &str) -> bool {
    NO_ANSWER.is_match(output)
}

/// Resolver backed by an external NetBIOS query tool
#[derive(Debug, Clone)]
pub struct NetbiosResolver {
    program: String,
    args: Vec<String>,
}

impl NetbiosResolver {
    pub fn new(config: &NetbiosConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments for one query; the address is appended when no argument
    /// carries the placeholder.
    fn command_args(&self, address: Ipv4Addr) -> Vec<String> {
        let addr = address.to_string();
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace(ADDRESS_PLACEHOLDER, &addr))
            .collect();

        if !self.args.iter().any(|arg| arg.contains(ADDRESS_PLACEHOLDER)) {
            args.push(addr);
        }
        args
    }

    fn build_command(&self, address: Ipv4Addr) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(self.command_args(address))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl NameResolver for NetbiosResolver {
    fn label(&self) -> &str {
        "netbios"
    }

    async fn preflight(&self) -> Result<()> {
        match find_program(&self.program) {
            Some(path) => {
                debug!("Using NetBIOS tool at {}", path.display());
                Ok(())
            }
            None => Err(SweepError::external_tool(
                &self.program,
                "not found on PATH",
            )),
        }
    }

    async fn resolve(&self, address: Ipv4Addr) -> Result<ResolutionRecord> {
        let output = self
            .build_command(address)
            .output()
            .await
            .map_err(|e| SweepError::external_tool(&self.program, format!("could not run: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_no_answer(&stdout) || is_no_answer(&stderr) {
                debug!("{}: no NetBIOS answer", address);
                return Ok(ResolutionRecord::unresolved(address));
            }
            return Err(SweepError::external_tool(
                &self.program,
                format!("{} for {}: {}", output.status, address, stderr.trim()),
            ));
        }

        match parse_unique_name(&stdout) {
            Some(name) => Ok(ResolutionRecord::resolved(address, name)),
            None => Ok(ResolutionRecord::unresolved(address)),
        }
    }
}

/// Locate an executable the way the shell would.
fn find_program(program: &str) -> Option<PathBuf> {
    let direct = Path::new(program);
    if direct.components().count() > 1 {
        return direct.is_file().then(|| direct.to_path_buf());
    }

    let paths = env::var_os("PATH")?;
    env::split_paths(&paths).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = dir.join(format!("{}.exe", program));
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}
