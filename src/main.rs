use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use colored::*;
use hostsweep::{
    config::SweepConfig,
    output::{OutputConfig, OutputFormat, OutputManager},
    ResolverKind, SortOrder, SweepEngine, SweepError,
};
use indicatif::{ProgressBar, ProgressStyle};

/// Exit code for invalid arguments or configuration, matching clap's own
const EXIT_USAGE: i32 = 2;
const EXIT_FAILURE: i32 = 1;

fn build_cli() -> Command {
    Command::new("hostsweep")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Find the hosts on an IPv4 network that have a discoverable name")
        .arg(
            Arg::new("network")
                .value_name("NETWORK")
                .help("Network to sweep in CIDR notation, e.g. 192.168.1.0/24")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .value_name("COUNT")
                .help("Number of concurrent resolver workers [default: 10]")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("use-nbtstat")
                .long("use-nbtstat")
                .help("Resolve names with a NetBIOS query tool instead of reverse DNS")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("sort-by-hostname")
                .long("sort-by-hostname")
                .help("Order the report by hostname instead of address")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("nbtstat-command")
                .long("nbtstat-command")
                .value_name("PROGRAM")
                .help("NetBIOS query program (nbtstat on Windows, nmblookup elsewhere)"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("MS")
                .help("Per-lookup timeout in milliseconds [default: 5000]")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("max-addresses")
                .long("max-addresses")
                .value_name("COUNT")
                .help("Refuse networks with more addresses than this [default: 65536]")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path (defaults to ~/.hostsweep.toml if present)"),
        )
        .arg(
            Arg::new("output-format")
                .short('o')
                .long("output-format")
                .value_name("FORMAT")
                .help("Report format")
                .value_parser(["text", "json", "csv"])
                .default_value("text"),
        )
        .arg(
            Arg::new("output-file")
                .long("output-file")
                .value_name("FILE")
                .help("Write the report to a file instead of stdout"),
        )
        .arg(
            Arg::new("progress")
                .long("progress")
                .help("Show a progress bar on stderr")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .help("Disable colored diagnostics")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase log verbosity (-v info, -vv debug)")
                .action(ArgAction::Count),
        )
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Defaults, then the config file, then command line flags
fn build_config(matches: &ArgMatches) -> anyhow::Result<SweepConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => SweepConfig::from_toml_file(path)
            .with_context(|| format!("loading config file {}", path))?,
        None => SweepConfig::load_default_config(),
    };

    if let Some(network) = matches.get_one::<String>("network") {
        config.network = network.clone();
    }
    if let Some(threads) = matches.get_one::<usize>("threads") {
        config.threads = *threads;
    }
    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        config.timeout = *timeout;
    }
    if let Some(max) = matches.get_one::<u64>("max-addresses") {
        config.max_addresses = *max;
    }
    if matches.get_flag("use-nbtstat") {
        config.resolver = ResolverKind::Netbios;
    }
    if let Some(program) = matches.get_one::<String>("nbtstat-command") {
        config.netbios.program = program.clone();
    }
    if matches.get_flag("sort-by-hostname") {
        config.sort_order = SortOrder::Hostname;
    }

    Ok(config)
}

fn build_output(matches: &ArgMatches) -> anyhow::Result<OutputConfig> {
    let format = matches
        .get_one::<String>("output-format")
        .map(|f| f.parse::<OutputFormat>())
        .transpose()
        .map_err(anyhow::Error::msg)?
        .unwrap_or_default();

    Ok(OutputConfig {
        format,
        file: matches.get_one::<String>("output-file").map(PathBuf::from),
    })
}

fn progress_bar(enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(0);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} addresses")
    {
        bar.set_style(style);
    }
    bar
}

async fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let config = build_config(matches)?;
    let output = OutputManager::new(build_output(matches)?);

    let engine = SweepEngine::new(config)?.with_progress(progress_bar(matches.get_flag("progress")));
    let result = engine.sweep().await?;

    output.write(&result)?;
    Ok(())
}

fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<SweepError>() {
        Some(e) if e.is_configuration_error() => EXIT_USAGE,
        _ => EXIT_FAILURE,
    }
}

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();

    init_logging(matches.get_count("verbose"));
    if matches.get_flag("no-color") {
        colored::control::set_override(false);
    }

    let code = match run(&matches).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {:#}", "[!]".bright_red(), e);
            exit_code(&e)
        }
    };

    // Exit without waiting on lookups still parked in the blocking pool
    process::exit(code);
}
