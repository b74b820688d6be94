use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use battery_usage::config::{self, UsageConfig};
use battery_usage::format::{format_session, format_usage};
use battery_usage::platform::PmsetLog;
use battery_usage::session::battery_sessions;
use battery_usage::{UsageCalculator, UsageError, watch};
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "battery-usage", version, about = "Screen-on battery usage since the last full charge")]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Screen-on time and current charge (default)
    Usage,
    /// Battery sessions with per-screen-state drain
    Sessions,
    /// Parsed power events, for checking what the log yields
    Events,
    /// Refresh the usage label on an interval
    Watch {
        /// Seconds between refreshes (defaults to the config value)
        #[arg(long)]
        interval: Option<u64>,
        /// Stop after this many refreshes
        #[arg(long)]
        count: Option<u64>,
    },
}

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the report
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref());

    match run(&cli, &cfg) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("battery-usage: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, cfg: &UsageConfig) -> Result<(), UsageError> {
    let calculator = UsageCalculator::new(PmsetLog::new(&cfg.log, &cfg.status));

    match cli.command.as_ref().unwrap_or(&Cmd::Usage) {
        Cmd::Usage => {
            let result = calculator.usage()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", format_usage(&result));
            }
        }
        Cmd::Sessions => {
            let sessions = battery_sessions(&calculator.sessions()?, &cfg.report);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&sessions)?);
            } else if sessions.is_empty() {
                println!("No battery sessions");
            } else {
                let blocks: Vec<_> = sessions.iter().map(format_session).collect();
                println!("{}", blocks.join("\n\n"));
            }
        }
        Cmd::Events => {
            let events = calculator.events()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&events)?);
            } else {
                for event in &events {
                    println!("{event}");
                }
            }
        }
        Cmd::Watch { interval, count } => {
            let interval = Duration::from_secs(interval.unwrap_or(cfg.watch.interval_secs));
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = watch::run(&calculator, interval, *count, &mut stdout) {
                // stdout went away (closed pipe); nothing left to show
                error!(error = %e, "watch output failed");
            }
        }
    }
    Ok(())
}
