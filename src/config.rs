use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Default, Deserialize)]
pub struct UsageConfig {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

/// The command that dumps the power-management log.
#[derive(Debug, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_pmset")]
    pub command: String,
    #[serde(default = "default_log_args")]
    pub args: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// The command that reports the current power source and charge.
#[derive(Debug, Deserialize)]
pub struct StatusConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_pmset")]
    pub command: String,
    #[serde(default = "default_status_args")]
    pub args: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    #[serde(default = "default_min_session_secs")]
    pub min_session_secs: i64,
    #[serde(default = "default_min_session_percent")]
    pub min_session_percent: f64,
}

#[derive(Debug, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_pmset() -> String {
    "pmset".into()
}

fn default_log_args() -> Vec<String> {
    vec!["-g".into(), "log".into()]
}

fn default_status_args() -> Vec<String> {
    vec!["-g".into(), "ps".into()]
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_max_sessions() -> usize {
    5
}

fn default_min_session_secs() -> i64 {
    1800
}

fn default_min_session_percent() -> f64 {
    1.0
}

fn default_interval_secs() -> u64 {
    300
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            command: default_pmset(),
            args: default_log_args(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: default_pmset(),
            args: default_status_args(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            min_session_secs: default_min_session_secs(),
            min_session_percent: default_min_session_percent(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

impl LogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Load the battery-usage config file.
/// Search order:
///   1. `explicit` (the `--config` flag)
///   2. BATTERY_USAGE_CONFIG env var
///   3. ~/.config/battery-usage/config.toml
///   4. Default values
pub fn load(explicit: Option<&Path>) -> UsageConfig {
    let candidates = [
        explicit.map(Path::to_path_buf),
        std::env::var("BATTERY_USAGE_CONFIG").ok().map(PathBuf::from),
        dirs::home_dir().map(|h| h.join(".config/battery-usage/config.toml")),
    ];

    for candidate in candidates.into_iter().flatten() {
        if candidate.exists() {
            match fs::read_to_string(&candidate) {
                Ok(content) => match toml::from_str::<UsageConfig>(&content) {
                    Ok(config) => {
                        info!(
                            path = %candidate.display(),
                            command = %config.log.command,
                            "loaded battery-usage config"
                        );
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %candidate.display(), error = %e, "failed to parse config");
                    }
                },
                Err(e) => {
                    warn!(path = %candidate.display(), error = %e, "failed to read config");
                }
            }
        }
    }

    info!("no config file found, using defaults");
    UsageConfig::default()
}
