// `pmset` backed power log.
// `pmset -g log` dumps the whole retained log; scoping to the last full
// charge happens in `compute_usage`, not here.

use std::sync::LazyLock;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Local};
use regex::Regex;
use tracing::debug;

use super::{PowerLog, command};
use crate::config::{LogConfig, StatusConfig};
use crate::error::UsageError;
use crate::event::{LogEvent, PowerSource};

static STATUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)Now drawing from '(?P<source>[^']+)'.*?(?P<percent>\d+)%")
        .expect("status pattern is valid")
});

pub struct PmsetLog {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    status: Option<(String, Vec<String>)>,
}

impl PmsetLog {
    pub fn new(log: &LogConfig, status: &StatusConfig) -> Self {
        Self {
            program: log.command.clone(),
            args: log.args.clone(),
            timeout: log.timeout(),
            status: status
                .enabled
                .then(|| (status.command.clone(), status.args.clone())),
        }
    }
}

impl PowerLog for PmsetLog {
    fn fetch_raw_log(&self) -> Result<Vec<String>, UsageError> {
        let text = command::run(&self.program, &self.args, self.timeout).map_err(|reason| {
            UsageError::LogUnavailable {
                program: self.program.clone(),
                reason,
            }
        })?;
        let lines: Vec<String> = text.lines().map(str::to_owned).collect();
        debug!(program = %self.program, lines = lines.len(), "fetched power log");
        Ok(lines)
    }

    fn current_reading(&self) -> Result<Option<LogEvent>, UsageError> {
        let Some((program, args)) = &self.status else {
            return Ok(None);
        };
        let text = command::run(program, args, self.timeout)
            .map_err(|e| UsageError::StatusUnavailable(format!("`{program}`: {e}")))?;
        parse_status(&text, Local::now().fixed_offset()).map(Some)
    }
}

/// Parse `pmset -g ps` output into a charge reading stamped `now`.
///
/// ```text
/// Now drawing from 'Battery Power'
///  -InternalBattery-0 (id=1234)	85%; discharging; 4:02 remaining present: true
/// ```
pub fn parse_status(text: &str, now: DateTime<FixedOffset>) -> Result<LogEvent, UsageError> {
    let caps = STATUS
        .captures(text)
        .ok_or_else(|| UsageError::StatusUnavailable("could not determine battery status".into()))?;
    let source = if &caps["source"] == "Battery Power" {
        PowerSource::Battery
    } else {
        PowerSource::Ac
    };
    let percent = caps["percent"]
        .parse::<u8>()
        .ok()
        .filter(|p| *p <= 100)
        .ok_or_else(|| UsageError::StatusUnavailable(format!("bad percentage {}", &caps["percent"])))?;
    Ok(LogEvent::charge(now, source, percent))
}
