//! Parsing of `pmset -g log` lines into power events.
//!
//! The log format is not a stable contract, so anything that does not look
//! like a charge reading or a display transition is skipped rather than
//! treated as an error.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset};
use regex::{Captures, Regex};
use serde::Serialize;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

static CHARGE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?P<ts>\d{4}-\d{2}-\d{2}\s\d{2}:\d{2}:\d{2}\s[+-]\d{4}).*?Using (?P<source>AC|Batt).*?\(Charge:\s*(?P<percent>\d+)",
    )
    .expect("charge pattern is valid")
});

static SCREEN_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?P<ts>\d{4}-\d{2}-\d{2}\s\d{2}:\d{2}:\d{2}\s[+-]\d{4}).*?Display is turned (?P<state>on|off)\b",
    )
    .expect("screen pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSource {
    Ac,
    Battery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenState {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventKind {
    Charge { source: PowerSource, percent: u8 },
    Screen { state: ScreenState },
}

/// One power-state transition from the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LogEvent {
    pub timestamp: DateTime<FixedOffset>,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Outcome of parsing a single log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedLine {
    Matched(LogEvent),
    Skipped,
}

impl LogEvent {
    pub fn charge(timestamp: DateTime<FixedOffset>, source: PowerSource, percent: u8) -> Self {
        Self {
            timestamp,
            kind: EventKind::Charge { source, percent },
        }
    }

    pub fn screen(timestamp: DateTime<FixedOffset>, state: ScreenState) -> Self {
        Self {
            timestamp,
            kind: EventKind::Screen { state },
        }
    }

    pub fn percent(&self) -> Option<u8> {
        match self.kind {
            EventKind::Charge { percent, .. } => Some(percent),
            EventKind::Screen { .. } => None,
        }
    }

    pub fn screen_state(&self) -> Option<ScreenState> {
        match self.kind {
            EventKind::Screen { state } => Some(state),
            EventKind::Charge { .. } => None,
        }
    }
}

impl fmt::Display for PowerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ac => f.pad("AC"),
            Self::Battery => f.pad("Battery"),
        }
    }
}

impl fmt::Display for ScreenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => f.pad("ON"),
            Self::Off => f.pad("OFF"),
        }
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ts = self.timestamp.format("%Y-%m-%d %H:%M:%S");
        match self.kind {
            EventKind::Charge { source, percent } => write!(f, "{ts}, {source}, {percent}%"),
            EventKind::Screen { state } => write!(f, "{ts}, Display {state}"),
        }
    }
}

/// Parse a `pmset` log timestamp such as `2023-03-13 20:02:28 -0700`.
pub fn parse_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(text, TIMESTAMP_FORMAT).ok()
}

fn timestamp_of(caps: &Captures<'_>) -> Option<DateTime<FixedOffset>> {
    parse_timestamp(caps.name("ts")?.as_str())
}

fn parse_charge(line: &str) -> Option<LogEvent> {
    let caps = CHARGE_LINE.captures(line)?;
    let timestamp = timestamp_of(&caps)?;
    let source = if caps["source"].eq_ignore_ascii_case("ac") {
        PowerSource::Ac
    } else {
        PowerSource::Battery
    };
    let percent = caps["percent"].parse::<u8>().ok().filter(|p| *p <= 100)?;
    Some(LogEvent::charge(timestamp, source, percent))
}

fn parse_screen(line: &str) -> Option<LogEvent> {
    let caps = SCREEN_LINE.captures(line)?;
    let timestamp = timestamp_of(&caps)?;
    let state = if caps["state"].eq_ignore_ascii_case("on") {
        ScreenState::On
    } else {
        ScreenState::Off
    };
    Some(LogEvent::screen(timestamp, state))
}

pub fn parse_line(line: &str) -> ParsedLine {
    match parse_charge(line).or_else(|| parse_screen(line)) {
        Some(event) => ParsedLine::Matched(event),
        None => ParsedLine::Skipped,
    }
}

/// Parse log lines in order, dropping the ones that do not match.
pub fn parse<I, S>(lines: I) -> Vec<LogEvent>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter_map(|line| match parse_line(line.as_ref()) {
            ParsedLine::Matched(event) => Some(event),
            ParsedLine::Skipped => None,
        })
        .collect()
}
