//! Screen-on battery usage since the last full charge, read from the macOS
//! power-management log (`pmset -g log`).

pub mod calculator;
pub mod config;
pub mod error;
pub mod event;
pub mod format;
pub mod platform;
pub mod session;
pub mod usage;
pub mod watch;

pub use calculator::UsageCalculator;
pub use error::{LogFailure, UsageError};
pub use event::{LogEvent, ParsedLine, parse, parse_line};
pub use usage::{UsageResult, compute_usage};
