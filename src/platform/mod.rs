pub mod command;
pub mod pmset;

use crate::error::UsageError;
use crate::event::LogEvent;

pub use pmset::PmsetLog;

/// A source of power-management log lines.
pub trait PowerLog {
    /// Raw log lines in the order the system emitted them.
    fn fetch_raw_log(&self) -> Result<Vec<String>, UsageError>;

    /// A charge reading for "now", appended after the log when available.
    fn current_reading(&self) -> Result<Option<LogEvent>, UsageError> {
        Ok(None)
    }
}
