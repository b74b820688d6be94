use std::io::Write;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::calculator::UsageCalculator;
use crate::error::UsageError;
use crate::format::format_label;
use crate::platform::PowerLog;
use crate::usage::UsageResult;

pub const PLACEHOLDER: &str = "--";

/// The label a menu-bar title would show, owned by whoever drives refreshes.
#[derive(Debug, Default)]
pub struct LabelState {
    label: Option<String>,
    failures: u64,
}

impl LabelState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one refresh outcome. A failure keeps the previous label, or the
    /// placeholder when nothing has succeeded yet.
    pub fn update(&mut self, outcome: Result<UsageResult, UsageError>) -> &str {
        match outcome {
            Ok(result) => {
                self.label = Some(format_label(&result));
            }
            Err(e) => {
                self.failures += 1;
                warn!(error = %e, failures = self.failures, "usage refresh failed");
            }
        }
        self.text()
    }

    pub fn text(&self) -> &str {
        self.label.as_deref().unwrap_or(PLACEHOLDER)
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }
}

/// Refresh every `interval`, writing one label per line. Runs forever unless
/// `count` bounds the number of refreshes.
pub fn run<L: PowerLog, W: Write>(
    calculator: &UsageCalculator<L>,
    interval: Duration,
    count: Option<u64>,
    out: &mut W,
) -> std::io::Result<LabelState> {
    let mut state = LabelState::new();
    let mut refreshes = 0u64;
    loop {
        let label = state.update(calculator.usage());
        writeln!(out, "{label}")?;
        out.flush()?;
        refreshes += 1;
        info!(refreshes, "label refreshed");

        if count.is_some_and(|n| refreshes >= n) {
            return Ok(state);
        }
        thread::sleep(interval);
    }
}
