//! Screen-on time since the last full charge.

use chrono::{DateTime, FixedOffset, TimeDelta};
use serde::{Serialize, Serializer};

use crate::event::{LogEvent, ScreenState};

const FULL_CHARGE_PERCENT: u8 = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageResult {
    #[serde(rename = "total_secs", serialize_with = "serialize_secs")]
    pub total_duration: TimeDelta,
    pub current_percent: Option<u8>,
    /// Timestamp accounting started from: the last full charge, or the first
    /// event when the log holds no full charge.
    pub window_start: Option<DateTime<FixedOffset>>,
}

impl Default for UsageResult {
    fn default() -> Self {
        Self {
            total_duration: TimeDelta::zero(),
            current_percent: None,
            window_start: None,
        }
    }
}

pub(crate) fn serialize_secs<S: Serializer>(delta: &TimeDelta, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(delta.num_seconds())
}

/// Index of the last charge reading at 100%, or 0 when there is none.
pub fn full_charge_start(events: &[LogEvent]) -> usize {
    events
        .iter()
        .rposition(|e| e.percent() == Some(FULL_CHARGE_PERCENT))
        .unwrap_or(0)
}

/// Screen state in effect at `events[start]`.
///
/// Uses the last screen transition before `start` when the log has one.
/// Otherwise an OFF as the first transition means the screen was already on,
/// and accounting starts at `start`.
pub(crate) fn initial_screen(events: &[LogEvent], start: usize) -> ScreenState {
    if let Some(state) = events[..start].iter().rev().find_map(LogEvent::screen_state) {
        return state;
    }
    match events[start..].iter().find_map(LogEvent::screen_state) {
        Some(ScreenState::Off) => ScreenState::On,
        _ => ScreenState::Off,
    }
}

/// Sum the screen-on intervals since the last full charge.
///
/// Timestamps are trusted to be in log order. A span that runs backwards
/// counts as zero instead of being corrected.
pub fn compute_usage(events: &[LogEvent]) -> UsageResult {
    if events.is_empty() {
        return UsageResult::default();
    }

    let start = full_charge_start(events);
    let window = &events[start..];
    let window_start = window[0].timestamp;

    let mut total = TimeDelta::zero();
    let mut on_since = match initial_screen(events, start) {
        ScreenState::On => Some(window_start),
        ScreenState::Off => None,
    };
    let mut current_percent = None;

    for event in window {
        if let Some(percent) = event.percent() {
            current_percent = Some(percent);
        }
        match event.screen_state() {
            Some(ScreenState::On) => {
                on_since.get_or_insert(event.timestamp);
            }
            Some(ScreenState::Off) => {
                if let Some(since) = on_since.take() {
                    total += span(since, event.timestamp);
                }
            }
            None => {}
        }
    }

    // still on at the end of the log
    if let (Some(since), Some(last)) = (on_since, window.last()) {
        total += span(since, last.timestamp);
    }

    UsageResult {
        total_duration: total,
        current_percent,
        window_start: Some(window_start),
    }
}

fn span(from: DateTime<FixedOffset>, to: DateTime<FixedOffset>) -> TimeDelta {
    (to - from).max(TimeDelta::zero())
}
