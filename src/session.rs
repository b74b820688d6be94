//! Per power-source session breakdown.
//!
//! A session is a contiguous run on one power source. Within a session, time
//! is split by screen state, and the charge lost between two charge readings
//! is shared between screen-on and screen-off time in proportion to how long
//! each lasted in that window.

use chrono::{DateTime, FixedOffset, TimeDelta};
use serde::Serialize;

use crate::config::ReportConfig;
use crate::event::{EventKind, LogEvent, PowerSource, ScreenState};
use crate::usage::{initial_screen, serialize_secs};

const SECONDS_PER_HOUR: f64 = 3600.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStats {
    pub source: PowerSource,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub start_percent: u8,
    pub end_percent: u8,
    #[serde(rename = "screen_on_secs", serialize_with = "serialize_secs")]
    pub screen_on: TimeDelta,
    #[serde(rename = "screen_off_secs", serialize_with = "serialize_secs")]
    pub screen_off: TimeDelta,
    /// Percentage points used while the screen was on; negative while charging.
    pub screen_on_used: f64,
    pub screen_off_used: f64,
}

impl SessionStats {
    fn open(source: PowerSource, start: DateTime<FixedOffset>, percent: u8) -> Self {
        Self {
            source,
            start,
            end: start,
            start_percent: percent,
            end_percent: percent,
            screen_on: TimeDelta::zero(),
            screen_off: TimeDelta::zero(),
            screen_on_used: 0.0,
            screen_off_used: 0.0,
        }
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    pub fn time_in(&self, state: ScreenState) -> TimeDelta {
        match state {
            ScreenState::On => self.screen_on,
            ScreenState::Off => self.screen_off,
        }
    }

    pub fn used_in(&self, state: ScreenState) -> f64 {
        match state {
            ScreenState::On => self.screen_on_used,
            ScreenState::Off => self.screen_off_used,
        }
    }

    pub fn total_used(&self) -> f64 {
        self.screen_on_used + self.screen_off_used
    }

    /// Percentage points per hour in `state`, when there is enough data.
    pub fn rate_per_hour(&self, state: ScreenState) -> Option<f64> {
        let secs = self.time_in(state).num_milliseconds() as f64 / 1000.0;
        let used = self.used_in(state);
        if secs <= 1.0 || used <= 0.1 {
            return None;
        }
        Some(used / (secs / SECONDS_PER_HOUR))
    }

    /// Hours a full battery would last at the `state` rate.
    pub fn estimated_full_hours(&self, state: ScreenState) -> Option<f64> {
        self.rate_per_hour(state).map(|rate| 100.0 / rate)
    }
}

/// Time and charge accumulated since the previous charge reading.
#[derive(Default)]
struct Pending {
    on: TimeDelta,
    off: TimeDelta,
}

impl Pending {
    fn add(&mut self, state: ScreenState, delta: TimeDelta) {
        let delta = delta.max(TimeDelta::zero());
        match state {
            ScreenState::On => self.on += delta,
            ScreenState::Off => self.off += delta,
        }
    }

    /// Move pending time into `session`, splitting `used` by time share.
    fn flush_into(&mut self, session: &mut SessionStats, used: f64) {
        let total_ms = (self.on + self.off).num_milliseconds();
        if total_ms > 0 {
            let share = |d: TimeDelta| used * d.num_milliseconds() as f64 / total_ms as f64;
            session.screen_on_used += share(self.on);
            session.screen_off_used += share(self.off);
        }
        session.screen_on += self.on;
        session.screen_off += self.off;
        *self = Self::default();
    }
}

/// Split the event stream into sessions at every power-source change.
///
/// Events before the first charge reading only establish the screen state.
/// The last session is closed at the final event of the log.
pub fn aggregate_sessions(events: &[LogEvent]) -> Vec<SessionStats> {
    let Some(first) = events
        .iter()
        .position(|e| matches!(e.kind, EventKind::Charge { .. }))
    else {
        return Vec::new();
    };

    let mut screen = initial_screen(events, first);
    let mut sessions = Vec::new();
    let mut pending = Pending::default();
    let mut current: Option<SessionStats> = None;
    let mut last_percent: Option<u8> = None;
    let mut prev_ts = events[first].timestamp;

    for event in &events[first..] {
        pending.add(screen, event.timestamp - prev_ts);
        prev_ts = event.timestamp;

        match event.kind {
            EventKind::Screen { state } => screen = state,
            EventKind::Charge { source, percent } => {
                let used = last_percent.map_or(0.0, |prev| f64::from(prev) - f64::from(percent));
                last_percent = Some(percent);

                let session = current.get_or_insert_with(|| {
                    SessionStats::open(source, event.timestamp, percent)
                });
                pending.flush_into(session, used);
                session.end = event.timestamp;
                session.end_percent = percent;

                if session.source != source {
                    sessions.extend(current.take());
                    current = Some(SessionStats::open(source, event.timestamp, percent));
                }
            }
        }
    }

    if let Some(mut session) = current {
        pending.flush_into(&mut session, 0.0);
        session.end = prev_ts;
        sessions.push(session);
    }
    sessions
}

/// Battery sessions worth reporting, newest last.
///
/// A session is kept when it is the final one (the machine is still on that
/// source) or when it lasted or used enough to be meaningful.
pub fn battery_sessions(sessions: &[SessionStats], report: &ReportConfig) -> Vec<SessionStats> {
    let last = sessions.len().saturating_sub(1);
    let kept: Vec<_> = sessions
        .iter()
        .enumerate()
        .filter(|(i, s)| {
            s.source == PowerSource::Battery
                && (*i == last
                    || (s.screen_on + s.screen_off).num_seconds() > report.min_session_secs
                    || s.total_used() >= report.min_session_percent)
        })
        .map(|(_, s)| s.clone())
        .collect();
    let skip = kept.len().saturating_sub(report.max_sessions);
    kept.into_iter().skip(skip).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{parse, parse_timestamp};

    const SAMPLE: [&str; 11] = [
        "2023-03-13 14:43:29 -0700 Assertions          Summary- Using AC(Charge: 100)",
        "2023-03-13 15:06:22 -0700 Notification        Display is turned off",
        "2023-03-13 15:06:22 -0700 Notification        Display is turned on",
        "2023-03-13 15:38:02 -0700 Assertions          Summary- [System: PrevIdle] Using AC(Charge: 100)",
        "2023-03-13 15:38:12 -0700 Notification        Display is turned off",
        "2023-03-13 15:55:02 -0700 Notification        Display is turned on",
        "2023-03-13 16:28:05 -0700 Notification        Display is turned off",
        "2023-03-13 16:47:35 -0700 Notification        Display is turned on",
        "2023-03-13 17:01:26 -0700 Assertions          Summary- [System: PrevIdle] Using Batt(Charge: 100)",
        "2023-03-13 19:18:29 -0700 Notification        Display is turned off",
        "2023-03-13 19:18:34 -0700 Assertions          Summary- [System: PrevIdle] Using Batt(Charge: 36)",
    ];

    fn ts(text: &str) -> DateTime<FixedOffset> {
        parse_timestamp(&format!("2023-03-13 {text} -0700")).unwrap()
    }

    #[test]
    fn test_no_charge_events_no_sessions() {
        let events = parse([
            "2023-03-13 15:06:22 -0700 Notification        Display is turned on",
            "2023-03-13 15:16:22 -0700 Notification        Display is turned off",
        ]);
        assert!(aggregate_sessions(&events).is_empty());
    }

    #[test]
    fn test_sample_splits_at_source_change() {
        let sessions = aggregate_sessions(&parse(SAMPLE));
        assert_eq!(sessions.len(), 2);

        let ac = &sessions[0];
        assert_eq!(ac.source, PowerSource::Ac);
        assert_eq!(ac.start, ts("14:43:29"));
        assert_eq!(ac.end, ts("17:01:26"));
        assert_eq!(ac.screen_on + ac.screen_off, ac.duration());
        assert_eq!(ac.total_used(), 0.0);

        let batt = &sessions[1];
        assert_eq!(batt.source, PowerSource::Battery);
        assert_eq!(batt.start, ts("17:01:26"));
        assert_eq!(batt.end, ts("19:18:34"));
        assert_eq!(batt.start_percent, 100);
        assert_eq!(batt.end_percent, 36);
        assert_eq!(batt.screen_on, ts("19:18:29") - ts("17:01:26"));
        assert_eq!(batt.screen_off, TimeDelta::seconds(5));
        assert!((batt.total_used() - 64.0).abs() < 1e-9);
        assert!((batt.screen_on_used - 64.0 * 8223.0 / 8228.0).abs() < 1e-9);
    }

    #[test]
    fn test_ac_session_screen_split() {
        let sessions = aggregate_sessions(&parse(SAMPLE));
        let ac = &sessions[0];
        // on: 14:43:29-15:06:22, 15:06:22-15:38:12, 15:55:02-16:28:05, 16:47:35-17:01:26
        let on = (ts("15:38:12") - ts("14:43:29"))
            + (ts("16:28:05") - ts("15:55:02"))
            + (ts("17:01:26") - ts("16:47:35"));
        assert_eq!(ac.screen_on, on);
    }

    #[test]
    fn test_rate_needs_enough_data() {
        let sessions = aggregate_sessions(&parse(SAMPLE));
        let batt = &sessions[1];
        assert_eq!(batt.rate_per_hour(ScreenState::Off), None);
        let rate = batt.rate_per_hour(ScreenState::On).unwrap();
        assert!((rate - batt.screen_on_used / (8223.0 / 3600.0)).abs() < 1e-9);
        let hours = batt.estimated_full_hours(ScreenState::On).unwrap();
        assert!((hours - 100.0 / rate).abs() < 1e-9);
    }

    #[test]
    fn test_battery_sessions_filters_and_limits() {
        let sessions = aggregate_sessions(&parse(SAMPLE));
        let report = ReportConfig::default();
        let kept = battery_sessions(&sessions, &report);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].source, PowerSource::Battery);

        let none = battery_sessions(
            &sessions,
            &ReportConfig {
                max_sessions: 0,
                ..ReportConfig::default()
            },
        );
        assert!(none.is_empty());
    }

    #[test]
    fn test_short_battery_session_dropped_unless_last() {
        let events = parse([
            "2023-03-13 09:00:00 -0700 Assertions          Using Batt(Charge: 90)",
            "2023-03-13 09:05:00 -0700 Assertions          Using AC(Charge: 90)",
            "2023-03-13 10:00:00 -0700 Assertions          Using AC(Charge: 95)",
        ]);
        let sessions = aggregate_sessions(&events);
        assert_eq!(sessions.len(), 2);
        assert!(battery_sessions(&sessions, &ReportConfig::default()).is_empty());
    }
}
