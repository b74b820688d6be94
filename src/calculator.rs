use tracing::{debug, warn};

use crate::error::UsageError;
use crate::event::{self, LogEvent};
use crate::platform::PowerLog;
use crate::session::{self, SessionStats};
use crate::usage::{self, UsageResult};

/// Runs the fetch → parse → reduce pipeline against a [`PowerLog`].
///
/// Each call is a fresh one-shot scan; nothing is cached between calls.
pub struct UsageCalculator<L> {
    log: L,
}

impl<L: PowerLog> UsageCalculator<L> {
    pub fn new(log: L) -> Self {
        Self { log }
    }

    /// Parsed events, followed by the current reading when one is available.
    pub fn events(&self) -> Result<Vec<LogEvent>, UsageError> {
        let lines = self.log.fetch_raw_log()?;
        let mut events = event::parse(&lines);
        debug!(lines = lines.len(), events = events.len(), "parsed power log");

        match self.log.current_reading() {
            Ok(Some(reading)) => events.push(reading),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "skipping current battery status"),
        }
        Ok(events)
    }

    pub fn usage(&self) -> Result<UsageResult, UsageError> {
        Ok(usage::compute_usage(&self.events()?))
    }

    pub fn sessions(&self) -> Result<Vec<SessionStats>, UsageError> {
        Ok(session::aggregate_sessions(&self.events()?))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::LogFailure;
    use crate::event::{PowerSource, parse_timestamp};
    use chrono::TimeDelta;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Replays canned fetch results, one per call.
    #[derive(Default)]
    pub(crate) struct MockLog {
        pub(crate) fetches: RefCell<VecDeque<Option<Vec<String>>>>,
        pub(crate) reading: Option<LogEvent>,
        pub(crate) reading_fails: bool,
    }

    impl MockLog {
        pub(crate) fn with_fetches(fetches: Vec<Option<Vec<&str>>>) -> Self {
            let fetches = fetches
                .into_iter()
                .map(|f| f.map(|lines| lines.into_iter().map(String::from).collect()))
                .collect();
            Self {
                fetches: RefCell::new(fetches),
                ..Self::default()
            }
        }
    }

    impl PowerLog for MockLog {
        fn fetch_raw_log(&self) -> Result<Vec<String>, UsageError> {
            match self.fetches.borrow_mut().pop_front().flatten() {
                Some(lines) => Ok(lines),
                None => Err(UsageError::LogUnavailable {
                    program: "mock".into(),
                    reason: LogFailure::Timeout(Duration::from_secs(1)),
                }),
            }
        }

        fn current_reading(&self) -> Result<Option<LogEvent>, UsageError> {
            if self.reading_fails {
                return Err(UsageError::StatusUnavailable("mock".into()));
            }
            Ok(self.reading)
        }
    }

    const EXAMPLE: [&str; 7] = [
        "2023-03-13 10:00:00 -0700 Assertions          Summary- Using Batt(Charge: 80)",
        "2023-03-13 10:00:00 -0700 Notification        Display is turned on",
        "2023-03-13 10:30:00 -0700 Notification        Display is turned off",
        "2023-03-13 10:30:00 -0700 Assertions          Summary- Using Batt(Charge: 78)",
        "2023-03-13 11:00:00 -0700 Notification        Display is turned on",
        "2023-03-13 11:10:00 -0700 Notification        Display is turned off",
        "2023-03-13 11:10:00 -0700 Assertions          Summary- Using Batt(Charge: 77)",
    ];

    #[test]
    fn test_usage_from_log() {
        let calc = UsageCalculator::new(MockLog::with_fetches(vec![Some(EXAMPLE.to_vec())]));
        let result = calc.usage().unwrap();
        assert_eq!(result.total_duration, TimeDelta::minutes(40));
        assert_eq!(result.current_percent, Some(77));
    }

    #[test]
    fn test_fetch_failure_produces_no_result() {
        let calc = UsageCalculator::new(MockLog::with_fetches(vec![None]));
        let err = calc.usage().unwrap_err();
        assert!(err.is_log_unavailable());
    }

    #[test]
    fn test_current_reading_extends_open_interval() {
        let mut log = MockLog::with_fetches(vec![Some(vec![
            "2023-03-13 10:00:00 -0700 Assertions          Summary- Using Batt(Charge: 90)",
            "2023-03-13 10:00:00 -0700 Notification        Display is turned on",
        ])]);
        log.reading = Some(LogEvent::charge(
            parse_timestamp("2023-03-13 10:20:00 -0700").unwrap(),
            PowerSource::Battery,
            88,
        ));
        let result = UsageCalculator::new(log).usage().unwrap();
        assert_eq!(result.total_duration, TimeDelta::minutes(20));
        assert_eq!(result.current_percent, Some(88));
    }

    #[test]
    fn test_status_failure_is_ignored() {
        let mut log = MockLog::with_fetches(vec![Some(EXAMPLE.to_vec())]);
        log.reading_fails = true;
        let result = UsageCalculator::new(log).usage().unwrap();
        assert_eq!(result.total_duration, TimeDelta::minutes(40));
    }

    #[test]
    fn test_sessions_from_log() {
        let calc = UsageCalculator::new(MockLog::with_fetches(vec![Some(EXAMPLE.to_vec())]));
        let sessions = calc.sessions().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].start_percent, 80);
        assert_eq!(sessions[0].end_percent, 77);
    }
}
