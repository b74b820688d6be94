use chrono::TimeDelta;

use crate::event::ScreenState;
use crate::session::SessionStats;
use crate::usage::UsageResult;

/// Render a duration as `2h 15m`, or `1d 3h 05m` once it reaches a day.
pub fn format_duration(delta: TimeDelta) -> String {
    let secs = delta.num_seconds().max(0);
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let minutes = (secs % 3600) / 60;
    if days > 0 {
        format!("{days}d {hours}h {minutes:02}m")
    } else {
        format!("{hours}h {minutes}m")
    }
}

fn format_percent(percent: Option<u8>) -> String {
    match percent {
        Some(p) => format!("{p}%"),
        None => "--%".into(),
    }
}

/// One-shot text output.
pub fn format_usage(result: &UsageResult) -> String {
    format!(
        "Screen on {} since full charge, {}",
        format_duration(result.total_duration),
        format_percent(result.current_percent)
    )
}

/// Compact text for a menu-bar title.
pub fn format_label(result: &UsageResult) -> String {
    format!(
        "{} \u{b7} {}",
        format_duration(result.total_duration),
        format_percent(result.current_percent)
    )
}

pub fn format_session(stat: &SessionStats) -> String {
    let mut out = format!(
        "{} session at {} for {} from {}% to {}%",
        stat.source,
        stat.start.format("%Y-%m-%d %H:%M"),
        format_duration(stat.duration()),
        stat.start_percent,
        stat.end_percent,
    );
    for state in [ScreenState::On, ScreenState::Off] {
        let used = stat.used_in(state);
        let verb = if used >= 0.0 { "used" } else { "charged" };
        out.push_str(&format!(
            "\n  Screen {state:<3} {:>3.0}% {verb} in {}",
            used.abs(),
            format_duration(stat.time_in(state)),
        ));
        if let (Some(rate), Some(hours)) =
            (stat.rate_per_hour(state), stat.estimated_full_hours(state))
        {
            out.push_str(&format!(" ({rate:.1}%/h, ~{hours:.1}h on a full charge)"));
        }
    }
    out
}
