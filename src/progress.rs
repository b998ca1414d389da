//! One-shot progress computation for the `progress` command.

use chrono::{DateTime, TimeDelta, Utc};
use kickoff_core::{Error, Result};
use kickoff_timing::{RemainingStyle, Window, format_remaining_with};
use serde::Serialize;

/// What `kickoff progress` prints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    pub started_at: DateTime<Utc>,
    pub completes_at: DateTime<Utc>,
    pub now: DateTime<Utc>,
    pub elapsed_fraction: Option<f64>,
    pub percent: Option<u8>,
    pub remaining_ms: u64,
    pub label: String,
}

impl std::fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.percent {
            Some(percent) => write!(f, "{percent:>3}% ")?,
            None => f.write_str("  ?% ")?,
        }
        write!(f, "{} ({} ms remaining)", self.label, self.remaining_ms)
    }
}

/// Compute progress for a window given by its start and either a duration
/// or a completion instant.
///
/// # Errors
///
/// Returns `InvalidWindow` if neither `duration_ms` nor `completes_at` is
/// given, or the duration is negative or out of range.
pub fn report(
    started_at: DateTime<Utc>,
    duration_ms: Option<i64>,
    completes_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    style: RemainingStyle,
) -> Result<ProgressReport> {
    let duration = duration_ms
        .map(|ms| {
            if ms < 0 {
                return Err(Error::invalid_window(format!(
                    "duration must not be negative: {ms} ms"
                )));
            }
            TimeDelta::try_milliseconds(ms)
                .ok_or_else(|| Error::invalid_window(format!("duration out of range: {ms} ms")))
        })
        .transpose()?;

    let window = Window::from_parts(Some(started_at), duration, completes_at)?;
    let progress = window.progress(now);

    Ok(ProgressReport {
        started_at,
        completes_at: window.completes_at(),
        now,
        elapsed_fraction: progress.elapsed_fraction,
        percent: progress.percent(),
        remaining_ms: progress.remaining_ms,
        label: format_remaining_with(progress.remaining_ms, style),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::arithmetic_side_effects)]

    use super::*;

    fn start() -> DateTime<Utc> {
        "2024-01-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_halfway_through_five_minutes() {
        let now = start() + TimeDelta::seconds(150);
        let r = report(start(), Some(300_000), None, now, RemainingStyle::ReadyLabel).unwrap();
        assert_eq!(r.elapsed_fraction, Some(0.5));
        assert_eq!(r.remaining_ms, 150_000);
        assert_eq!(r.label, "2m 30s");
        assert_eq!(r.to_string(), " 50% 2m 30s (150000 ms remaining)");
    }

    #[test]
    fn test_completion_instant_instead_of_duration() {
        let completes_at = start() + TimeDelta::seconds(90);
        let r = report(start(), None, Some(completes_at), start(), RemainingStyle::Clock).unwrap();
        assert_eq!(r.elapsed_fraction, Some(0.0));
        assert_eq!(r.label, "01:30");
    }

    #[test]
    fn test_past_completion_reads_ready() {
        let now = start() + TimeDelta::hours(1);
        let r = report(start(), Some(60_000), None, now, RemainingStyle::ReadyLabel).unwrap();
        assert_eq!(r.elapsed_fraction, Some(1.0));
        assert_eq!(r.label, "Ready!");
    }

    #[test]
    fn test_missing_end_is_rejected() {
        assert!(matches!(
            report(start(), None, None, start(), RemainingStyle::ReadyLabel),
            Err(Error::InvalidWindow { .. })
        ));
        assert!(report(start(), Some(-5), None, start(), RemainingStyle::ReadyLabel).is_err());
    }
}
