//! Countdown labels.
//!
//! The model only produces milliseconds; screens pick a style.

/// Label shown once a countdown has finished.
pub const READY_LABEL: &str = "Ready!";

/// How a remaining duration is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemainingStyle {
    /// `"1m 30s"`, `"45s"`, and `"Ready!"` at zero (practice field, squad).
    #[default]
    ReadyLabel,
    /// `"1m 30s"`, `"45s"`, and `"0s"` at zero (building overlay).
    Building,
    /// `"01:30"`, or `"1:02:03"` past an hour.
    Clock,
}

/// Format a remaining duration in the default style.
#[inline]
#[must_use]
pub fn format_remaining(remaining_ms: u64) -> String {
    format_remaining_with(remaining_ms, RemainingStyle::ReadyLabel)
}

/// Format a remaining duration in the given style.
///
/// Partial seconds round up, so a countdown never reads as finished early.
#[must_use]
pub fn format_remaining_with(remaining_ms: u64, style: RemainingStyle) -> String {
    let secs = remaining_ms.div_ceil(1000);
    match style {
        RemainingStyle::ReadyLabel if secs == 0 => READY_LABEL.to_string(),
        RemainingStyle::ReadyLabel | RemainingStyle::Building => {
            if secs >= 60 {
                format!("{}m {}s", secs.div_euclid(60), secs.rem_euclid(60))
            } else {
                format!("{secs}s")
            }
        }
        RemainingStyle::Clock => {
            let hours = secs.div_euclid(3600);
            let minutes = secs.rem_euclid(3600).div_euclid(60);
            let seconds = secs.rem_euclid(60);
            if hours > 0 {
                format!("{hours}:{minutes:02}:{seconds:02}")
            } else {
                format!("{minutes:02}:{seconds:02}")
            }
        }
    }
}
