//! Time windows and progress computation.
//!
//! A [`Window`] unifies the two ways call sites describe a countdown: a start
//! instant plus a duration, or an absolute completion instant (with or without
//! a known start). Progress is always derived from `now`; nothing is stored.

use chrono::{DateTime, TimeDelta, Utc};
use kickoff_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Derived countdown state at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Fraction of the window elapsed, in `[0, 1]`. `None` when the total
    /// duration is unknown (deadline-only window).
    pub elapsed_fraction: Option<f64>,
    /// Milliseconds until completion, saturating at zero.
    pub remaining_ms: u64,
}

impl Progress {
    /// A finished countdown.
    #[must_use]
    pub const fn complete() -> Self {
        Self {
            elapsed_fraction: Some(1.0),
            remaining_ms: 0,
        }
    }

    /// A countdown whose elapsed fraction cannot be known.
    #[must_use]
    pub const fn indeterminate(remaining_ms: u64) -> Self {
        Self {
            elapsed_fraction: None,
            remaining_ms,
        }
    }

    /// Whether the countdown has reached zero.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.remaining_ms == 0
    }

    /// Elapsed fraction as a whole percentage, if known.
    ///
    /// Rounds to the nearest percent, but never reads 100 while time remains.
    #[must_use]
    pub fn percent(&self) -> Option<u8> {
        self.elapsed_fraction.map(|f| {
            let percent = (f * 100.0).round().clamp(0.0, 100.0) as u8;
            if percent == 100 && self.remaining_ms > 0 {
                99
            } else {
                percent
            }
        })
    }
}

/// Compute progress of a countdown that began at `started_at` and lasts `total`.
///
/// A non-positive `total` yields an elapsed fraction of 0 and nothing remaining.
#[inline]
#[must_use]
pub fn compute_progress(
    started_at: DateTime<Utc>,
    total: TimeDelta,
    now: DateTime<Utc>,
) -> Progress {
    let total_ms = total.num_milliseconds();
    if total_ms <= 0 {
        return Progress {
            elapsed_fraction: Some(0.0),
            remaining_ms: 0,
        };
    }

    let elapsed_ms = now.signed_duration_since(started_at).num_milliseconds();
    let fraction = elapsed_ms.clamp(0, total_ms) as f64 / total_ms as f64;

    Progress {
        elapsed_fraction: Some(fraction),
        remaining_ms: to_unsigned(total_ms.saturating_sub(elapsed_ms)),
    }
}

/// Milliseconds from `now` until `completes_at`, saturating at zero.
#[inline]
#[must_use]
pub fn remaining_until(completes_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    to_unsigned(completes_at.signed_duration_since(now).num_milliseconds())
}

fn to_unsigned(ms: i64) -> u64 {
    u64::try_from(ms).unwrap_or(0)
}

/// The time span of a timed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    started_at: Option<DateTime<Utc>>,
    completes_at: DateTime<Utc>,
    total_ms: Option<i64>,
}

impl Window {
    /// A window defined by its start and duration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidWindow` if the completion instant is out of range.
    pub fn from_duration(started_at: DateTime<Utc>, duration: TimeDelta) -> Result<Self> {
        let completes_at = started_at
            .checked_add_signed(duration)
            .ok_or_else(|| Error::invalid_window("completion instant out of range"))?;
        Ok(Self {
            started_at: Some(started_at),
            completes_at,
            total_ms: Some(duration.num_milliseconds()),
        })
    }

    /// A window defined by its completion instant, with an optional start.
    #[must_use]
    pub fn from_deadline(started_at: Option<DateTime<Utc>>, completes_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            completes_at,
            total_ms: started_at
                .map(|s| completes_at.signed_duration_since(s).num_milliseconds()),
        }
    }

    /// Build a window from whichever fields a record carries.
    ///
    /// The completion instant is `completes_at` when present, otherwise
    /// `started_at + duration`. When both instants are known the total is
    /// always the span between them, so fraction and remaining time agree;
    /// a duration alongside a bare deadline recovers the start.
    ///
    /// # Errors
    ///
    /// Returns `InvalidWindow` when neither a completion instant nor a
    /// start plus duration is available.
    pub fn from_parts(
        started_at: Option<DateTime<Utc>>,
        duration: Option<TimeDelta>,
        completes_at: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        match (started_at, duration, completes_at) {
            (Some(started_at), _, Some(completes_at)) => {
                Ok(Self::from_deadline(Some(started_at), completes_at))
            }
            (None, None, Some(completes_at)) => Ok(Self::from_deadline(None, completes_at)),
            (None, Some(duration), Some(completes_at)) => {
                let started_at = completes_at
                    .checked_sub_signed(duration)
                    .ok_or_else(|| Error::invalid_window("start instant out of range"))?;
                Ok(Self::from_deadline(Some(started_at), completes_at))
            }
            (Some(started_at), Some(duration), None) => Self::from_duration(started_at, duration),
            (None, _, None) | (Some(_), None, None) => Err(Error::invalid_window(
                "need completes_at, or started_at with a duration",
            )),
        }
    }

    /// When the activity started, if known.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// When the countdown reaches zero.
    #[must_use]
    pub const fn completes_at(&self) -> DateTime<Utc> {
        self.completes_at
    }

    /// Total duration, if known.
    #[must_use]
    pub fn total(&self) -> Option<TimeDelta> {
        self.total_ms.and_then(TimeDelta::try_milliseconds)
    }

    /// Milliseconds remaining at `now`.
    #[must_use]
    pub fn remaining_ms(&self, now: DateTime<Utc>) -> u64 {
        remaining_until(self.completes_at, now)
    }

    /// Progress at `now`.
    ///
    /// The remaining time always comes from the completion instant; the
    /// elapsed fraction is only reported when both start and total are known.
    #[must_use]
    pub fn progress(&self, now: DateTime<Utc>) -> Progress {
        let remaining_ms = self.remaining_ms(now);
        match (self.started_at, self.total()) {
            (Some(started_at), Some(total)) => Progress {
                elapsed_fraction: compute_progress(started_at, total, now).elapsed_fraction,
                remaining_ms,
            },
            _ => Progress::indeterminate(remaining_ms),
        }
    }
}
