//! Energy regeneration.
//!
//! Energy refills one point per `regen_interval` while below the cap. The
//! countdown to the next point is an ordinary [`Progress`], so it renders
//! like any other timed resource.

use chrono::{DateTime, TimeDelta, Utc};
use kickoff_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::resource::TimedResource;
use crate::types::{ResourceId, ResourceKind};
use crate::window::{Progress, Window, compute_progress};

/// Energy level at an instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyReading {
    /// Current energy, including points regenerated since the last settle.
    pub energy: u32,
    /// Cap.
    pub max: u32,
    /// Countdown to the next point; complete when full.
    pub next_point: Progress,
}

impl EnergyReading {
    /// Whether the meter is at its cap.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.energy >= self.max
    }
}

/// Energy meter with time-based regeneration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyMeter {
    current: u32,
    max: u32,
    regen_interval_ms: i64,
    last_regen_at: DateTime<Utc>,
}

impl EnergyMeter {
    /// Create a meter. `current` is capped at `max`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `max` is zero or the interval is not positive.
    pub fn new(
        current: u32,
        max: u32,
        regen_interval: TimeDelta,
        last_regen_at: DateTime<Utc>,
    ) -> Result<Self> {
        if max == 0 {
            return Err(Error::invalid_config("energy max must be greater than 0"));
        }
        let regen_interval_ms = regen_interval.num_milliseconds();
        if regen_interval_ms <= 0 {
            return Err(Error::invalid_config(
                "energy regen interval must be positive",
            ));
        }
        Ok(Self {
            current: current.min(max),
            max,
            regen_interval_ms,
            last_regen_at,
        })
    }

    /// Energy as of the last settle, without regeneration applied.
    #[must_use]
    pub const fn stored(&self) -> u32 {
        self.current
    }

    /// Points regenerated since the last settle, capped so the meter never
    /// exceeds `max`.
    fn gained(&self, now: DateTime<Utc>) -> u32 {
        let elapsed_ms = now
            .signed_duration_since(self.last_regen_at)
            .num_milliseconds()
            .max(0);
        let intervals = elapsed_ms.checked_div(self.regen_interval_ms).unwrap_or(0);
        let headroom = self.max.saturating_sub(self.current);
        u32::try_from(intervals).unwrap_or(u32::MAX).min(headroom)
    }

    /// Read the meter at `now`.
    #[must_use]
    pub fn regenerated(&self, now: DateTime<Utc>) -> EnergyReading {
        let gained = self.gained(now);
        let energy = self.current.saturating_add(gained);
        if energy >= self.max {
            return EnergyReading {
                energy: self.max,
                max: self.max,
                next_point: Progress::complete(),
            };
        }

        let window_start = self.regen_point(gained, now);
        EnergyReading {
            energy,
            max: self.max,
            next_point: compute_progress(
                window_start,
                TimeDelta::milliseconds(self.regen_interval_ms),
                now,
            ),
        }
    }

    /// The countdown to the next point as an energy-regen resource tracked
    /// under `id`. `None` while the meter is full.
    #[must_use]
    pub fn next_point_resource(
        &self,
        id: ResourceId,
        now: DateTime<Utc>,
    ) -> Option<TimedResource> {
        let gained = self.gained(now);
        if self.current.saturating_add(gained) >= self.max {
            return None;
        }
        let started_at = self.regen_point(gained, now);
        let completes_at = TimeDelta::try_milliseconds(self.regen_interval_ms)
            .and_then(|interval| started_at.checked_add_signed(interval))?;
        Some(TimedResource::new(
            id,
            ResourceKind::EnergyRegen,
            Window::from_deadline(Some(started_at), completes_at),
        ))
    }

    /// Fold regenerated points into the stored level.
    pub fn settle(&mut self, now: DateTime<Utc>) {
        let gained = self.gained(now);
        if gained == 0 {
            return;
        }
        self.current = self.current.saturating_add(gained);
        self.last_regen_at = self.regen_point(gained, now);
    }

    /// Instant the `points`-th point after the last settle was regenerated,
    /// falling back to `now` if that is out of range.
    fn regen_point(&self, points: u32, now: DateTime<Utc>) -> DateTime<Utc> {
        TimeDelta::try_milliseconds(self.regen_interval_ms.saturating_mul(i64::from(points)))
            .and_then(|delta| self.last_regen_at.checked_add_signed(delta))
            .unwrap_or(now)
    }

    /// Add energy at `now`, capped at `max`, returning the new level.
    ///
    /// Reaching the cap pauses regeneration until energy is spent again.
    pub fn restore(&mut self, amount: u32, now: DateTime<Utc>) -> u32 {
        self.settle(now);
        self.current = self.current.saturating_add(amount).min(self.max);
        if self.current >= self.max {
            self.last_regen_at = now;
        }
        self.current
    }

    /// Spend energy at `now`, returning the level left.
    ///
    /// Spending from a full meter starts the regen countdown at `now`.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientFunds` if not enough energy is available; the
    /// meter is left settled but otherwise unchanged.
    pub fn spend(&mut self, amount: u32, now: DateTime<Utc>) -> Result<u32> {
        self.settle(now);
        if self.current < amount {
            return Err(Error::insufficient_funds(
                "energy",
                u64::from(amount),
                u64::from(self.current),
            ));
        }
        let was_full = self.current >= self.max;
        self.current = self.current.saturating_sub(amount);
        if was_full {
            self.last_regen_at = now;
        }
        Ok(self.current)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::arithmetic_side_effects)]

    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        match DateTime::parse_from_rfc3339(s) {
            Ok(t) => t.with_timezone(&Utc),
            Err(e) => panic!("bad timestamp {s}: {e}"),
        }
    }

    fn meter(current: u32) -> EnergyMeter {
        EnergyMeter::new(current, 5, TimeDelta::minutes(10), at("2024-01-01T00:00:00Z")).unwrap()
    }

    #[test]
    fn test_regenerates_whole_intervals() {
        let m = meter(1);
        let reading = m.regenerated(at("2024-01-01T00:25:00Z"));
        assert_eq!(reading.energy, 3);
        assert_eq!(reading.next_point.elapsed_fraction, Some(0.5));
        assert_eq!(reading.next_point.remaining_ms, 300_000);
    }

    #[test]
    fn test_caps_at_max() {
        let m = meter(4);
        let reading = m.regenerated(at("2024-01-02T00:00:00Z"));
        assert_eq!(reading.energy, 5);
        assert!(reading.is_full());
        assert!(reading.next_point.is_complete());
    }

    #[test]
    fn test_spend_without_enough_energy_fails() {
        let mut m = meter(1);
        let err = m.spend(3, at("2024-01-01T00:00:00Z")).unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { .. }));
        assert_eq!(m.stored(), 1);
    }

    #[test]
    fn test_spend_from_full_restarts_countdown() {
        let mut m = meter(5);
        let now = at("2024-01-01T03:00:00Z");
        assert_eq!(m.spend(2, now).unwrap(), 3);
        let reading = m.regenerated(now + TimeDelta::minutes(5));
        assert_eq!(reading.energy, 3);
        assert_eq!(reading.next_point.remaining_ms, 300_000);
    }

    #[test]
    fn test_settle_keeps_partial_interval() {
        let mut m = meter(0);
        m.settle(at("2024-01-01T00:15:00Z"));
        assert_eq!(m.stored(), 1);
        let reading = m.regenerated(at("2024-01-01T00:15:00Z"));
        assert_eq!(reading.next_point.remaining_ms, 300_000);
    }

    #[test]
    fn test_restore_caps_at_max() {
        let mut m = meter(3);
        assert_eq!(m.restore(10, at("2024-01-01T00:00:00Z")), 5);
    }

    #[test]
    fn test_next_point_resource_counts_down_to_next_point() {
        let m = meter(1);
        let id = ResourceId::new();
        let now = at("2024-01-01T00:25:00Z");
        let resource = m.next_point_resource(id, now).unwrap();
        assert_eq!(resource.id(), id);
        assert_eq!(resource.kind(), ResourceKind::EnergyRegen);
        assert_eq!(resource.completes_at(), at("2024-01-01T00:30:00Z"));
        assert_eq!(resource.progress(now).remaining_ms, 300_000);
        assert_eq!(
            resource.progress(now).remaining_ms,
            m.regenerated(now).next_point.remaining_ms
        );
    }

    #[test]
    fn test_next_point_resource_absent_when_full() {
        let m = meter(4);
        let id = ResourceId::new();
        assert!(m.next_point_resource(id, at("2024-01-01T00:05:00Z")).is_some());
        assert!(m.next_point_resource(id, at("2024-01-01T00:10:00Z")).is_none());
    }

    #[test]
    fn test_rejects_zero_interval() {
        assert!(EnergyMeter::new(0, 5, TimeDelta::zero(), at("2024-01-01T00:00:00Z")).is_err());
        assert!(EnergyMeter::new(0, 0, TimeDelta::minutes(1), at("2024-01-01T00:00:00Z")).is_err());
    }
}
