//! The timed resource value type.

use chrono::{DateTime, Utc};
use kickoff_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::types::{ResourceId, ResourceKind, ResourceState};
use crate::window::{Progress, Window};

/// Anything whose state depends on elapsed wall-clock time: a building
/// upgrade, a drill, a training session, a mission expiry, energy regen.
///
/// `state` is the state last reported by the backend. The state the player
/// should see right now comes from [`TimedResource::effective_state`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedResource {
    id: ResourceId,
    kind: ResourceKind,
    window: Window,
    wither_at: Option<DateTime<Utc>>,
    state: ResourceState,
}

impl TimedResource {
    /// Create an active resource.
    #[must_use]
    pub const fn new(id: ResourceId, kind: ResourceKind, window: Window) -> Self {
        Self {
            id,
            kind,
            window,
            wither_at: None,
            state: ResourceState::Active,
        }
    }

    /// Attach a wither deadline.
    ///
    /// # Errors
    ///
    /// Returns `InvalidWindow` if the kind cannot wither or `wither_at` is not
    /// strictly after the completion instant.
    pub fn with_wither_at(mut self, wither_at: DateTime<Utc>) -> Result<Self> {
        if !self.kind.can_wither() {
            return Err(Error::invalid_window(format!(
                "{} resources cannot wither",
                self.kind
            )));
        }
        if wither_at <= self.window.completes_at() {
            return Err(Error::invalid_window(
                "wither_at must be strictly after the ready instant",
            ));
        }
        self.wither_at = Some(wither_at);
        Ok(self)
    }

    /// Set the backend-reported state.
    #[must_use]
    pub const fn with_state(mut self, state: ResourceState) -> Self {
        self.state = state;
        self
    }

    /// Get the resource ID.
    #[must_use]
    pub const fn id(&self) -> ResourceId {
        self.id
    }

    /// Get the resource kind.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Get the time window.
    #[must_use]
    pub const fn window(&self) -> &Window {
        &self.window
    }

    /// When the countdown reaches zero.
    #[must_use]
    pub const fn completes_at(&self) -> DateTime<Utc> {
        self.window.completes_at()
    }

    /// The wither deadline, if any.
    #[must_use]
    pub const fn wither_at(&self) -> Option<DateTime<Utc>> {
        self.wither_at
    }

    /// The backend-reported state.
    #[must_use]
    pub const fn state(&self) -> ResourceState {
        self.state
    }

    /// Whether the wither deadline has passed at `now`.
    #[must_use]
    pub fn is_past_wither(&self, now: DateTime<Utc>) -> bool {
        self.kind.can_wither() && self.wither_at.is_some_and(|w| now > w)
    }

    /// State as observed at `now`.
    ///
    /// Terminal states are sticky. An active resource whose countdown has
    /// reached zero moves to its kind's deadline state, and an uncollected
    /// drill past its wither deadline is withered.
    #[must_use]
    pub fn effective_state(&self, now: DateTime<Utc>) -> ResourceState {
        match self.state {
            ResourceState::Collected | ResourceState::Expired | ResourceState::Withered => {
                self.state
            }
            ResourceState::Pending => ResourceState::Pending,
            ResourceState::Active | ResourceState::Ready => {
                if self.is_past_wither(now) {
                    ResourceState::Withered
                } else if self.window.remaining_ms(now) == 0 {
                    self.kind.deadline_state()
                } else {
                    self.state
                }
            }
        }
    }

    /// Whether a collect at `now` should be offered to the player.
    ///
    /// Advisory only; the backend re-validates.
    #[must_use]
    pub fn is_collectable(&self, now: DateTime<Utc>) -> bool {
        match self.effective_state(now) {
            ResourceState::Ready => true,
            ResourceState::Active => self.kind.claimable_while_active(),
            ResourceState::Pending
            | ResourceState::Collected
            | ResourceState::Expired
            | ResourceState::Withered => false,
        }
    }

    /// Countdown progress at `now`.
    ///
    /// A pending resource has not started, so nothing has elapsed yet.
    #[must_use]
    pub fn progress(&self, now: DateTime<Utc>) -> Progress {
        match self.state {
            ResourceState::Pending => Progress {
                elapsed_fraction: self.window.total().map(|_| 0.0),
                remaining_ms: self
                    .window
                    .total()
                    .and_then(|t| u64::try_from(t.num_milliseconds()).ok())
                    .unwrap_or_else(|| self.window.remaining_ms(now)),
            },
            ResourceState::Collected | ResourceState::Withered => Progress::complete(),
            ResourceState::Active | ResourceState::Ready | ResourceState::Expired => {
                self.window.progress(now)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::arithmetic_side_effects)]

    use chrono::TimeDelta;

    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        match DateTime::parse_from_rfc3339(s) {
            Ok(t) => t.with_timezone(&Utc),
            Err(e) => panic!("bad timestamp {s}: {e}"),
        }
    }

    fn drill(ready_at: DateTime<Utc>) -> TimedResource {
        let window = Window::from_deadline(Some(ready_at - TimeDelta::minutes(10)), ready_at);
        TimedResource::new(ResourceId::new(), ResourceKind::Drill, window)
            .with_wither_at(ready_at + TimeDelta::milliseconds(600_000))
            .unwrap()
    }

    #[test]
    fn test_active_until_deadline() {
        let t = at("2024-01-01T12:00:00Z");
        let r = drill(t);
        assert_eq!(r.effective_state(t - TimeDelta::seconds(1)), ResourceState::Active);
        assert_eq!(r.effective_state(t), ResourceState::Ready);
    }

    #[test]
    fn test_drill_withers_after_deadline() {
        let t = at("2024-01-01T12:00:00Z");
        let r = drill(t);
        assert_eq!(
            r.effective_state(t + TimeDelta::milliseconds(600_000)),
            ResourceState::Ready
        );
        assert_eq!(
            r.effective_state(t + TimeDelta::milliseconds(700_000)),
            ResourceState::Withered
        );
        assert!(!r.is_collectable(t + TimeDelta::milliseconds(700_000)));
    }

    #[test]
    fn test_wither_must_follow_ready() {
        let t = at("2024-01-01T12:00:00Z");
        let window = Window::from_deadline(None, t);
        let r = TimedResource::new(ResourceId::new(), ResourceKind::Drill, window);
        assert!(r.clone().with_wither_at(t).is_err());
        assert!(r.with_wither_at(t + TimeDelta::seconds(1)).is_ok());
    }

    #[test]
    fn test_only_drills_take_wither_deadline() {
        let t = at("2024-01-01T12:00:00Z");
        let window = Window::from_deadline(None, t);
        let r = TimedResource::new(ResourceId::new(), ResourceKind::Training, window);
        assert!(r.with_wither_at(t + TimeDelta::hours(1)).is_err());
    }

    #[test]
    fn test_mission_expires_at_deadline() {
        let t = at("2024-01-01T23:59:59Z");
        let window = Window::from_deadline(Some(at("2024-01-01T00:00:00Z")), t);
        let mission = TimedResource::new(ResourceId::new(), ResourceKind::Mission, window);
        assert!(mission.is_collectable(t - TimeDelta::hours(1)));
        assert_eq!(mission.effective_state(t), ResourceState::Expired);
        assert!(!mission.is_collectable(t));
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        let t = at("2024-01-01T12:00:00Z");
        let r = drill(t).with_state(ResourceState::Collected);
        assert_eq!(r.effective_state(t + TimeDelta::days(2)), ResourceState::Collected);
        assert!(r.progress(t).is_complete());
    }

    #[test]
    fn test_pending_has_not_started() {
        let start = at("2024-01-01T00:00:00Z");
        let window = Window::from_duration(start, TimeDelta::minutes(5)).unwrap();
        let r = TimedResource::new(ResourceId::new(), ResourceKind::BuildingUpgrade, window)
            .with_state(ResourceState::Pending);
        let p = r.progress(start + TimeDelta::hours(1));
        assert_eq!(p.elapsed_fraction, Some(0.0));
        assert_eq!(p.remaining_ms, 300_000);
        assert_eq!(r.effective_state(start + TimeDelta::hours(1)), ResourceState::Pending);
    }
}
