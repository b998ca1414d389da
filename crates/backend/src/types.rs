//! Currencies, rewards, and activity requests.

use chrono::TimeDelta;
use kickoff_core::{Error, Result};
use kickoff_timing::ResourceKind;
use serde::{Deserialize, Serialize};

/// What a collect grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reward {
    pub coins: u64,
    pub xp: u64,
    pub skill_points: u64,
    pub knowledge_points: u64,
    /// Set when the resource withered; every amount is then zero.
    #[serde(default)]
    pub withered: bool,
}

impl Reward {
    /// Reward of `coins` and `xp`.
    #[must_use]
    pub const fn new(coins: u64, xp: u64) -> Self {
        Self {
            coins,
            xp,
            skill_points: 0,
            knowledge_points: 0,
            withered: false,
        }
    }

    /// Add skill points.
    #[must_use]
    pub const fn with_skill_points(mut self, skill_points: u64) -> Self {
        self.skill_points = skill_points;
        self
    }

    /// Add knowledge points.
    #[must_use]
    pub const fn with_knowledge_points(mut self, knowledge_points: u64) -> Self {
        self.knowledge_points = knowledge_points;
        self
    }

    /// The outcome of collecting a withered resource.
    #[must_use]
    pub const fn withered() -> Self {
        Self {
            coins: 0,
            xp: 0,
            skill_points: 0,
            knowledge_points: 0,
            withered: true,
        }
    }

    /// The balance change this reward applies.
    #[must_use]
    pub fn as_delta(&self) -> BalanceDelta {
        BalanceDelta {
            coins: saturating_i64(self.coins),
            energy: 0,
            xp: saturating_i64(self.xp),
            skill_points: saturating_i64(self.skill_points),
            knowledge_points: saturating_i64(self.knowledge_points),
        }
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Signed change to a [`Balance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceDelta {
    pub coins: i64,
    pub energy: i64,
    pub xp: i64,
    pub skill_points: i64,
    pub knowledge_points: i64,
}

impl BalanceDelta {
    /// A pure coin change.
    #[must_use]
    pub const fn coins(coins: i64) -> Self {
        Self {
            coins,
            energy: 0,
            xp: 0,
            skill_points: 0,
            knowledge_points: 0,
        }
    }
}

/// A user's currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Balance {
    pub coins: u64,
    pub energy: u64,
    pub xp: u64,
    pub skill_points: u64,
    pub knowledge_points: u64,
}

impl Balance {
    /// Apply `delta`, failing without change if any currency would go negative.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientFunds` naming the first currency that falls short.
    pub fn apply(&self, delta: &BalanceDelta) -> Result<Self> {
        Ok(Self {
            coins: apply_field("coins", self.coins, delta.coins)?,
            energy: apply_field("energy", self.energy, delta.energy)?,
            xp: apply_field("xp", self.xp, delta.xp)?,
            skill_points: apply_field("skill points", self.skill_points, delta.skill_points)?,
            knowledge_points: apply_field(
                "knowledge points",
                self.knowledge_points,
                delta.knowledge_points,
            )?,
        })
    }
}

fn apply_field(name: &str, current: u64, delta: i64) -> Result<u64> {
    if delta >= 0 {
        return Ok(current.saturating_add(delta.unsigned_abs()));
    }
    let needed = delta.unsigned_abs();
    current
        .checked_sub(needed)
        .ok_or_else(|| Error::insufficient_funds(name, needed, current))
}

/// Price of starting an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Cost {
    pub coins: u64,
    pub energy: u32,
}

impl Cost {
    #[must_use]
    pub const fn new(coins: u64, energy: u32) -> Self {
        Self { coins, energy }
    }
}

/// Request to start a timed activity.
///
/// For missions `duration` is the claim window; for everything else it is
/// the build, growth, or session length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRequest {
    pub kind: ResourceKind,
    pub duration: TimeDelta,
    pub cost: Cost,
    pub reward: Reward,
    /// How long a ready drill may wait before it withers.
    pub wither_after: Option<TimeDelta>,
}

impl StartRequest {
    #[must_use]
    pub const fn new(kind: ResourceKind, duration: TimeDelta) -> Self {
        Self {
            kind,
            duration,
            cost: Cost::new(0, 0),
            reward: Reward::new(0, 0),
            wither_after: None,
        }
    }

    #[must_use]
    pub const fn with_cost(mut self, cost: Cost) -> Self {
        self.cost = cost;
        self
    }

    #[must_use]
    pub const fn with_reward(mut self, reward: Reward) -> Self {
        self.reward = reward;
        self
    }

    #[must_use]
    pub const fn with_wither_after(mut self, wither_after: TimeDelta) -> Self {
        self.wither_after = Some(wither_after);
        self
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_apply_reward() {
        let balance = Balance {
            coins: 10,
            ..Balance::default()
        };
        let after = balance.apply(&Reward::new(5, 20).as_delta()).unwrap();
        assert_eq!(after.coins, 15);
        assert_eq!(after.xp, 20);
    }

    #[test]
    fn test_apply_rejects_overdraw_without_change() {
        let balance = Balance {
            coins: 10,
            energy: 1,
            ..Balance::default()
        };
        let delta = BalanceDelta {
            coins: -5,
            energy: -3,
            ..BalanceDelta::default()
        };
        let err = balance.apply(&delta).unwrap_err();
        assert_eq!(err, Error::insufficient_funds("energy", 3, 1));
        assert_eq!(balance.coins, 10);
    }

    #[test]
    fn test_withered_reward_is_zero() {
        let reward = Reward::withered();
        assert!(reward.withered);
        assert_eq!(reward.as_delta(), BalanceDelta::default());
    }
}
