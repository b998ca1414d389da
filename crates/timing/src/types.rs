//! Identifiers, kinds and lifecycle states for timed resources.

use std::str::FromStr;

use kickoff_core::Error;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for a timed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(Ulid);

impl ResourceId {
    /// Create a new random resource ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ResourceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s)
            .map(Self)
            .map_err(|e| Error::invalid_record(format!("bad resource id '{s}': {e}")))
    }
}

/// How often a countdown of this kind needs re-evaluating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollCadence {
    /// Single-item countdown shown to the second.
    Single,
    /// Grid or list of many timers; coarser ticks limit re-render cost.
    List,
}

/// What a timed resource represents in the HQ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Building construction or upgrade.
    BuildingUpgrade,
    /// Practice-field drill; withers if left uncollected.
    Drill,
    /// Squad-unit training session.
    Training,
    /// Daily mission; the countdown is its expiry.
    Mission,
    /// Energy regeneration towards the next point.
    EnergyRegen,
}

impl ResourceKind {
    /// State entered when the countdown reaches zero.
    #[must_use]
    pub const fn deadline_state(&self) -> ResourceState {
        match self {
            Self::Mission => ResourceState::Expired,
            Self::BuildingUpgrade | Self::Drill | Self::Training | Self::EnergyRegen => {
                ResourceState::Ready
            }
        }
    }

    /// Whether a ready resource of this kind can wither.
    #[must_use]
    pub const fn can_wither(&self) -> bool {
        matches!(self, Self::Drill)
    }

    /// Whether the resource is claimable while its countdown is still running.
    #[must_use]
    pub const fn claimable_while_active(&self) -> bool {
        matches!(self, Self::Mission)
    }

    /// Default polling cadence for screens showing this kind.
    #[must_use]
    pub const fn poll_cadence(&self) -> PollCadence {
        match self {
            Self::Drill | Self::Mission => PollCadence::List,
            Self::BuildingUpgrade | Self::Training | Self::EnergyRegen => PollCadence::Single,
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::BuildingUpgrade => "building_upgrade",
            Self::Drill => "drill",
            Self::Training => "training",
            Self::Mission => "mission",
            Self::EnergyRegen => "energy_regen",
        };
        f.write_str(name)
    }
}

/// Lifecycle of a timed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    /// Not started (e.g. an empty building slot).
    Pending,
    /// Counting down.
    Active,
    /// Duration elapsed, awaiting collection.
    Ready,
    /// Terminal: reward claimed.
    Collected,
    /// Terminal: deadline passed silently, no penalty shown.
    Expired,
    /// Terminal: ready but not collected before the wither deadline; zero reward.
    Withered,
}

impl ResourceState {
    /// Check if this is a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Collected | Self::Expired | Self::Withered)
    }
}

impl std::fmt::Display for ResourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Ready => "ready",
            Self::Collected => "collected",
            Self::Expired => "expired",
            Self::Withered => "withered",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_resource_id_generation() {
        assert_ne!(ResourceId::new(), ResourceId::new());
    }

    #[test]
    fn test_resource_id_round_trips_through_str() {
        let id = ResourceId::new();
        let parsed: ResourceId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_resource_id_rejects_garbage() {
        assert!("not-a-ulid".parse::<ResourceId>().is_err());
    }

    #[test]
    fn test_mission_deadline_expires() {
        assert_eq!(ResourceKind::Mission.deadline_state(), ResourceState::Expired);
        assert_eq!(ResourceKind::Drill.deadline_state(), ResourceState::Ready);
    }

    #[test]
    fn test_only_drills_wither() {
        assert!(ResourceKind::Drill.can_wither());
        assert!(!ResourceKind::Training.can_wither());
        assert!(!ResourceKind::Mission.can_wither());
    }

    #[test]
    fn test_terminal_states() {
        assert!(ResourceState::Collected.is_terminal());
        assert!(ResourceState::Expired.is_terminal());
        assert!(ResourceState::Withered.is_terminal());
        assert!(!ResourceState::Ready.is_terminal());
        assert!(!ResourceState::Pending.is_terminal());
    }

    #[test]
    fn test_state_serde_is_snake_case() {
        let json = serde_json::to_string(&ResourceKind::BuildingUpgrade).unwrap();
        assert_eq!(json, "\"building_upgrade\"");
        let state: ResourceState = serde_json::from_str("\"withered\"").unwrap();
        assert_eq!(state, ResourceState::Withered);
    }
}
