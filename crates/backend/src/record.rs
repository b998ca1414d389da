//! Wire records exchanged with the backend.
//!
//! Listings carry whichever timing fields a table has: `completes_at` (or
//! `ready_at` for drills), optionally the start and a duration. Records are
//! converted to [`TimedResource`] at the boundary so nothing downstream sees
//! a half-specified window.

use chrono::{DateTime, TimeDelta, Utc};
use kickoff_core::{Error, Result};
use kickoff_timing::{ResourceId, ResourceKind, ResourceState, TimedResource, Window};
use serde::{Deserialize, Serialize};

use crate::types::Reward;

/// One row of an active-resource listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: ResourceId,
    pub kind: ResourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "ready_at", skip_serializing_if = "Option::is_none")]
    pub completes_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wither_at: Option<DateTime<Utc>>,
    pub state: ResourceState,
}

impl ResourceRecord {
    /// Parse a JSON listing.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRecord` if the payload is not a list of records.
    pub fn parse_listing(json: &str) -> Result<Vec<Self>> {
        serde_json::from_str(json).map_err(|e| Error::invalid_record(e.to_string()))
    }
}

impl TryFrom<ResourceRecord> for TimedResource {
    type Error = Error;

    fn try_from(record: ResourceRecord) -> Result<Self> {
        let duration = record
            .duration_ms
            .map(|ms| {
                TimeDelta::try_milliseconds(ms)
                    .ok_or_else(|| Error::invalid_record(format!("duration_ms out of range: {ms}")))
            })
            .transpose()?;
        let window = Window::from_parts(record.started_at, duration, record.completes_at)?;
        let resource = Self::new(record.id, record.kind, window).with_state(record.state);

        match record.wither_at {
            Some(wither_at) if record.kind.can_wither() => resource.with_wither_at(wither_at),
            Some(_) => Err(Error::invalid_record(format!(
                "{} cannot carry a wither deadline",
                record.kind
            ))),
            None => Ok(resource),
        }
    }
}

impl From<&TimedResource> for ResourceRecord {
    fn from(resource: &TimedResource) -> Self {
        let window = resource.window();
        Self {
            id: resource.id(),
            kind: resource.kind(),
            started_at: window.started_at(),
            completes_at: Some(window.completes_at()),
            duration_ms: window.total().map(|t| t.num_milliseconds()),
            wither_at: resource.wither_at(),
            state: resource.state(),
        }
    }
}

/// Convert a whole listing, rejecting it if any row is malformed.
///
/// # Errors
///
/// Returns the first conversion error.
pub fn into_resources(records: Vec<ResourceRecord>) -> Result<Vec<TimedResource>> {
    records.into_iter().map(TimedResource::try_from).collect()
}

/// Outcome of a collect call as the backend reports it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectRecord {
    pub coins: u64,
    pub xp: u64,
    pub skill_points: u64,
    #[serde(alias = "kp")]
    pub knowledge_points: u64,
    pub withered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Time left, when the backend rejects a collect as not ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_ms: Option<u64>,
}

impl CollectRecord {
    /// Interpret the record for resource `id`.
    ///
    /// # Errors
    ///
    /// Maps a reported error message onto the matching [`Error`] variant.
    pub fn into_result(self, id: ResourceId) -> Result<Reward> {
        if let Some(message) = self.error {
            return Err(classify_error(id, &message, self.remaining_ms));
        }
        if self.withered {
            return Ok(Reward::withered());
        }
        Ok(Reward {
            coins: self.coins,
            xp: self.xp,
            skill_points: self.skill_points,
            knowledge_points: self.knowledge_points,
            withered: false,
        })
    }
}

impl From<Reward> for CollectRecord {
    fn from(reward: Reward) -> Self {
        Self {
            coins: reward.coins,
            xp: reward.xp,
            skill_points: reward.skill_points,
            knowledge_points: reward.knowledge_points,
            withered: reward.withered,
            error: None,
            remaining_ms: None,
        }
    }
}

fn classify_error(id: ResourceId, message: &str, remaining_ms: Option<u64>) -> Error {
    let lower = message.to_lowercase();
    if lower.contains("already") {
        Error::already_collected(id)
    } else if lower.contains("not ready") || lower.contains("not_ready") {
        remaining_ms.map_or_else(
            || Error::not_ready_unknown(id),
            |ms| Error::not_ready(id, ms),
        )
    } else if lower.contains("expired") {
        Error::expired(id)
    } else if lower.contains("not found") {
        Error::resource_not_found(id)
    } else {
        Error::invalid_record(message)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_drill_listing_uses_ready_at() {
        let json = r#"[{
            "id": "01HZZZZZZZZZZZZZZZZZZZZZZZ",
            "kind": "drill",
            "ready_at": "2024-01-01T12:00:00Z",
            "wither_at": "2024-01-01T12:10:00Z",
            "state": "active"
        }]"#;
        let records = ResourceRecord::parse_listing(json).unwrap();
        let resources = into_resources(records).unwrap();
        let drill = resources.first().unwrap();
        assert_eq!(drill.kind(), ResourceKind::Drill);
        assert_eq!(drill.completes_at().to_rfc3339(), "2024-01-01T12:00:00+00:00");
        assert!(drill.wither_at().is_some());
        assert!(drill.window().total().is_none());
    }

    #[test]
    fn test_start_and_duration_only() {
        let json = r#"[{
            "id": "01HZZZZZZZZZZZZZZZZZZZZZZZ",
            "kind": "training",
            "started_at": "2024-01-01T12:00:00Z",
            "duration_ms": 300000,
            "state": "active"
        }]"#;
        let resources = into_resources(ResourceRecord::parse_listing(json).unwrap()).unwrap();
        let training = resources.first().unwrap();
        assert_eq!(training.completes_at().to_rfc3339(), "2024-01-01T12:05:00+00:00");
    }

    #[test]
    fn test_record_without_timing_is_rejected() {
        let record = ResourceRecord {
            id: ResourceId::new(),
            kind: ResourceKind::Training,
            started_at: None,
            completes_at: None,
            duration_ms: Some(1000),
            wither_at: None,
            state: ResourceState::Active,
        };
        assert!(matches!(
            TimedResource::try_from(record),
            Err(Error::InvalidWindow { .. })
        ));
    }

    #[test]
    fn test_collect_record_results() {
        let id = ResourceId::new();
        let withered: CollectRecord =
            serde_json::from_str(r#"{"coins": 0, "xp": 0, "withered": true}"#).unwrap();
        assert_eq!(withered.into_result(id).unwrap(), Reward::withered());

        let ok: CollectRecord =
            serde_json::from_str(r#"{"coins": 12, "xp": 30, "kp": 2}"#).unwrap();
        assert_eq!(
            ok.into_result(id).unwrap(),
            Reward::new(12, 30).with_knowledge_points(2)
        );

        let dup: CollectRecord =
            serde_json::from_str(r#"{"error": "Already collected"}"#).unwrap();
        assert_eq!(dup.into_result(id), Err(Error::already_collected(id)));
    }

    #[test]
    fn test_not_ready_keeps_reported_remaining_time() {
        let id = ResourceId::new();
        let bare: CollectRecord = serde_json::from_str(r#"{"error": "Not ready"}"#).unwrap();
        assert_eq!(bare.into_result(id), Err(Error::not_ready_unknown(id)));

        let timed: CollectRecord =
            serde_json::from_str(r#"{"error": "Not ready", "remaining_ms": 42000}"#).unwrap();
        assert_eq!(timed.into_result(id), Err(Error::not_ready(id, 42_000)));
    }
}
