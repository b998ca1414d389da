//! The set of resources a poller is watching.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use kickoff_timing::{
    RemainingStyle, ResourceId, ResourceState, TimedResource, format_remaining_with,
};
use tracing::debug;

use crate::edge::ReadyEdge;
use crate::sink::TickView;

/// Result of evaluating one resource on one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// A live resource; `fire_ready` is set on its ready edge only.
    Tick { view: TickView, fire_ready: bool },
    /// The resource reached a terminal state and was dropped from the board.
    Terminal { id: ResourceId, state: ResourceState },
}

#[derive(Debug, Clone)]
struct Tracked {
    resource: TimedResource,
    edge: ReadyEdge,
}

/// Tracked resources plus their ready-edge state.
///
/// The board is rebuilt wholesale from each backend reload; edge state is
/// carried over for resources whose identity and completion instant did not
/// change, so a reload never re-announces readiness.
#[derive(Debug, Clone, Default)]
pub struct CountdownBoard {
    entries: BTreeMap<ResourceId, Tracked>,
    retired: HashSet<ResourceId>,
    style: RemainingStyle,
}

impl CountdownBoard {
    /// Create a board rendering labels in `style`.
    #[must_use]
    pub fn new(style: RemainingStyle) -> Self {
        Self {
            entries: BTreeMap::new(),
            retired: HashSet::new(),
            style,
        }
    }

    /// Create a board already tracking `resources`.
    #[must_use]
    pub fn with_resources(style: RemainingStyle, resources: Vec<TimedResource>) -> Self {
        let mut board = Self::new(style);
        board.replace(resources);
        board
    }

    /// Replace the tracked set with a fresh backend listing.
    ///
    /// Retired ids the listing no longer mentions are forgotten; the backend
    /// has cleared them, so they cannot come back.
    pub fn replace(&mut self, resources: Vec<TimedResource>) {
        let listed: HashSet<ResourceId> = resources.iter().map(TimedResource::id).collect();
        self.retired.retain(|id| listed.contains(id));

        let mut previous = std::mem::take(&mut self.entries);
        for resource in resources {
            let id = resource.id();
            if self.retired.contains(&id) {
                continue;
            }
            let edge = previous
                .remove(&id)
                .filter(|old| old.resource.completes_at() == resource.completes_at())
                .map(|old| old.edge)
                .unwrap_or_default();
            self.entries.insert(id, Tracked { resource, edge });
        }
        debug!(
            tracked = self.entries.len(),
            dropped = previous.len(),
            "Countdown board replaced"
        );
    }

    /// Mark a resource collected locally after the backend confirmed it.
    ///
    /// Returns `false` if the resource is not tracked.
    pub fn mark_collected(&mut self, id: ResourceId) -> bool {
        match self.entries.get_mut(&id) {
            Some(tracked) => {
                tracked.resource = tracked.resource.clone().with_state(ResourceState::Collected);
                true
            }
            None => false,
        }
    }

    /// IDs still being polled.
    #[must_use]
    pub fn tracked(&self) -> Vec<ResourceId> {
        self.entries.keys().copied().collect()
    }

    /// Number of resources still being polled.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is being polled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evaluate every tracked resource against `now`.
    ///
    /// Terminal resources are reported once and removed.
    pub fn evaluate(&mut self, now: DateTime<Utc>) -> Vec<Evaluation> {
        let mut out = Vec::with_capacity(self.entries.len());
        let mut finished = Vec::new();

        for (id, tracked) in &mut self.entries {
            let state = tracked.resource.effective_state(now);
            if state.is_terminal() {
                finished.push(*id);
                out.push(Evaluation::Terminal { id: *id, state });
                continue;
            }

            let progress = tracked.resource.progress(now);
            let fire_ready = match state {
                ResourceState::Active | ResourceState::Ready => {
                    tracked.edge.observe(progress.remaining_ms)
                }
                _ => false,
            };

            out.push(Evaluation::Tick {
                view: TickView {
                    id: *id,
                    kind: tracked.resource.kind(),
                    state,
                    elapsed_fraction: progress.elapsed_fraction,
                    remaining_ms: progress.remaining_ms,
                    remaining_label: format_remaining_with(progress.remaining_ms, self.style),
                    is_ready: state == ResourceState::Ready,
                },
                fire_ready,
            });
        }

        for id in finished {
            self.entries.remove(&id);
            self.retired.insert(id);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::arithmetic_side_effects)]

    use chrono::TimeDelta;
    use kickoff_timing::{ResourceKind, Window};

    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        match DateTime::parse_from_rfc3339(s) {
            Ok(t) => t.with_timezone(&Utc),
            Err(e) => panic!("bad timestamp {s}: {e}"),
        }
    }

    fn training(start: DateTime<Utc>, secs: i64) -> TimedResource {
        let window = Window::from_duration(start, TimeDelta::seconds(secs)).unwrap();
        TimedResource::new(ResourceId::new(), ResourceKind::Training, window)
    }

    fn board_of(resources: Vec<TimedResource>) -> CountdownBoard {
        CountdownBoard::with_resources(RemainingStyle::ReadyLabel, resources)
    }

    fn ready_count(evals: &[Evaluation]) -> usize {
        evals
            .iter()
            .filter(|e| matches!(e, Evaluation::Tick { fire_ready: true, .. }))
            .count()
    }

    #[test]
    fn test_ready_fires_once_across_ticks() {
        let start = at("2024-01-01T00:00:00Z");
        let mut board = board_of(vec![training(start, 3)]);

        let total: usize = (0..10)
            .map(|s| ready_count(&board.evaluate(start + TimeDelta::seconds(s))))
            .sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_labels_follow_style() {
        let start = at("2024-01-01T00:00:00Z");
        let mut board = board_of(vec![training(start, 90)]);
        match board.evaluate(start).first() {
            Some(Evaluation::Tick { view, .. }) => assert_eq!(view.remaining_label, "1m 30s"),
            other => panic!("unexpected evaluation: {other:?}"),
        }
        match board.evaluate(start + TimeDelta::seconds(90)).first() {
            Some(Evaluation::Tick { view, .. }) => {
                assert_eq!(view.remaining_label, "Ready!");
                assert!(view.is_ready);
            }
            other => panic!("unexpected evaluation: {other:?}"),
        }
    }

    #[test]
    fn test_replace_keeps_edge_for_unchanged_resource() {
        let start = at("2024-01-01T00:00:00Z");
        let r = training(start, 1);
        let mut board = board_of(vec![r.clone()]);
        assert_eq!(ready_count(&board.evaluate(start + TimeDelta::seconds(2))), 1);

        board.replace(vec![r]);
        assert_eq!(ready_count(&board.evaluate(start + TimeDelta::seconds(3))), 0);
    }

    #[test]
    fn test_replace_resets_edge_when_rescheduled() {
        let start = at("2024-01-01T00:00:00Z");
        let r = training(start, 1);
        let mut board = board_of(vec![r.clone()]);
        assert_eq!(ready_count(&board.evaluate(start + TimeDelta::seconds(2))), 1);

        let window = Window::from_duration(start, TimeDelta::seconds(10)).unwrap();
        let rescheduled = TimedResource::new(r.id(), ResourceKind::Training, window);
        board.replace(vec![rescheduled]);
        assert_eq!(ready_count(&board.evaluate(start + TimeDelta::seconds(3))), 0);
        assert_eq!(ready_count(&board.evaluate(start + TimeDelta::seconds(10))), 1);
    }

    #[test]
    fn test_terminal_reported_once_and_dropped() {
        let start = at("2024-01-01T00:00:00Z");
        let r = training(start, 1);
        let id = r.id();
        let mut board = board_of(vec![r.clone()]);

        assert!(board.mark_collected(id));
        let evals = board.evaluate(start);
        assert_eq!(
            evals,
            vec![Evaluation::Terminal {
                id,
                state: ResourceState::Collected
            }]
        );
        assert!(board.is_empty());

        // A stale listing that still carries the resource does not revive it
        board.replace(vec![r]);
        assert!(board.evaluate(start).is_empty());
    }

    #[test]
    fn test_retired_ids_forgotten_once_unlisted() {
        let start = at("2024-01-01T00:00:00Z");
        let r = training(start, 1);
        let id = r.id();
        let mut board = board_of(vec![r.clone()]);
        assert!(board.mark_collected(id));
        board.evaluate(start);
        assert!(board.retired.contains(&id));

        board.replace(vec![r]);
        assert!(board.retired.contains(&id));

        board.replace(Vec::new());
        assert!(board.retired.is_empty());
    }

    #[test]
    fn test_sibling_keeps_polling_after_wither() {
        let start = at("2024-01-01T00:00:00Z");
        let ready_at = start + TimeDelta::seconds(10);
        let drill = TimedResource::new(
            ResourceId::new(),
            ResourceKind::Drill,
            Window::from_deadline(Some(start), ready_at),
        )
        .with_wither_at(ready_at + TimeDelta::seconds(5))
        .unwrap();
        let long = training(start, 3600);
        let mut board = board_of(vec![drill, long.clone()]);

        let evals = board.evaluate(start + TimeDelta::seconds(20));
        assert!(evals
            .iter()
            .any(|e| matches!(e, Evaluation::Terminal { state: ResourceState::Withered, .. })));
        assert_eq!(board.tracked(), vec![long.id()]);
    }

    #[test]
    fn test_mission_expiry_is_terminal_without_ready() {
        let start = at("2024-01-01T00:00:00Z");
        let mission = TimedResource::new(
            ResourceId::new(),
            ResourceKind::Mission,
            Window::from_deadline(Some(start), start + TimeDelta::hours(24)),
        );
        let mut board = board_of(vec![mission]);
        let evals = board.evaluate(start + TimeDelta::hours(25));
        assert_eq!(ready_count(&evals), 0);
        assert!(matches!(
            evals.first(),
            Some(Evaluation::Terminal { state: ResourceState::Expired, .. })
        ));
    }
}
