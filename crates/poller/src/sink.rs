//! Presentation-layer contract.

use kickoff_timing::{ResourceId, ResourceKind, ResourceState};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

/// What a screen renders for one resource on one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickView {
    pub id: ResourceId,
    pub kind: ResourceKind,
    pub state: ResourceState,
    /// `None` when the total duration is unknown.
    pub elapsed_fraction: Option<f64>,
    pub remaining_ms: u64,
    pub remaining_label: String,
    pub is_ready: bool,
}

/// Receives countdown updates from a poller.
///
/// Called on the poller task; implementations should hand work off rather
/// than block.
///
/// Callbacks stop only once [`PollerHandle::shutdown`] has returned. Dropping
/// the handle aborts the task without waiting, so on a multi-threaded runtime
/// a tick already in progress may still reach the sink after the drop.
///
/// [`PollerHandle::shutdown`]: crate::PollerHandle::shutdown
pub trait CountdownSink: Send + Sync {
    /// Called every tick for every live resource.
    fn render(&self, view: &TickView);

    /// Called once per resource, on the tick its countdown reaches zero.
    fn on_ready(&self, view: &TickView);

    /// Called once when a resource reaches a terminal state and stops being
    /// polled.
    fn on_terminal(&self, _id: ResourceId, _state: ResourceState) {}
}

/// Countdown updates as messages.
#[derive(Debug, Clone, PartialEq)]
pub enum PollerEvent {
    Tick(TickView),
    Ready(TickView),
    Terminal {
        id: ResourceId,
        state: ResourceState,
    },
}

/// A sink that forwards everything over a channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<PollerEvent>,
    forward_ticks: bool,
}

impl ChannelSink {
    /// Create a sink and the receiving end.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PollerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                forward_ticks: true,
            },
            rx,
        )
    }

    /// Only forward ready and terminal events.
    #[must_use]
    pub const fn edges_only(mut self) -> Self {
        self.forward_ticks = false;
        self
    }

    fn send(&self, event: PollerEvent) {
        if self.tx.send(event).is_err() {
            debug!("Countdown receiver dropped");
        }
    }
}

impl CountdownSink for ChannelSink {
    fn render(&self, view: &TickView) {
        if self.forward_ticks {
            self.send(PollerEvent::Tick(view.clone()));
        }
    }

    fn on_ready(&self, view: &TickView) {
        self.send(PollerEvent::Ready(view.clone()));
    }

    fn on_terminal(&self, id: ResourceId, state: ResourceState) {
        self.send(PollerEvent::Terminal { id, state });
    }
}
