//! The countdown poller task.
//!
//! One reusable poller replaces per-screen interval timers. Each tick it reads
//! the injected clock (never a counted tick total, so backgrounding the app
//! cannot make it drift), evaluates the board and dispatches to the sink.

use std::sync::Arc;
use std::time::Duration;

use kickoff_core::{Error, Result};
use kickoff_timing::{Clock, PollCadence, RemainingStyle, ResourceId, TimedResource};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::board::{CountdownBoard, Evaluation};
use crate::sink::CountdownSink;

/// Configuration for a countdown poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Time between evaluations.
    pub tick_interval: Duration,
    /// Label style for rendered countdowns.
    pub style: RemainingStyle,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self::single_item()
    }
}

impl PollerConfig {
    /// One countdown shown to the second.
    #[must_use]
    pub const fn single_item() -> Self {
        Self {
            tick_interval: Duration::from_millis(1000),
            style: RemainingStyle::Clock,
        }
    }

    /// A list or grid of many countdowns.
    #[must_use]
    pub const fn list() -> Self {
        Self {
            tick_interval: Duration::from_millis(10_000),
            style: RemainingStyle::ReadyLabel,
        }
    }

    /// Preset for a resource kind's cadence.
    #[must_use]
    pub const fn for_cadence(cadence: PollCadence) -> Self {
        match cadence {
            PollCadence::Single => Self::single_item(),
            PollCadence::List => Self::list(),
        }
    }

    /// Set the tick interval.
    #[must_use]
    pub const fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the tick interval is zero.
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(Error::invalid_config(
                "poller tick interval must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Countdown poller: evaluates a board on a fixed cadence.
#[derive(Debug, Clone)]
pub struct CountdownPoller {
    config: PollerConfig,
    clock: Arc<dyn Clock>,
}

impl CountdownPoller {
    /// Create a poller reading time from `clock`.
    #[must_use]
    pub fn new(config: PollerConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Evaluate `board` once at the current clock reading and dispatch.
    ///
    /// Returns the number of ready edges fired.
    pub fn tick_once(&self, board: &mut CountdownBoard, sink: &dyn CountdownSink) -> usize {
        dispatch(board.evaluate(self.clock.now()), sink)
    }

    /// Start polling `resources` on a background task.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration is invalid.
    pub fn spawn(
        self,
        resources: Vec<TimedResource>,
        sink: Arc<dyn CountdownSink>,
    ) -> Result<PollerHandle> {
        self.config.validate()?;

        let board = Arc::new(Mutex::new(CountdownBoard::with_resources(
            self.config.style,
            resources,
        )));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(self, Arc::clone(&board), sink, shutdown_rx));

        Ok(PollerHandle {
            board,
            shutdown_tx,
            task: Some(task),
        })
    }
}

async fn run(
    poller: CountdownPoller,
    board: Arc<Mutex<CountdownBoard>>,
    sink: Arc<dyn CountdownSink>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = interval(poller.config.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        tick_ms = poller.config.tick_interval.as_millis() as u64,
        "Countdown poller starting"
    );

    loop {
        tokio::select! {
            biased;
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let mut guard = board.lock().await;
                if *shutdown_rx.borrow() {
                    break;
                }
                let fired = poller.tick_once(&mut guard, sink.as_ref());
                if fired > 0 {
                    debug!(fired, remaining = guard.len(), "Ready edges fired");
                }
            }
        }
    }

    info!("Countdown poller stopped");
}

fn dispatch(evaluations: Vec<Evaluation>, sink: &dyn CountdownSink) -> usize {
    let mut fired = 0usize;
    for evaluation in evaluations {
        match evaluation {
            Evaluation::Tick { view, fire_ready } => {
                sink.render(&view);
                if fire_ready {
                    debug!(resource_id = %view.id, kind = %view.kind, "Resource ready");
                    sink.on_ready(&view);
                    fired = fired.saturating_add(1);
                }
            }
            Evaluation::Terminal { id, state } => {
                info!(resource_id = %id, state = %state, "Resource finished, no longer polled");
                sink.on_terminal(id, state);
            }
        }
    }
    fired
}

/// Owner of a running poller.
///
/// Dropping the handle aborts the task without joining it, so a tick that is
/// already running may still call the sink. Use [`PollerHandle::shutdown`]
/// when no callback may happen afterwards.
#[derive(Debug)]
pub struct PollerHandle {
    board: Arc<Mutex<CountdownBoard>>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Replace the tracked resources with a fresh backend listing.
    pub async fn replace(&self, resources: Vec<TimedResource>) {
        self.board.lock().await.replace(resources);
    }

    /// Record a confirmed collect; the resource is retired on the next tick.
    pub async fn mark_collected(&self, id: ResourceId) -> bool {
        self.board.lock().await.mark_collected(id)
    }

    /// IDs still being polled.
    pub async fn tracked(&self) -> Vec<ResourceId> {
        self.board.lock().await.tracked()
    }

    /// Whether the poller task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the poller and wait for it. No sink callback runs after this
    /// returns.
    ///
    /// # Errors
    ///
    /// Returns `PollerStopped` if the task had already died abnormally.
    pub async fn shutdown(mut self) -> Result<()> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        let _ = self.shutdown_tx.send(true);
        task.await.map_err(|e| {
            warn!(error = %e, "Countdown poller task ended abnormally");
            Error::PollerStopped
        })
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = self.shutdown_tx.send(true);
            task.abort();
        }
    }
}
