//! An in-memory HQ session.
//!
//! Starts one of each timed activity, polls them, and collects each one as
//! its ready edge fires. Single-item countdowns and the energy regen
//! countdown share one poller; drills and missions sit on a list-cadence
//! poller. The clock is injected; the binary passes a
//! [`ScaledClock`](kickoff_timing::ScaledClock) so the session finishes in
//! seconds.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use kickoff_backend::{Balance, CollectClient, InMemoryBackend, Reward, TracingBackend};
use kickoff_core::{Error, Result, ResultExt};
use kickoff_poller::{ChannelSink, CountdownPoller, PollerEvent, PollerHandle};
use kickoff_timing::{
    Clock, EnergyMeter, EnergyReading, PollCadence, ResourceId, ResourceKind, ResourceState,
    TimedResource, format_remaining,
};
use tracing::{debug, info, warn};

use crate::config::KickoffConfig;

type SessionBackend = TracingBackend<InMemoryBackend>;

/// How one activity ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Collected(Reward),
    Expired,
    Failed(String),
}

/// Result of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSummary {
    pub outcomes: Vec<(ResourceKind, Outcome)>,
    pub balance: Option<Balance>,
    pub energy: EnergyReading,
    /// Resources still tracked when the session gave up.
    pub unfinished: usize,
}

impl SimulationSummary {
    /// Number of activities that paid out something other than a withered
    /// zero reward.
    #[must_use]
    pub fn rewarded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, Outcome::Collected(r) if !r.withered))
            .count()
    }
}

struct Session {
    client: CollectClient<SessionBackend>,
    backend: Arc<SessionBackend>,
    clock: Arc<dyn Clock>,
    /// Activities this session started.
    kinds: HashMap<ResourceId, ResourceKind>,
    /// Id the energy regen countdown is tracked under.
    energy_id: ResourceId,
    outcomes: Vec<(ResourceKind, Outcome)>,
}

/// One poller per cadence, each fed the resources of its kinds.
struct Pollers {
    single: PollerHandle,
    list: PollerHandle,
}

fn split_by_cadence(resources: Vec<TimedResource>) -> (Vec<TimedResource>, Vec<TimedResource>) {
    resources
        .into_iter()
        .partition(|r| r.kind().poll_cadence() == PollCadence::Single)
}

impl Pollers {
    fn spawn(
        config: &KickoffConfig,
        clock: &Arc<dyn Clock>,
        resources: Vec<TimedResource>,
        sink: &ChannelSink,
    ) -> Result<Self> {
        let (single, list) = split_by_cadence(resources);
        let single = CountdownPoller::new(
            config.poller_config(PollCadence::Single),
            Arc::clone(clock),
        )
        .spawn(single, Arc::new(sink.clone()))?;
        let list = CountdownPoller::new(config.poller_config(PollCadence::List), Arc::clone(clock))
            .spawn(list, Arc::new(sink.clone()))?;
        Ok(Self { single, list })
    }

    async fn replace(&self, resources: Vec<TimedResource>) {
        let (single, list) = split_by_cadence(resources);
        self.single.replace(single).await;
        self.list.replace(list).await;
    }

    async fn mark_collected(&self, id: ResourceId) -> bool {
        let on_single = self.single.mark_collected(id).await;
        let on_list = self.list.mark_collected(id).await;
        on_single || on_list
    }

    async fn tracked(&self) -> Vec<ResourceId> {
        let mut tracked = self.single.tracked().await;
        tracked.extend(self.list.tracked().await);
        tracked
    }

    async fn shutdown(self) -> Result<()> {
        let single = self.single.shutdown().await;
        self.list.shutdown().await?;
        single
    }
}

/// Run a session to completion or until `simulation.max_wall_ms` elapses.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, an activity cannot be
/// started, or the poller fails to start or stop.
pub async fn run(config: &KickoffConfig, clock: Arc<dyn Clock>) -> Result<SimulationSummary> {
    let sim = &config.simulation;
    let energy =
        EnergyMeter::new(sim.energy_max, sim.energy_max, sim.energy_regen()?, clock.now())?;
    let backend = Arc::new(TracingBackend::new(InMemoryBackend::with_wallet(
        Arc::clone(&clock),
        Balance {
            coins: sim.starting_coins,
            ..Balance::default()
        },
        energy,
    )));
    let client = CollectClient::new(Arc::clone(&backend), config.collect_config())?;

    let mut session = Session {
        client,
        backend,
        clock,
        kinds: HashMap::new(),
        energy_id: ResourceId::new(),
        outcomes: Vec::new(),
    };

    for request in sim.plan()? {
        let resource = session.client.start(request).await?;
        info!(
            resource_id = %resource.id(),
            kind = %resource.kind(),
            completes_in = %format_remaining(resource.progress(session.clock.now()).remaining_ms),
            "Started"
        );
        session.kinds.insert(resource.id(), resource.kind());
    }
    session.log_energy().await;

    // Missions are claimable as soon as they are listed.
    let now = session.clock.now();
    let claimable: Vec<ResourceId> = session
        .client
        .resources()
        .await
        .iter()
        .filter(|r| r.kind().claimable_while_active() && r.is_collectable(now))
        .map(|r| r.id())
        .collect();
    for id in claimable {
        session.collect(id, None).await;
    }

    let (sink, mut events) = ChannelSink::new();
    let listing = session.client.resources().await;
    let pollers = Pollers::spawn(
        config,
        &session.clock,
        session.with_energy(listing).await,
        &sink.edges_only(),
    )?;

    let deadline = tokio::time::Instant::now()
        .checked_add(Duration::from_millis(sim.max_wall_ms))
        .ok_or_else(|| Error::invalid_config("simulation.max_wall_ms is out of range"))?;
    while session.unfinished(&pollers).await > 0 {
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Err(_) => {
                warn!(
                    unfinished = session.unfinished(&pollers).await,
                    "Simulation timed out before every activity finished"
                );
                break;
            }
            Ok(None) => break,
            Ok(Some(PollerEvent::Ready(view))) if view.id == session.energy_id => {
                session.on_energy_point(&pollers).await;
            }
            Ok(Some(PollerEvent::Ready(view))) => {
                info!(resource_id = %view.id, kind = %view.kind, "Ready");
                session.collect(view.id, Some(&pollers)).await;
            }
            Ok(Some(PollerEvent::Terminal { id, state })) => {
                session.on_terminal(id, state, &pollers).await;
            }
            Ok(Some(PollerEvent::Tick(_))) => {}
        }
    }

    let unfinished = session.unfinished(&pollers).await;
    pollers.shutdown().await?;
    session.log_energy().await;

    let balance = match session.client.refresh_balance().await.into_option_logged("final balance") {
        Some(balance) => Some(balance),
        None => session.client.cached_balance().await,
    };
    Ok(SimulationSummary {
        outcomes: session.outcomes,
        balance,
        energy: session.backend.inner().energy().await,
        unfinished,
    })
}

impl Session {
    fn kind_of(&self, id: ResourceId) -> Option<ResourceKind> {
        let kind = self.kinds.get(&id).copied();
        if kind.is_none() {
            warn!(resource_id = %id, "Event for a resource this session did not start");
        }
        kind
    }

    /// Activities still tracked by either poller.
    async fn unfinished(&self, pollers: &Pollers) -> usize {
        pollers
            .tracked()
            .await
            .iter()
            .filter(|id| self.kinds.contains_key(id))
            .count()
    }

    /// `resources` plus the energy regen countdown, unless energy is full.
    async fn with_energy(&self, mut resources: Vec<TimedResource>) -> Vec<TimedResource> {
        if let Some(countdown) = self.backend.inner().energy_countdown(self.energy_id).await {
            resources.push(countdown);
        }
        resources
    }

    async fn retrack(&self, pollers: &Pollers, resources: Vec<TimedResource>) {
        pollers.replace(self.with_energy(resources).await).await;
    }

    async fn on_energy_point(&self, pollers: &Pollers) {
        let reading = self.backend.inner().energy().await;
        info!(energy = reading.energy, max = reading.max, "Energy point regenerated");
        self.retrack(pollers, self.client.resources().await).await;
    }

    async fn collect(&mut self, id: ResourceId, pollers: Option<&Pollers>) {
        let Some(kind) = self.kind_of(id) else {
            return;
        };
        match self.client.collect(id).await {
            Ok(report) => {
                if report.reward.withered {
                    info!(resource_id = %id, kind = %kind, "Withered, cleared with no reward");
                } else {
                    info!(
                        resource_id = %id,
                        kind = %kind,
                        coins = report.reward.coins,
                        xp = report.reward.xp,
                        balance_coins = ?report.balance.map(|b| b.coins),
                        "Collected"
                    );
                }
                if let Some(pollers) = pollers {
                    pollers.mark_collected(id).await;
                    if let Some(resources) = report.resources {
                        self.retrack(pollers, resources).await;
                    }
                }
                self.outcomes.push((kind, Outcome::Collected(report.reward)));
            }
            Err(e) => {
                warn!(resource_id = %id, kind = %kind, error = %e.user_message(), "Collect failed");
                if let Some(pollers) = pollers {
                    self.retrack(pollers, self.client.resources().await).await;
                }
                self.outcomes.push((kind, Outcome::Failed(e.to_string())));
            }
        }
    }

    async fn on_terminal(&mut self, id: ResourceId, state: ResourceState, pollers: &Pollers) {
        match state {
            // The drill withered on the field; collecting clears it.
            ResourceState::Withered => self.collect(id, Some(pollers)).await,
            ResourceState::Expired => {
                info!(resource_id = %id, "Expired");
                if let Some(kind) = self.kind_of(id) {
                    self.outcomes.push((kind, Outcome::Expired));
                }
            }
            ResourceState::Collected
            | ResourceState::Pending
            | ResourceState::Active
            | ResourceState::Ready => {
                debug!(resource_id = %id, state = %state, "No longer polled");
            }
        }
    }

    async fn log_energy(&self) {
        let reading = self.backend.inner().energy().await;
        if reading.is_full() {
            info!(energy = reading.energy, max = reading.max, "Energy full");
        } else {
            info!(
                energy = reading.energy,
                max = reading.max,
                next_point_in = %format_remaining(reading.next_point.remaining_ms),
                "Energy regenerating"
            );
        }
    }
}
