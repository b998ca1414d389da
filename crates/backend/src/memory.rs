//! In-memory backend.
//!
//! Holds the same rules a hosted backend enforces: funds are checked before
//! anything is created, collects are idempotent, drills wither, and missions
//! expire. Time comes from an injected [`Clock`] so tests and the simulator
//! can move it freely.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeDelta;
use kickoff_core::{Error, Result};
use kickoff_timing::{
    Clock, EnergyMeter, EnergyReading, ResourceId, ResourceState, TimedResource, Window,
};
use tokio::sync::{Mutex, RwLock};

use crate::backend::Backend;
use crate::types::{Balance, BalanceDelta, Reward, StartRequest};

const DEFAULT_ENERGY_MAX: u32 = 10;
const DEFAULT_ENERGY_REGEN_MINUTES: i64 = 10;

#[derive(Debug, Clone)]
struct Entry {
    resource: TimedResource,
    reward: Reward,
}

/// Currencies other than energy, which regenerates on its own meter.
#[derive(Debug)]
struct Wallet {
    balance: Balance,
    energy: EnergyMeter,
}

impl Wallet {
    fn snapshot(&self, clock: &dyn Clock) -> Balance {
        Balance {
            energy: u64::from(self.energy.regenerated(clock.now()).energy),
            ..self.balance
        }
    }
}

/// In-memory backend for tests and the simulator.
pub struct InMemoryBackend {
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<ResourceId, Entry>>,
    wallet: Mutex<Wallet>,
    faults: Mutex<VecDeque<Error>>,
    latency: RwLock<Option<Duration>>,
}

impl InMemoryBackend {
    /// Create a backend with an empty balance and full energy.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the default energy meter is rejected.
    pub fn new(clock: Arc<dyn Clock>) -> Result<Self> {
        let energy = EnergyMeter::new(
            DEFAULT_ENERGY_MAX,
            DEFAULT_ENERGY_MAX,
            TimeDelta::minutes(DEFAULT_ENERGY_REGEN_MINUTES),
            clock.now(),
        )?;
        Ok(Self::with_wallet(clock, Balance::default(), energy))
    }

    /// Create a backend with a starting balance and energy meter.
    ///
    /// The balance's `energy` field is ignored; the meter is authoritative.
    pub fn with_wallet(clock: Arc<dyn Clock>, balance: Balance, energy: EnergyMeter) -> Self {
        Self {
            clock,
            entries: RwLock::new(HashMap::new()),
            wallet: Mutex::new(Wallet { balance, energy }),
            faults: Mutex::new(VecDeque::new()),
            latency: RwLock::new(None),
        }
    }

    /// Insert an existing resource, e.g. one started before the session.
    pub async fn seed(&self, resource: TimedResource, reward: Reward) {
        self.entries
            .write()
            .await
            .insert(resource.id(), Entry { resource, reward });
    }

    /// Fail the next call with `error`. Queued faults are consumed in order,
    /// one per call.
    pub async fn fail_next(&self, error: Error) {
        self.faults.lock().await.push_back(error);
    }

    /// Delay every call by `latency`.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write().await = latency;
    }

    /// Energy level and countdown to the next point.
    pub async fn energy(&self) -> EnergyReading {
        self.wallet.lock().await.energy.regenerated(self.clock.now())
    }

    /// Countdown to the next energy point, tracked under `id`, or `None`
    /// while energy is full.
    pub async fn energy_countdown(&self, id: ResourceId) -> Option<TimedResource> {
        self.wallet
            .lock()
            .await
            .energy
            .next_point_resource(id, self.clock.now())
    }

    /// A resource as stored, including cleared ones.
    pub async fn get(&self, id: ResourceId) -> Option<TimedResource> {
        self.entries
            .read()
            .await
            .get(&id)
            .map(|entry| entry.resource.clone())
    }

    async fn enter(&self, operation: &str) -> Result<()> {
        let latency = *self.latency.read().await;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match self.faults.lock().await.pop_front() {
            Some(error) => {
                tracing::debug!(operation, error = %error, "Injected backend fault");
                Err(error)
            }
            None => Ok(()),
        }
    }

    fn build_resource(&self, request: &StartRequest) -> Result<TimedResource> {
        if request.duration < TimeDelta::zero() {
            return Err(Error::invalid_window("duration must not be negative"));
        }
        let window = Window::from_duration(self.clock.now(), request.duration)?;
        let resource = TimedResource::new(ResourceId::new(), request.kind, window);
        match request.wither_after {
            Some(after) => {
                let wither_at = resource
                    .completes_at()
                    .checked_add_signed(after)
                    .ok_or_else(|| Error::invalid_window("wither deadline out of range"))?;
                resource.with_wither_at(wither_at)
            }
            None => Ok(resource),
        }
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn start_activity(&self, request: StartRequest) -> Result<TimedResource> {
        self.enter("start_activity").await?;
        let resource = self.build_resource(&request)?;
        let now = self.clock.now();

        {
            let mut wallet = self.wallet.lock().await;
            let available = wallet.energy.regenerated(now).energy;
            if available < request.cost.energy {
                return Err(Error::insufficient_funds(
                    "energy",
                    u64::from(request.cost.energy),
                    u64::from(available),
                ));
            }
            let coins = wallet.balance.coins;
            let remaining = coins
                .checked_sub(request.cost.coins)
                .ok_or_else(|| Error::insufficient_funds("coins", request.cost.coins, coins))?;
            wallet.energy.spend(request.cost.energy, now)?;
            wallet.balance.coins = remaining;
        }

        self.entries.write().await.insert(
            resource.id(),
            Entry {
                resource: resource.clone(),
                reward: request.reward,
            },
        );
        Ok(resource)
    }

    async fn list_active(&self) -> Result<Vec<TimedResource>> {
        self.enter("list_active").await?;
        let now = self.clock.now();
        let mut entries = self.entries.write().await;

        let mut active = Vec::new();
        for entry in entries.values_mut() {
            if entry.resource.state().is_terminal() {
                continue;
            }
            match entry.resource.effective_state(now) {
                ResourceState::Expired => {
                    entry.resource = entry.resource.clone().with_state(ResourceState::Expired);
                }
                state => active.push(entry.resource.clone().with_state(state)),
            }
        }
        active.sort_by_key(TimedResource::completes_at);
        Ok(active)
    }

    async fn collect(&self, id: ResourceId) -> Result<Reward> {
        self.enter("collect").await?;
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| Error::resource_not_found(id))?;

        if entry.resource.state().is_terminal() {
            return Err(match entry.resource.state() {
                ResourceState::Expired => Error::expired(id),
                _ => Error::already_collected(id),
            });
        }

        let reward = match entry.resource.effective_state(now) {
            ResourceState::Withered => {
                entry.resource = entry.resource.clone().with_state(ResourceState::Withered);
                return Ok(Reward::withered());
            }
            ResourceState::Expired => {
                entry.resource = entry.resource.clone().with_state(ResourceState::Expired);
                return Err(Error::expired(id));
            }
            ResourceState::Active if !entry.resource.kind().claimable_while_active() => {
                return Err(Error::not_ready(id, entry.resource.window().remaining_ms(now)));
            }
            ResourceState::Pending => {
                return Err(Error::not_ready(id, entry.resource.progress(now).remaining_ms));
            }
            _ => entry.reward,
        };

        {
            let mut wallet = self.wallet.lock().await;
            wallet.balance = wallet.balance.apply(&reward.as_delta())?;
        }
        entry.resource = entry.resource.clone().with_state(ResourceState::Collected);
        Ok(reward)
    }

    async fn balance(&self) -> Result<Balance> {
        self.enter("balance").await?;
        Ok(self.wallet.lock().await.snapshot(self.clock.as_ref()))
    }

    async fn adjust_balance(&self, delta: BalanceDelta) -> Result<Balance> {
        self.enter("adjust_balance").await?;
        let now = self.clock.now();
        let mut wallet = self.wallet.lock().await;

        // Validate every currency before touching any of them.
        let current = wallet.snapshot(self.clock.as_ref());
        let next = current.apply(&delta)?;

        let energy_change = u32::try_from(delta.energy.unsigned_abs()).unwrap_or(u32::MAX);
        if delta.energy < 0 {
            wallet.energy.spend(energy_change, now)?;
        } else if delta.energy > 0 {
            wallet.energy.restore(energy_change, now);
        }
        wallet.balance = Balance {
            energy: 0,
            ..next
        };
        Ok(wallet.snapshot(self.clock.as_ref()))
    }
}
