//! The collect action and the client-side resource cache.
//!
//! The client keeps the last listing and balance it saw. Both are replaced
//! wholesale from the backend after every state-changing call; nothing is
//! merged locally, so a reload always converges on the backend's view.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use kickoff_core::{Error, Result, ResultExt};
use kickoff_timing::{ResourceId, TimedResource};
use tokio::sync::RwLock;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::types::{Balance, BalanceDelta, Reward, StartRequest};

/// Exponential backoff with a cap.
#[must_use]
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let backoff = base_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(backoff.min(max_ms))
}

/// Backoff plus up to 25% random jitter.
#[must_use]
pub fn jittered_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let backoff = calculate_backoff(attempt, base_ms, max_ms);
    let jitter_range = u64::try_from(backoff.as_millis().div_euclid(4)).unwrap_or(0);
    let Some(jitter) = rand::random::<u64>().checked_rem(jitter_range) else {
        return backoff;
    };
    backoff.saturating_add(Duration::from_millis(jitter))
}

/// Timeout and retry policy for backend calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectConfig {
    /// Per-call timeout.
    pub timeout: Duration,
    /// Extra attempts after a transient collect failure.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub retry_backoff: Duration,
    /// Upper bound on any retry delay.
    pub max_backoff: Duration,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(8),
            max_retries: 1,
            retry_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl CollectConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the timeout is zero or the backoff cap is
    /// below the base delay.
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::invalid_config("collect timeout must be greater than 0"));
        }
        if self.max_backoff < self.retry_backoff {
            return Err(Error::invalid_config(
                "max_backoff must be at least retry_backoff",
            ));
        }
        Ok(())
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Outcome of a successful collect.
///
/// `balance` and `resources` are `None` when the follow-up refresh failed;
/// the reward was still granted and the next reload will catch up.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectReport {
    pub resource_id: ResourceId,
    pub reward: Reward,
    pub balance: Option<Balance>,
    pub resources: Option<Vec<TimedResource>>,
}

#[derive(Debug, Default)]
struct Cache {
    resources: Vec<TimedResource>,
    balance: Option<Balance>,
}

/// Client for the collect action and related calls.
pub struct CollectClient<B: Backend + ?Sized> {
    backend: Arc<B>,
    config: CollectConfig,
    cache: RwLock<Cache>,
}

impl<B: Backend + ?Sized> CollectClient<B> {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `config` is invalid.
    pub fn new(backend: Arc<B>, config: CollectConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            backend,
            config,
            cache: RwLock::new(Cache::default()),
        })
    }

    /// The configured policy.
    pub const fn config(&self) -> &CollectConfig {
        &self.config
    }

    /// The last listing fetched.
    pub async fn resources(&self) -> Vec<TimedResource> {
        self.cache.read().await.resources.clone()
    }

    /// The last balance fetched.
    pub async fn cached_balance(&self) -> Option<Balance> {
        self.cache.read().await.balance
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T>> + Send,
    ) -> Result<T> {
        timeout(self.config.timeout, call)
            .await
            .unwrap_or_else(|_| Err(Error::timeout(operation, self.config.timeout_ms())))
    }

    /// Fetch the active listing and replace the cache with it.
    ///
    /// # Errors
    ///
    /// Returns the backend or timeout error; the cache is left as it was.
    pub async fn reload(&self) -> Result<Vec<TimedResource>> {
        let resources = self.bounded("list_active", self.backend.list_active()).await?;
        self.cache.write().await.resources = resources.clone();
        debug!(count = resources.len(), "Resource cache reloaded");
        Ok(resources)
    }

    /// Fetch the balance and replace the cached one.
    ///
    /// # Errors
    ///
    /// Returns the backend or timeout error.
    pub async fn refresh_balance(&self) -> Result<Balance> {
        let balance = self.bounded("balance", self.backend.balance()).await?;
        self.cache.write().await.balance = Some(balance);
        Ok(balance)
    }

    /// Start an activity. Not retried: a timed-out start may have landed,
    /// and retrying could charge twice. The listing is reloaded either way.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientFunds` before anything is created, or the
    /// backend or timeout error.
    pub async fn start(&self, request: StartRequest) -> Result<TimedResource> {
        let kind = request.kind;
        let outcome = self
            .bounded("start_activity", self.backend.start_activity(request))
            .await;

        match &outcome {
            Ok(resource) => {
                info!(resource_id = %resource.id(), kind = %kind, "Activity started");
                self.refresh_balance()
                    .await
                    .into_option_logged("refresh balance after start");
            }
            Err(e) => warn!(kind = %kind, error = %e, "Activity not started"),
        }
        self.reload().await.into_option_logged("reload after start");
        outcome
    }

    /// Apply a balance change and cache the result.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientFunds` if any currency would go negative.
    pub async fn adjust_balance(&self, delta: BalanceDelta) -> Result<Balance> {
        let balance = self
            .bounded("adjust_balance", self.backend.adjust_balance(delta))
            .await?;
        self.cache.write().await.balance = Some(balance);
        Ok(balance)
    }

    /// Collect a resource.
    ///
    /// Transient failures are retried up to `max_retries` times. On success
    /// the balance and listing are refreshed; on failure the listing is
    /// reloaded best-effort so the caller sees the backend's state.
    ///
    /// # Errors
    ///
    /// Returns `NotReady`, `AlreadyCollected`, `Expired`, or the final
    /// transient error.
    pub async fn collect(&self, id: ResourceId) -> Result<CollectReport> {
        match self.collect_with_retry(id).await {
            Ok(reward) => {
                info!(
                    resource_id = %id,
                    coins = reward.coins,
                    xp = reward.xp,
                    withered = reward.withered,
                    "Collected"
                );
                let balance = self
                    .refresh_balance()
                    .await
                    .into_option_logged("refresh balance after collect");
                let resources = self
                    .reload()
                    .await
                    .into_option_logged("reload after collect");
                Ok(CollectReport {
                    resource_id: id,
                    reward,
                    balance,
                    resources,
                })
            }
            Err(e) => {
                warn!(resource_id = %id, error = %e, "Collect failed");
                self.reload()
                    .await
                    .into_option_logged("reload after failed collect");
                Err(e)
            }
        }
    }

    async fn collect_with_retry(&self, id: ResourceId) -> Result<Reward> {
        let mut attempt = 0u32;
        loop {
            match self.bounded("collect", self.backend.collect(id)).await {
                Ok(reward) => return Ok(reward),
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    let delay = jittered_backoff(
                        attempt,
                        duration_ms(self.config.retry_backoff),
                        duration_ms(self.config.max_backoff),
                    );
                    warn!(
                        resource_id = %id,
                        attempt,
                        delay_ms = duration_ms(delay),
                        error = %e,
                        "Collect failed transiently, retrying"
                    );
                    sleep(delay).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(e) => {
                    if attempt > 0 && matches!(e, Error::AlreadyCollected { .. }) {
                        // An earlier attempt may have landed before its response was lost.
                        warn!(
                            resource_id = %id,
                            "Collect retry found the resource already collected"
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl<B: Backend + ?Sized> std::fmt::Debug for CollectClient<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
