//! Backend trait and the tracing wrapper.

use std::sync::Arc;

use async_trait::async_trait;
use kickoff_core::Result;
use kickoff_timing::{ResourceId, TimedResource};

use crate::types::{Balance, BalanceDelta, Reward, StartRequest};

/// The authoritative store for timers, balances, and rewards.
///
/// Implementations own validation: clients only advise on readiness, and a
/// collect is accepted or rejected here.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Create a timed resource, charging its cost.
    async fn start_activity(&self, request: StartRequest) -> Result<TimedResource>;

    /// Resources that have not been cleared, with authoritative timestamps.
    async fn list_active(&self) -> Result<Vec<TimedResource>>;

    /// Claim a resource's reward. Idempotent: a second collect of the same
    /// resource fails with `AlreadyCollected` and grants nothing.
    async fn collect(&self, id: ResourceId) -> Result<Reward>;

    /// Current balance.
    async fn balance(&self) -> Result<Balance>;

    /// Apply a balance change atomically.
    async fn adjust_balance(&self, delta: BalanceDelta) -> Result<Balance>;
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for Arc<B> {
    async fn start_activity(&self, request: StartRequest) -> Result<TimedResource> {
        (**self).start_activity(request).await
    }

    async fn list_active(&self) -> Result<Vec<TimedResource>> {
        (**self).list_active().await
    }

    async fn collect(&self, id: ResourceId) -> Result<Reward> {
        (**self).collect(id).await
    }

    async fn balance(&self) -> Result<Balance> {
        (**self).balance().await
    }

    async fn adjust_balance(&self, delta: BalanceDelta) -> Result<Balance> {
        (**self).adjust_balance(delta).await
    }
}

/// A wrapper that adds tracing to a backend.
pub struct TracingBackend<B: Backend> {
    inner: B,
}

impl<B: Backend> TracingBackend<B> {
    /// Create a new tracing backend.
    pub const fn new(inner: B) -> Self {
        Self { inner }
    }

    /// Borrow the wrapped backend.
    pub const fn inner(&self) -> &B {
        &self.inner
    }
}

#[async_trait]
impl<B: Backend> Backend for TracingBackend<B> {
    async fn start_activity(&self, request: StartRequest) -> Result<TimedResource> {
        tracing::debug!(
            kind = %request.kind,
            duration_ms = request.duration.num_milliseconds(),
            coins = request.cost.coins,
            energy = request.cost.energy,
            "Starting activity"
        );
        let result = self.inner.start_activity(request).await;
        match &result {
            Ok(resource) => tracing::trace!(
                resource_id = %resource.id(),
                completes_at = %resource.completes_at(),
                "Activity started"
            ),
            Err(e) => tracing::debug!(error = %e, "Activity rejected"),
        }
        result
    }

    async fn list_active(&self) -> Result<Vec<TimedResource>> {
        tracing::debug!("Listing active resources");
        let result = self.inner.list_active().await;
        if let Ok(ref resources) = result {
            tracing::trace!(count = resources.len(), "Active resources listed");
        }
        result
    }

    async fn collect(&self, id: ResourceId) -> Result<Reward> {
        tracing::debug!(resource_id = %id, "Collecting");
        let result = self.inner.collect(id).await;
        match &result {
            Ok(reward) => tracing::trace!(
                resource_id = %id,
                coins = reward.coins,
                xp = reward.xp,
                withered = reward.withered,
                "Collected"
            ),
            Err(e) => tracing::debug!(resource_id = %id, error = %e, "Collect rejected"),
        }
        result
    }

    async fn balance(&self) -> Result<Balance> {
        self.inner.balance().await
    }

    async fn adjust_balance(&self, delta: BalanceDelta) -> Result<Balance> {
        tracing::debug!(?delta, "Adjusting balance");
        self.inner.adjust_balance(delta).await
    }
}
