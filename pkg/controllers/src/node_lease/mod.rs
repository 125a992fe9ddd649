//! Node lease controller.
//!
//! Each node owns one lease in the `kube-node-lease` namespace and renews it
//! on a fixed interval so that readers can tell the node is alive. Creating
//! the lease is retried forever with exponential backoff; renewing it is
//! retried a bounded number of times per cycle, refetching on conflicts.

mod builder;
#[cfg(test)]
mod testing;

pub use builder::LeaseBuilder;

use pkg_constants::lease::{
    DEFAULT_RENEW_INTERVAL, INITIAL_BACKOFF, MAX_BACKOFF, MAX_UPDATE_RETRIES, NAMESPACE_NODE_LEASE,
};
use pkg_state::lease::{LeaseClient, LeaseError};
use pkg_state::nodes::NodeLookup;
use pkg_types::lease::Lease;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info};

use crate::clock::Clock;

/// Hook invoked when renewal keeps failing within one cycle.
/// It must return promptly.
pub type FailureCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenewError {
    #[error("failed {attempts} attempts to update node lease")]
    Exhausted { attempts: u32 },
}

/// The renew interval never exceeds the node status update frequency, so a
/// shorter staleness threshold on the reader side is still met.
pub fn renew_interval(default: Duration, node_status_update_frequency: Duration) -> Duration {
    default.min(node_status_update_frequency)
}

/// Doubling delay, capped at `max`. The first delay is `initial`.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            next: initial.min(max),
            max,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(self.max);
        delay
    }
}

#[derive(Debug, Clone)]
pub struct NodeLeaseConfig {
    /// Node name; also the lease name.
    pub holder_identity: String,
    pub lease_duration_seconds: i32,
    pub node_status_update_frequency: Duration,
}

/// Creates and renews this node's lease.
pub struct NodeLeaseController {
    client: Option<Arc<dyn LeaseClient>>,
    builder: LeaseBuilder,
    clock: Arc<dyn Clock>,
    renew_interval: Duration,
    max_update_retries: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    on_repeated_failure: Option<FailureCallback>,
}

impl NodeLeaseController {
    /// A controller without a lease client never claims or renews a lease.
    pub fn new(
        config: NodeLeaseConfig,
        clock: Arc<dyn Clock>,
        client: Option<Arc<dyn LeaseClient>>,
        nodes: Arc<dyn NodeLookup>,
    ) -> Self {
        let renew_interval =
            renew_interval(DEFAULT_RENEW_INTERVAL, config.node_status_update_frequency);
        let builder = LeaseBuilder::new(
            config.holder_identity,
            config.lease_duration_seconds,
            clock.clone(),
            nodes,
        );
        Self {
            client,
            builder,
            clock,
            renew_interval,
            max_update_retries: MAX_UPDATE_RETRIES,
            initial_backoff: INITIAL_BACKOFF,
            max_backoff: MAX_BACKOFF,
            on_repeated_failure: None,
        }
    }

    pub fn with_failure_callback(mut self, callback: FailureCallback) -> Self {
        self.on_repeated_failure = Some(callback);
        self
    }

    pub fn with_max_update_retries(mut self, retries: u32) -> Self {
        self.max_update_retries = retries;
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    pub fn renew_interval(&self) -> Duration {
        self.renew_interval
    }

    /// Start the controller loop as a background task.
    pub fn start(self, shutdown: watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    /// Sync once per renew interval until `shutdown` turns true or its
    /// sender goes away. A cycle in progress always runs to completion.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if self.client.is_none() {
            info!("node lease controller has no lease client, will not claim or renew leases");
            return;
        }
        info!(
            "NodeLeaseController started (holder={}, renew={}ms)",
            self.builder.holder_identity(),
            self.renew_interval.as_millis()
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            self.sync().await;
            tokio::select! {
                _ = self.clock.sleep(self.renew_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(
            "NodeLeaseController stopped (holder={})",
            self.builder.holder_identity()
        );
    }

    /// One cycle: make sure the lease exists, then renew it unless this
    /// cycle just created it.
    pub async fn sync(&self) {
        let Some(client) = self.client.as_deref() else {
            return;
        };
        let (lease, created) = self.ensure_lease_with_backoff(client).await;
        // A freshly created lease already carries the current renew time.
        if created {
            return;
        }
        if let Err(e) = self.renew_lease_with_retry(client, lease).await {
            error!("{}, will retry after {:?}", e, self.renew_interval);
        }
    }

    /// Get or create the lease, retrying with backoff until it succeeds.
    /// Returns the lease and whether this call created it.
    async fn ensure_lease_with_backoff(&self, client: &dyn LeaseClient) -> (Lease, bool) {
        let mut backoff = Backoff::new(self.initial_backoff, self.max_backoff);
        loop {
            match self.ensure_lease(client).await {
                Ok(result) => return result,
                Err(e) => {
                    let delay = backoff.next_delay();
                    error!(
                        "failed to ensure node lease exists, will retry in {:?}, error: {}",
                        delay, e
                    );
                    self.clock.sleep(delay).await;
                }
            }
        }
    }

    async fn ensure_lease(&self, client: &dyn LeaseClient) -> Result<(Lease, bool), LeaseError> {
        match client
            .get(NAMESPACE_NODE_LEASE, self.builder.holder_identity())
            .await
        {
            Ok(lease) => Ok((lease, false)),
            Err(e) if e.is_not_found() => {
                let lease = client.create(&self.builder.build(None).await).await?;
                info!(
                    "created node lease {}/{}",
                    lease.namespace(),
                    lease.name()
                );
                Ok((lease, true))
            }
            Err(e) => Err(e),
        }
    }

    /// Update the lease from `base`, at most `max_update_retries` times.
    /// A conflict refetches the base and still uses up an attempt.
    async fn renew_lease_with_retry(
        &self,
        client: &dyn LeaseClient,
        mut base: Lease,
    ) -> Result<Lease, RenewError> {
        for attempt in 0..self.max_update_retries {
            let desired = self.builder.build(Some(&base)).await;
            match client.update(&desired).await {
                Ok(lease) => return Ok(lease),
                Err(e) => {
                    error!(
                        "failed to update node lease (attempt {}/{}), error: {}",
                        attempt + 1,
                        self.max_update_retries,
                        e
                    );
                    if e.is_conflict() {
                        base = self.ensure_lease_with_backoff(client).await.0;
                        continue;
                    }
                    if attempt > 0
                        && let Some(callback) = &self.on_repeated_failure
                    {
                        callback();
                    }
                }
            }
        }
        Err(RenewError::Exhausted {
            attempts: self.max_update_retries,
        })
    }
}
