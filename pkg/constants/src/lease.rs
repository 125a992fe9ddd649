//! Node lease controller constants.

use std::time::Duration;

/// Namespace that holds one lease per node.
pub const NAMESPACE_NODE_LEASE: &str = "kube-node-lease";

/// Default lease validity declared to readers, in seconds.
pub const DEFAULT_LEASE_DURATION_SECS: i32 = 40;

/// Default node status update frequency, in seconds.
pub const DEFAULT_NODE_STATUS_UPDATE_FREQUENCY_SECS: u64 = 10;

/// Interval at which the lease is renewed unless the status update
/// frequency asks for something shorter.
pub const DEFAULT_RENEW_INTERVAL: Duration = Duration::from_secs(10);

/// Immediate, successive update attempts per renewal cycle before waiting
/// for the next renew interval.
pub const MAX_UPDATE_RETRIES: u32 = 5;

/// First sleep of the ensure-lease backoff loop.
pub const INITIAL_BACKOFF: Duration = Duration::from_millis(200);

/// Upper bound on a single ensure-lease backoff sleep.
pub const MAX_BACKOFF: Duration = Duration::from_secs(7);

/// API version and kind written into a lease's owner reference.
pub const NODE_API_VERSION: &str = "v1";
pub const NODE_KIND: &str = "Node";
