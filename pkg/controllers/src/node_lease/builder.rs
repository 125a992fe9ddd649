use pkg_constants::lease::{NAMESPACE_NODE_LEASE, NODE_API_VERSION, NODE_KIND};
use pkg_state::nodes::NodeLookup;
use pkg_types::lease::{Lease, LeaseSpec, MicroTime, ObjectMeta, OwnerReference};
use std::sync::Arc;
use tracing::warn;

use crate::clock::Clock;

/// Produces the desired state of this node's lease.
pub struct LeaseBuilder {
    holder_identity: String,
    lease_duration_seconds: i32,
    clock: Arc<dyn Clock>,
    nodes: Arc<dyn NodeLookup>,
}

impl LeaseBuilder {
    pub fn new(
        holder_identity: String,
        lease_duration_seconds: i32,
        clock: Arc<dyn Clock>,
        nodes: Arc<dyn NodeLookup>,
    ) -> Self {
        Self {
            holder_identity,
            lease_duration_seconds,
            clock,
            nodes,
        }
    }

    pub fn holder_identity(&self) -> &str {
        &self.holder_identity
    }

    /// Build a fresh lease when `base` is `None`, otherwise a copy of `base`.
    /// Either way the renew time is set to now, and the owner reference is
    /// filled in if it is still missing and the node can be resolved.
    pub async fn build(&self, base: Option<&Lease>) -> Lease {
        let mut lease = match base {
            Some(base) => base.clone(),
            None => Lease {
                metadata: ObjectMeta {
                    name: self.holder_identity.clone(),
                    namespace: NAMESPACE_NODE_LEASE.to_string(),
                    ..Default::default()
                },
                spec: LeaseSpec {
                    holder_identity: Some(self.holder_identity.clone()),
                    lease_duration_seconds: Some(self.lease_duration_seconds),
                    renew_time: None,
                },
            },
        };
        lease.spec.renew_time = Some(MicroTime::new(self.clock.now()));

        // The node object may not be registered yet when the lease is first
        // created, so keep trying on every build until it resolves.
        if !lease.has_owner() {
            match self.nodes.node_uid(&self.holder_identity).await {
                Ok(uid) => {
                    lease.metadata.owner_references = vec![OwnerReference {
                        api_version: NODE_API_VERSION.to_string(),
                        kind: NODE_KIND.to_string(),
                        name: self.holder_identity.clone(),
                        uid,
                    }];
                }
                Err(e) => {
                    warn!(
                        "failed to get node {:?} when trying to set owner ref to the node lease: {}",
                        self.holder_identity, e
                    );
                }
            }
        }

        lease
    }
}
