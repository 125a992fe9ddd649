//! Scripted collaborators for node lease tests.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use pkg_state::lease::{LeaseClient, LeaseError};
use pkg_state::nodes::NodeLookup;
use pkg_types::lease::{Lease, ResourceVersion};
use std::collections::VecDeque;
use std::sync::Mutex;

pub fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

pub fn store_error(msg: &str) -> LeaseError {
    LeaseError::Store(anyhow::anyhow!(msg.to_string()))
}

pub fn conflict() -> LeaseError {
    LeaseError::Conflict {
        namespace: "kube-node-lease".to_string(),
        name: "node-1".to_string(),
    }
}

/// Answers from a script, then repeats the fallback.
pub struct FakeNodeLookup {
    script: Mutex<VecDeque<anyhow::Result<String>>>,
    fallback: Option<String>,
    calls: Mutex<usize>,
}

impl FakeNodeLookup {
    pub fn failing() -> Self {
        Self::scripted(Vec::new())
    }

    pub fn resolving(uid: &str) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(uid.to_string()),
            calls: Mutex::new(0),
        }
    }

    pub fn scripted(script: Vec<anyhow::Result<String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl NodeLookup for FakeNodeLookup {
    async fn node_uid(&self, name: &str) -> anyhow::Result<String> {
        *self.calls.lock().unwrap() += 1;
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        self.fallback
            .clone()
            .ok_or_else(|| anyhow::anyhow!("node {} not found", name))
    }
}

#[derive(Default)]
struct FakeState {
    stored: Option<Lease>,
    next_version: u64,
    get_errors: VecDeque<LeaseError>,
    create_errors: VecDeque<LeaseError>,
    update_errors: VecDeque<LeaseError>,
    gets: usize,
    creates: usize,
    updates: usize,
    updated: Vec<Lease>,
}

/// In-memory lease client with the same version check as the real store,
/// plus queues of injected failures per operation.
#[derive(Default)]
pub struct FakeLeaseClient {
    state: Mutex<FakeState>,
}

impl FakeLeaseClient {
    pub fn fail_gets(&self, errors: impl IntoIterator<Item = LeaseError>) {
        self.state.lock().unwrap().get_errors.extend(errors);
    }

    pub fn fail_creates(&self, errors: impl IntoIterator<Item = LeaseError>) {
        self.state.lock().unwrap().create_errors.extend(errors);
    }

    pub fn fail_updates(&self, errors: impl IntoIterator<Item = LeaseError>) {
        self.state.lock().unwrap().update_errors.extend(errors);
    }

    pub fn stored(&self) -> Option<Lease> {
        self.state.lock().unwrap().stored.clone()
    }

    /// Simulate another writer touching the record.
    pub fn bump_version(&self) {
        let mut state = self.state.lock().unwrap();
        let version = Self::mint(&mut state);
        if let Some(lease) = state.stored.as_mut() {
            lease.metadata.resource_version = Some(version);
        }
    }

    pub fn gets(&self) -> usize {
        self.state.lock().unwrap().gets
    }

    pub fn creates(&self) -> usize {
        self.state.lock().unwrap().creates
    }

    pub fn updates(&self) -> usize {
        self.state.lock().unwrap().updates
    }

    /// Leases accepted by `update`, in order.
    pub fn updated(&self) -> Vec<Lease> {
        self.state.lock().unwrap().updated.clone()
    }

    fn mint(state: &mut FakeState) -> ResourceVersion {
        state.next_version += 1;
        ResourceVersion::from_raw(state.next_version.to_string())
    }
}

#[async_trait]
impl LeaseClient for FakeLeaseClient {
    async fn get(&self, namespace: &str, name: &str) -> Result<Lease, LeaseError> {
        let mut state = self.state.lock().unwrap();
        state.gets += 1;
        if let Some(err) = state.get_errors.pop_front() {
            return Err(err);
        }
        state.stored.clone().ok_or_else(|| LeaseError::NotFound {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }

    async fn create(&self, lease: &Lease) -> Result<Lease, LeaseError> {
        let mut state = self.state.lock().unwrap();
        state.creates += 1;
        if let Some(err) = state.create_errors.pop_front() {
            return Err(err);
        }
        if state.stored.is_some() {
            return Err(LeaseError::AlreadyExists {
                namespace: lease.namespace().to_string(),
                name: lease.name().to_string(),
            });
        }
        let mut stored = lease.clone();
        stored.metadata.resource_version = Some(Self::mint(&mut state));
        state.stored = Some(stored.clone());
        Ok(stored)
    }

    async fn update(&self, lease: &Lease) -> Result<Lease, LeaseError> {
        let mut state = self.state.lock().unwrap();
        state.updates += 1;
        if let Some(err) = state.update_errors.pop_front() {
            return Err(err);
        }
        let current_version = match state.stored.as_ref() {
            Some(current) => current.metadata.resource_version.clone(),
            None => {
                return Err(LeaseError::NotFound {
                    namespace: lease.namespace().to_string(),
                    name: lease.name().to_string(),
                });
            }
        };
        if current_version != lease.metadata.resource_version {
            return Err(LeaseError::Conflict {
                namespace: lease.namespace().to_string(),
                name: lease.name().to_string(),
            });
        }
        let mut stored = lease.clone();
        stored.metadata.resource_version = Some(Self::mint(&mut state));
        state.stored = Some(stored.clone());
        state.updated.push(stored.clone());
        Ok(stored)
    }
}
