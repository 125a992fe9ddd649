use async_trait::async_trait;
use pkg_constants::state::LEASES_PREFIX;
use pkg_types::lease::{Lease, ResourceVersion};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::client::StateStore;

/// Errors returned by a [`LeaseClient`].
///
/// `NotFound`, `AlreadyExists` and `Conflict` are expected outcomes that
/// callers branch on; everything else is a `Store` failure.
#[derive(Debug, Error)]
pub enum LeaseError {
    #[error("lease {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },

    #[error("lease {namespace}/{name} already exists")]
    AlreadyExists { namespace: String, name: String },

    #[error("operation cannot be fulfilled on lease {namespace}/{name}: the object has been modified")]
    Conflict { namespace: String, name: String },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl LeaseError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LeaseError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, LeaseError::Conflict { .. })
    }
}

/// Namespaced get/create/update access to lease records with optimistic
/// concurrency on update.
#[async_trait]
pub trait LeaseClient: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> Result<Lease, LeaseError>;

    /// Create `lease`; fails with `AlreadyExists` if the key is taken.
    async fn create(&self, lease: &Lease) -> Result<Lease, LeaseError>;

    /// Replace the stored lease. Fails with `Conflict` unless `lease` carries
    /// the resource version currently stored.
    async fn update(&self, lease: &Lease) -> Result<Lease, LeaseError>;
}

pub fn lease_key(namespace: &str, name: &str) -> String {
    format!("{}{}/{}", LEASES_PREFIX, namespace, name)
}

/// [`LeaseClient`] backed by the SlateDB [`StateStore`].
///
/// Every write stamps a fresh resource version. The read-compare-write
/// section is serialized per client so the version check is atomic.
#[derive(Clone)]
pub struct StoreLeaseClient {
    store: StateStore,
    write_lock: Arc<Mutex<()>>,
}

impl StoreLeaseClient {
    pub fn new(store: StateStore) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn next_version() -> ResourceVersion {
        ResourceVersion::from_raw(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl LeaseClient for StoreLeaseClient {
    async fn get(&self, namespace: &str, name: &str) -> Result<Lease, LeaseError> {
        self.store
            .get_json(&lease_key(namespace, name))
            .await?
            .ok_or_else(|| LeaseError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    async fn create(&self, lease: &Lease) -> Result<Lease, LeaseError> {
        let key = lease_key(lease.namespace(), lease.name());
        let _guard = self.write_lock.lock().await;

        if self.store.get(&key).await?.is_some() {
            return Err(LeaseError::AlreadyExists {
                namespace: lease.namespace().to_string(),
                name: lease.name().to_string(),
            });
        }

        let mut stored = lease.clone();
        stored.metadata.resource_version = Some(Self::next_version());
        self.store.put_json(&key, &stored).await?;
        debug!("created lease {}", key);
        Ok(stored)
    }

    async fn update(&self, lease: &Lease) -> Result<Lease, LeaseError> {
        let key = lease_key(lease.namespace(), lease.name());
        let _guard = self.write_lock.lock().await;

        let current: Lease =
            self.store
                .get_json(&key)
                .await?
                .ok_or_else(|| LeaseError::NotFound {
                    namespace: lease.namespace().to_string(),
                    name: lease.name().to_string(),
                })?;

        if lease.metadata.resource_version.is_none()
            || current.metadata.resource_version != lease.metadata.resource_version
        {
            return Err(LeaseError::Conflict {
                namespace: lease.namespace().to_string(),
                name: lease.name().to_string(),
            });
        }

        let mut stored = lease.clone();
        stored.metadata.resource_version = Some(Self::next_version());
        self.store.put_json(&key, &stored).await?;
        debug!("updated lease {}", key);
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkg_types::lease::{LeaseSpec, ObjectMeta};

    fn make_lease(name: &str) -> Lease {
        Lease {
            metadata: ObjectMeta {
                name: name.to_string(),
                namespace: "kube-node-lease".to_string(),
                ..Default::default()
            },
            spec: LeaseSpec {
                holder_identity: Some(name.to_string()),
                lease_duration_seconds: Some(40),
                renew_time: None,
            },
        }
    }

    async fn open_client() -> (tempfile::TempDir, StoreLeaseClient) {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(dir.path().to_str().unwrap()).await.unwrap();
        (dir, StoreLeaseClient::new(store))
    }

    #[test]
    fn test_lease_key_layout() {
        assert_eq!(
            lease_key("kube-node-lease", "node-1"),
            "/registry/leases/kube-node-lease/node-1"
        );
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (_dir, client) = open_client().await;
        let err = client.get("kube-node-lease", "node-1").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_create_then_create_again() {
        let (_dir, client) = open_client().await;
        let created = client.create(&make_lease("node-1")).await.unwrap();
        assert!(created.metadata.resource_version.is_some());

        let fetched = client.get("kube-node-lease", "node-1").await.unwrap();
        assert_eq!(fetched, created);

        let err = client.create(&make_lease("node-1")).await.unwrap_err();
        assert!(matches!(err, LeaseError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_update_with_stale_version_conflicts() {
        let (_dir, client) = open_client().await;
        let created = client.create(&make_lease("node-1")).await.unwrap();

        let mut first = created.clone();
        first.spec.lease_duration_seconds = Some(20);
        let updated = client.update(&first).await.unwrap();
        assert_ne!(
            updated.metadata.resource_version,
            created.metadata.resource_version
        );

        // `created` still carries the version that `first` replaced.
        let err = client.update(&created).await.unwrap_err();
        assert!(err.is_conflict());

        let fetched = client.get("kube-node-lease", "node-1").await.unwrap();
        assert_eq!(fetched.spec.lease_duration_seconds, Some(20));
    }

    #[tokio::test]
    async fn test_update_without_version_conflicts() {
        let (_dir, client) = open_client().await;
        client.create(&make_lease("node-1")).await.unwrap();

        let err = client.update(&make_lease("node-1")).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let (_dir, client) = open_client().await;
        let err = client.update(&make_lease("ghost")).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
