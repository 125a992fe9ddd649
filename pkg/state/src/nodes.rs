use async_trait::async_trait;
use chrono::Utc;
use pkg_constants::state::NODES_PREFIX;
use pkg_types::node::{Node, NodeStatus};
use pkg_types::pod::ResourceRequirements;
use std::collections::HashMap;
use tracing::info;

use crate::client::StateStore;

/// Resolves a node's stable UID by name.
#[async_trait]
pub trait NodeLookup: Send + Sync {
    async fn node_uid(&self, name: &str) -> anyhow::Result<String>;
}

pub fn node_key(name: &str) -> String {
    format!("{}{}", NODES_PREFIX, name)
}

/// Node records in the [`StateStore`].
#[derive(Clone)]
pub struct NodeRegistry {
    store: StateStore,
}

impl NodeRegistry {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }

    pub async fn get(&self, name: &str) -> anyhow::Result<Option<Node>> {
        self.store.get_json(&node_key(name)).await
    }

    /// Register `name`, assigning a fresh UID on first registration.
    /// Re-registering keeps the existing UID and merges labels.
    pub async fn register(
        &self,
        name: &str,
        labels: HashMap<String, String>,
    ) -> anyhow::Result<Node> {
        let now = Utc::now();
        let node = match self.get(name).await? {
            Some(mut existing) => {
                info!("Updating existing node: {} ({})", name, existing.id);
                existing.status = NodeStatus::Ready;
                existing.last_heartbeat = now;
                existing.labels.extend(labels);
                existing
            }
            None => {
                let node = Node {
                    id: uuid::Uuid::new_v4().to_string(),
                    name: name.to_string(),
                    status: NodeStatus::Ready,
                    registered_at: now,
                    last_heartbeat: now,
                    labels,
                    capacity: ResourceRequirements::default(),
                    unschedulable: false,
                };
                info!("Registered node: {} ({})", name, node.id);
                node
            }
        };
        self.store.put_json(&node_key(name), &node).await?;
        Ok(node)
    }
}

#[async_trait]
impl NodeLookup for NodeRegistry {
    async fn node_uid(&self, name: &str) -> anyhow::Result<String> {
        self.get(name)
            .await?
            .map(|node| node.id)
            .ok_or_else(|| anyhow::anyhow!("node {} not found", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_registry() -> (tempfile::TempDir, NodeRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(dir.path().to_str().unwrap()).await.unwrap();
        (dir, NodeRegistry::new(store))
    }

    #[tokio::test]
    async fn test_unregistered_node_has_no_uid() {
        let (_dir, registry) = open_registry().await;
        assert!(registry.node_uid("node-1").await.is_err());
    }

    #[tokio::test]
    async fn test_reregister_keeps_uid() {
        let (_dir, registry) = open_registry().await;
        let first = registry.register("node-1", HashMap::new()).await.unwrap();

        let mut labels = HashMap::new();
        labels.insert("zone".to_string(), "a".to_string());
        let second = registry.register("node-1", labels).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.labels.get("zone").map(String::as_str), Some("a"));
        assert_eq!(registry.node_uid("node-1").await.unwrap(), first.id);
    }
}
