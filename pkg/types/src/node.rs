use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::pod::ResourceRequirements;

// --- Node status ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeStatus {
    Ready,
    NotReady,
    Unknown,
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeStatus::Ready => write!(f, "Ready"),
            NodeStatus::NotReady => write!(f, "NotReady"),
            NodeStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

// --- Persisted Node object ---

/// Stored at `/registry/nodes/<name>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Stable UID assigned at registration; owner references point here.
    pub id: String,
    pub name: String,
    pub status: NodeStatus,
    pub registered_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub capacity: ResourceRequirements,
    /// If true, the scheduler will not place new pods on this node.
    #[serde(default)]
    pub unschedulable: bool,
}
