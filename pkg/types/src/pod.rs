use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Annotation carrying a pod's requested network bandwidth, e.g. `"500M"`.
pub const NETWORK_BANDWIDTH_ANNOTATION: &str = "netsys.io/network-bandwidth";

// --- Resource requirements ---

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ResourceRequirements {
    /// CPU in millicores (1000 = 1 core)
    #[serde(default)]
    pub cpu_millis: u64,
    /// Memory in bytes
    #[serde(default)]
    pub memory_bytes: u64,
}

// --- Container spec ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub resources: ResourceRequirements,
}

// --- Pod status ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PodStatus {
    Pending,
    Scheduled,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl std::fmt::Display for PodStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PodStatus::Pending => write!(f, "Pending"),
            PodStatus::Scheduled => write!(f, "Scheduled"),
            PodStatus::Running => write!(f, "Running"),
            PodStatus::Succeeded => write!(f, "Succeeded"),
            PodStatus::Failed => write!(f, "Failed"),
            PodStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

// --- Pod spec ---

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PodSpec {
    pub containers: Vec<ContainerSpec>,
}

// --- Pod ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pod {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub spec: PodSpec,
    pub status: PodStatus,
    /// The node this pod is assigned to (set by scheduler)
    #[serde(default)]
    pub node_name: Option<String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl Pod {
    /// Sum of container resource requests.
    pub fn resource_request(&self) -> ResourceRequirements {
        self.spec
            .containers
            .iter()
            .fold(ResourceRequirements::default(), |acc, c| ResourceRequirements {
                cpu_millis: acc.cpu_millis + c.resources.cpu_millis,
                memory_bytes: acc.memory_bytes + c.resources.memory_bytes,
            })
    }
}
