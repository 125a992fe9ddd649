use pkg_types::node::Node;
use pkg_types::pod::{NETWORK_BANDWIDTH_ANNOTATION, Pod, ResourceRequirements};
use std::collections::HashMap;
use tracing::debug;

/// Aggregated view of one node: the node object (if known), the pods bound
/// to it, and the sum of what those pods request.
#[derive(Debug, Clone, Default)]
pub struct NodeInfo {
    node: Option<Node>,
    pods: Vec<Pod>,
    requested: ResourceRequirements,
    network_requested: i64,
}

impl NodeInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pod(&mut self, pod: &Pod) {
        let request = pod.resource_request();
        self.requested.cpu_millis += request.cpu_millis;
        self.requested.memory_bytes += request.memory_bytes;
        self.network_requested = self.network_requested.saturating_add(network_request(pod));
        self.pods.push(pod.clone());
    }

    pub fn set_node(&mut self, node: &Node) {
        self.node = Some(node.clone());
    }

    pub fn node(&self) -> Option<&Node> {
        self.node.as_ref()
    }

    pub fn pods(&self) -> &[Pod] {
        &self.pods
    }

    pub fn requested(&self) -> &ResourceRequirements {
        &self.requested
    }

    /// Total requested network bandwidth in bits per second.
    pub fn network_requested(&self) -> i64 {
        self.network_requested
    }
}

/// Pivot pod and node lists into a map keyed by node name.
///
/// Pods that are not bound yet are grouped under the empty name.
pub fn create_node_name_to_info_map(pods: &[Pod], nodes: &[Node]) -> HashMap<String, NodeInfo> {
    let mut infos: HashMap<String, NodeInfo> = HashMap::new();
    for pod in pods {
        let node_name = pod.node_name.clone().unwrap_or_default();
        infos.entry(node_name).or_default().add_pod(pod);
    }
    for node in nodes {
        infos.entry(node.name.clone()).or_default().set_node(node);
    }
    infos
}

fn unit_multiplier(suffix: u8) -> Option<i64> {
    match suffix {
        b'K' => Some(1_000),
        b'M' => Some(1_000_000),
        b'G' => Some(1_000_000_000),
        b'T' => Some(1_000_000_000_000),
        _ => None,
    }
}

/// Network bandwidth requested by `pod` through its
/// `netsys.io/network-bandwidth` annotation, or 0 if absent or malformed.
///
/// The last character is always treated as the unit: `K`, `M`, `G` and `T`
/// scale by powers of 1000, anything else scales by 1 but is still dropped.
/// The remaining digits must fit in an `i32`.
pub fn network_request(pod: &Pod) -> i64 {
    let Some(raw) = pod.annotations.get(NETWORK_BANDWIDTH_ANNOTATION) else {
        return 0;
    };
    let Some((&suffix, digits)) = raw.as_bytes().split_last() else {
        return 0;
    };
    let multiplier = unit_multiplier(suffix).unwrap_or(1);

    match std::str::from_utf8(digits)
        .ok()
        .and_then(|d| d.parse::<i32>().ok())
    {
        Some(value) => i64::from(value).saturating_mul(multiplier),
        None => {
            debug!(
                "pod {}/{} has unparsable network bandwidth {:?}",
                pod.namespace, pod.name, raw
            );
            0
        }
    }
}
