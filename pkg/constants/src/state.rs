//! State store key layout.

/// Prefix for lease records. Full key = `LEASES_PREFIX + <namespace>/<name>`.
pub const LEASES_PREFIX: &str = "/registry/leases/";

/// Prefix for node records. Full key = `NODES_PREFIX + <name>`.
pub const NODES_PREFIX: &str = "/registry/nodes/";
