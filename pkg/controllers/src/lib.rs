pub mod clock;
pub mod node_lease;
