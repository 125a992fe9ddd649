//! Scheduler support code. Placement itself lives elsewhere; this crate
//! only builds the per-node view that placement reads.

pub mod cache;
