//! Centralized constants for the nodelease project.
//!
//! All project-wide constant values live here.
//! Change a value in one place and it applies everywhere.

pub mod lease;
pub mod paths;
pub mod state;
