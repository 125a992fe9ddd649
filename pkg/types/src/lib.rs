pub mod config;
pub mod lease;
pub mod node;
pub mod pod;
pub mod validate;
