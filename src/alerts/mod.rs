//! Alerts system module
//!
//! Alert types and the per-validator alert policy (cooldown, slash edge,
//! inactivity ladder).

pub mod policy;
pub mod types;

pub use policy::*;
pub use types::*;
