//! Validator registry
//!
//! In-memory table of tracked validators, persisted as a JSON document.

pub mod record;
pub mod store;

pub use record::{RegistryDocument, SlashState, StoredRecord, ValidatorRecord};
pub use store::ValidatorRegistry;
