//! Chain-data boundary
//!
//! The monitor only reads from the chain through [`ChainSource`]; the HTTP
//! adapter lives in [`sidecar`].

pub mod address;
pub mod sidecar;

use anyhow::Result;
use std::future::Future;
use std::pin::Pin;

use crate::models::ValidatorSnapshot;

pub use address::{format_address, validate_address};
pub use sidecar::SidecarClient;

/// Boxed future returned by [`ChainSource`] methods
pub type ChainFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Read-only view of the chain used by the monitor.
///
/// Implementations own their own retry and timeout behaviour.
pub trait ChainSource: Send + Sync {
    /// Addresses in the current session's active set
    fn active_validators(&self) -> ChainFuture<'_, Vec<String>>;

    /// Current era, `None` when the chain does not report one
    fn current_era(&self) -> ChainFuture<'_, Option<u32>>;

    /// Snapshot of one validator; reward points are read for `era - 1`
    fn fetch_snapshot<'a>(&'a self, address: &'a str, era: u32)
    -> ChainFuture<'a, ValidatorSnapshot>;
}
