//! Validator monitoring
//!
//! Change detection per cycle and the periodic loop that drives it.

pub mod detector;
pub mod events;
pub mod watcher;

pub use detector::*;
pub use events::*;
pub use watcher::*;
