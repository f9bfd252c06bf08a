//! Monitoring events
//!
//! Emitted by the monitor loop for hosts that want progress updates.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum MonitorEvent {
    /// Monitoring loop started
    MonitoringStarted { interval_seconds: u64 },

    /// Monitoring loop stopped
    MonitoringStopped { cycles_run: u32 },

    /// Cycle started
    CycleStarted { cycle_number: u32 },

    /// Cycle completed and alerts were dispatched
    CycleCompleted {
        cycle_number: u32,
        era: u32,
        alerts_fired: usize,
        alerts_delivered: usize,
        skipped: usize,
        duration_ms: u64,
    },

    /// Cycle aborted without touching the registry
    CycleAborted { cycle_number: u32, reason: String },
}
