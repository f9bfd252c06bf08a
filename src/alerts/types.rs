//! Alert types for validator monitoring
//!
//! Defines alert categories and severity levels

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{EraPoints, SlashingInfo};

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "LOW",
            AlertSeverity::Medium => "MEDIUM",
            AlertSeverity::High => "HIGH",
            AlertSeverity::Critical => "CRITICAL",
        }
    }
}

/// Kinds of alerts the monitor can fire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertKind {
    /// First time the validator is seen in the active set
    Joined,
    /// Known validator re-entered the active set after leaving it
    Rejoined,
    /// Validator picked up a slashing span
    Slashed,
    /// Era performance fell below a ladder threshold
    Inactivity { threshold: u32 },
    /// Validator left the active set
    Removed,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Joined => "VALIDATOR_JOINED",
            AlertKind::Rejoined => "VALIDATOR_REJOINED",
            AlertKind::Slashed => "VALIDATOR_SLASHED",
            AlertKind::Inactivity { .. } => "INACTIVITY_THRESHOLD",
            AlertKind::Removed => "VALIDATOR_REMOVED",
        }
    }

    pub fn severity(&self) -> AlertSeverity {
        match self {
            AlertKind::Joined => AlertSeverity::Low,
            AlertKind::Rejoined => AlertSeverity::Low,
            AlertKind::Slashed => AlertSeverity::Critical,
            AlertKind::Inactivity { threshold } if *threshold <= 10 => AlertSeverity::High,
            AlertKind::Inactivity { .. } => AlertSeverity::Medium,
            AlertKind::Removed => AlertSeverity::Medium,
        }
    }

    /// Lifecycle alerts bypass the cooldown and never start one.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            AlertKind::Joined | AlertKind::Rejoined | AlertKind::Removed
        )
    }
}

/// A fired alert with the data needed to render it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub address: String,
    pub era: u32,
    pub commission: f64,
    pub era_points: EraPoints,
    pub slashing: Option<SlashingInfo>,
    pub severity: AlertSeverity,
    pub fired_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(kind: AlertKind, address: impl Into<String>, era: u32, fired_at: DateTime<Utc>) -> Self {
        let severity = kind.severity();
        Self {
            kind,
            address: address.into(),
            era,
            commission: 0.0,
            era_points: EraPoints::default(),
            slashing: None,
            severity,
            fired_at,
        }
    }

    pub fn with_status(mut self, commission: f64, era_points: EraPoints) -> Self {
        self.commission = commission;
        self.era_points = era_points;
        self
    }

    pub fn with_slashing(mut self, slashing: Option<SlashingInfo>) -> Self {
        self.slashing = slashing;
        self
    }
}
