//! Core data models for validator observations
//!
//! A [`ValidatorSnapshot`] is the per-cycle view of one validator as reported by
//! the chain. Snapshots are never persisted; the registry keeps only what it needs.

use serde::{Deserialize, Serialize};

/// Reward points for the last completed era
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EraPoints {
    /// Points awarded to the whole active set
    pub total: u64,
    /// Points awarded to this validator
    pub validator_share: u64,
    /// `validator_share / total * 100`, absent when `total` is zero
    pub performance_percent: Option<f64>,
}

impl EraPoints {
    pub fn new(total: u64, validator_share: u64) -> Self {
        let performance_percent =
            (total > 0).then(|| (validator_share as f64 / total as f64) * 100.0);
        Self {
            total,
            validator_share,
            performance_percent,
        }
    }

    /// Performance rendered the way operators read it (`12.34` or `N/A`)
    pub fn performance_label(&self) -> String {
        match self.performance_percent {
            Some(p) => format!("{:.2}", p),
            None => "N/A".to_string(),
        }
    }
}

/// Slashing-span record of a validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashingInfo {
    pub span_index: u32,
    pub last_start: u32,
    pub last_nonzero_slash: u32,
    pub prior: Vec<u32>,
}

impl SlashingInfo {
    pub fn prior_label(&self) -> String {
        if self.prior.is_empty() {
            return "none".to_string();
        }
        self.prior
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// On-chain identity, reduced to what gets displayed
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IdentityInfo {
    pub display: Option<String>,
    pub parent: Option<String>,
}

impl IdentityInfo {
    pub fn label(&self) -> &str {
        self.display
            .as_deref()
            .or(self.parent.as_deref())
            .unwrap_or("Unknown Identity")
    }
}

/// Point-in-time status of one validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorSnapshot {
    pub address: String,
    pub identity: Option<IdentityInfo>,
    pub slashing: Option<SlashingInfo>,
    /// Commission in percent, `0.0..=100.0`
    pub commission: f64,
    pub era_points: EraPoints,
}

impl ValidatorSnapshot {
    pub fn is_slashed(&self) -> bool {
        self.slashing.is_some()
    }

    pub fn performance(&self) -> Option<f64> {
        self.era_points.performance_percent
    }
}
