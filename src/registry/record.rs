//! Per-validator record kept across cycles

use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{EraPoints, ValidatorSnapshot};

/// Slashing memory. Once slashed, a record stays slashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlashState {
    #[default]
    NeverSlashed,
    /// Era of the last non-zero slash reported when the slash was recorded
    SlashedAt { era: u32 },
}

impl SlashState {
    pub fn is_slashed(&self) -> bool {
        matches!(self, SlashState::SlashedAt { .. })
    }

    pub fn from_snapshot(snapshot: &ValidatorSnapshot) -> Self {
        match &snapshot.slashing {
            Some(info) => SlashState::SlashedAt {
                era: info.last_nonzero_slash,
            },
            None => SlashState::NeverSlashed,
        }
    }
}

/// Everything the monitor remembers about one validator
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorRecord {
    pub address: String,
    pub active: bool,
    pub slash: SlashState,
    pub commission: f64,
    pub era_points: EraPoints,
    /// Thresholds already alerted during the current low-performance episode
    pub inactivity_notified: BTreeSet<u32>,
    /// Last cooldown-gated alert; millisecond precision
    pub last_notification_at: Option<DateTime<Utc>>,
}

impl ValidatorRecord {
    /// Record for a validator seen in the active set for the first time
    pub fn joined(snapshot: &ValidatorSnapshot) -> Self {
        Self {
            address: snapshot.address.clone(),
            active: true,
            slash: SlashState::from_snapshot(snapshot),
            commission: snapshot.commission,
            era_points: snapshot.era_points,
            inactivity_notified: BTreeSet::new(),
            last_notification_at: None,
        }
    }

    /// Take the latest observable fields from a snapshot.
    ///
    /// Slash state and notification memory are left to the alert policy.
    pub fn apply_snapshot(&mut self, snapshot: &ValidatorSnapshot) {
        self.active = true;
        self.commission = snapshot.commission;
        self.era_points = snapshot.era_points;
    }

    pub fn is_slashed(&self) -> bool {
        self.slash.is_slashed()
    }

    pub fn mark_notified(&mut self, now: DateTime<Utc>) {
        self.last_notification_at = Some(now.trunc_subsecs(3));
    }
}

/// On-disk form of a [`ValidatorRecord`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub active: bool,
    pub slashed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slashed_era: Option<u32>,
    pub commission: f64,
    pub era_points: EraPoints,
    #[serde(default)]
    pub inactivity_notified: Vec<u32>,
    /// Epoch milliseconds
    #[serde(default)]
    pub last_notification_at: Option<i64>,
}

/// Registry document: address -> stored record
pub type RegistryDocument = BTreeMap<String, StoredRecord>;

impl From<&ValidatorRecord> for StoredRecord {
    fn from(record: &ValidatorRecord) -> Self {
        let slashed_era = match record.slash {
            SlashState::SlashedAt { era } => Some(era),
            SlashState::NeverSlashed => None,
        };
        Self {
            active: record.active,
            slashed: record.is_slashed(),
            slashed_era,
            commission: record.commission,
            era_points: record.era_points,
            inactivity_notified: record.inactivity_notified.iter().copied().collect(),
            last_notification_at: record.last_notification_at.map(|t| t.timestamp_millis()),
        }
    }
}

impl StoredRecord {
    pub fn into_record(self, address: &str) -> ValidatorRecord {
        let slash = if self.slashed {
            SlashState::SlashedAt {
                era: self.slashed_era.unwrap_or_default(),
            }
        } else {
            SlashState::NeverSlashed
        };
        let last_notification_at = self
            .last_notification_at
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single());

        ValidatorRecord {
            address: address.to_string(),
            active: self.active,
            slash,
            commission: self.commission,
            era_points: self.era_points,
            inactivity_notified: self.inactivity_notified.into_iter().collect(),
            last_notification_at,
        }
    }
}
