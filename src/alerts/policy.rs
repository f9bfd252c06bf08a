//! Alert policy for still-active validators
//!
//! Decides which cooldown-gated alert (slash or one inactivity threshold)
//! fires for a validator this cycle. At most one fires per validator per
//! cycle because every gated alert shares the same cooldown slot.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SentinelSettings;
use crate::models::ValidatorSnapshot;
use crate::registry::{SlashState, ValidatorRecord};

/// Whether recovering performance re-arms inactivity thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InactivityResetPolicy {
    /// Thresholds stay latched once alerted
    #[default]
    Never,
    /// A threshold is re-armed once performance is back at or above it
    OnRecovery,
}

impl InactivityResetPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "never" | "none" => Some(Self::Never),
            "on-recovery" | "on_recovery" | "recovery" => Some(Self::OnRecovery),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::OnRecovery => "on-recovery",
        }
    }
}

/// Cooldown-gated alert chosen by [`AlertPolicy::evaluate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyAlert {
    Slash,
    Inactivity { threshold: u32 },
}

#[derive(Debug, Clone)]
pub struct AlertPolicy {
    thresholds: Vec<u32>,
    cooldown: TimeDelta,
    reset: InactivityResetPolicy,
}

impl AlertPolicy {
    pub fn new(thresholds: &[u32], cooldown: TimeDelta, reset: InactivityResetPolicy) -> Self {
        let mut thresholds = thresholds.to_vec();
        thresholds.sort_unstable();
        thresholds.dedup();
        Self {
            thresholds,
            cooldown,
            reset,
        }
    }

    pub fn from_settings(settings: &SentinelSettings) -> Self {
        Self::new(
            &settings.inactivity_thresholds,
            settings.cooldown(),
            settings.inactivity_reset,
        )
    }

    pub fn thresholds(&self) -> &[u32] {
        &self.thresholds
    }

    pub fn cooldown(&self) -> TimeDelta {
        self.cooldown
    }

    /// True when no gated alert was sent within the cooldown window
    pub fn cooldown_clear(&self, record: &ValidatorRecord, now: DateTime<Utc>) -> bool {
        match record.last_notification_at {
            None => true,
            Some(last) => now.signed_duration_since(last) > self.cooldown,
        }
    }

    /// Apply policy to `record` given this cycle's snapshot.
    ///
    /// Mutates the record's notification memory for whatever fires and returns
    /// the fired alert, if any. The cooldown is read once, before any decision.
    pub fn evaluate(
        &self,
        record: &mut ValidatorRecord,
        snapshot: &ValidatorSnapshot,
        now: DateTime<Utc>,
    ) -> Option<PolicyAlert> {
        let cooldown_clear = self.cooldown_clear(record, now);
        let performance = snapshot.performance();

        if self.reset == InactivityResetPolicy::OnRecovery
            && let Some(p) = performance
        {
            record
                .inactivity_notified
                .retain(|threshold| p < f64::from(*threshold));
        }

        if snapshot.is_slashed() && !record.is_slashed() {
            if cooldown_clear {
                record.slash = SlashState::from_snapshot(snapshot);
                record.mark_notified(now);
                return Some(PolicyAlert::Slash);
            }
            // Edge stays armed until the cooldown lets the alert through.
            crate::log_debug!(
                "Slash alert for {} deferred by cooldown",
                crate::chain::format_address(&record.address)
            );
            return None;
        }

        if !cooldown_clear {
            return None;
        }

        let p = performance?;
        let threshold = self
            .thresholds
            .iter()
            .copied()
            .find(|t| p < f64::from(*t) && !record.inactivity_notified.contains(t))?;

        record.inactivity_notified.insert(threshold);
        record.mark_notified(now);
        Some(PolicyAlert::Inactivity { threshold })
    }
}
