//! Change detection for one monitoring cycle
//!
//! Classifies every address as newly joined, rejoined, still active or
//! removed, and runs the alert policy for the ones that stay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::alerts::{Alert, AlertKind, AlertPolicy, PolicyAlert};
use crate::chain::{ChainSource, format_address};
use crate::error::{CycleError, CycleResult};
use crate::models::ValidatorSnapshot;
use crate::registry::{ValidatorRecord, ValidatorRegistry};

/// What a completed cycle observed and fired
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleReport {
    pub era: u32,
    pub active_set_size: usize,
    pub alerts: Vec<Alert>,
    pub joined: Vec<String>,
    pub rejoined: Vec<String>,
    pub removed: Vec<String>,
    /// Active addresses whose snapshot could not be fetched this cycle
    pub skipped: Vec<String>,
    /// Whether any registry record changed
    pub changed: bool,
}

/// Fetch snapshots for every address concurrently.
///
/// Failures are logged and returned as skipped addresses; they never abort
/// the other fetches.
pub async fn fetch_snapshots(
    source: Arc<dyn ChainSource>,
    addresses: &BTreeSet<String>,
    era: u32,
    max_concurrent: usize,
) -> (BTreeMap<String, ValidatorSnapshot>, Vec<String>) {
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut handles = Vec::with_capacity(addresses.len());

    for address in addresses {
        let semaphore = Arc::clone(&semaphore);
        let source = Arc::clone(&source);
        let task_address = address.clone();

        let handle = tokio::spawn(async move {
            let _permit = semaphore
                .acquire()
                .await
                .map_err(|e| anyhow::anyhow!("fetch semaphore closed: {}", e))?;
            source.fetch_snapshot(&task_address, era).await
        });

        handles.push((address.clone(), handle));
    }

    let mut snapshots = BTreeMap::new();
    let mut skipped = Vec::new();

    for (address, handle) in handles {
        match handle.await {
            Ok(Ok(snapshot)) => {
                snapshots.insert(address, snapshot);
            }
            Ok(Err(e)) => {
                crate::log_warn!(
                    "Snapshot fetch failed for {}; skipping this cycle: {:#}",
                    format_address(&address),
                    e
                );
                skipped.push(address);
            }
            Err(e) => {
                crate::log_warn!(
                    "Snapshot task for {} did not complete: {}",
                    format_address(&address),
                    e
                );
                skipped.push(address);
            }
        }
    }

    (snapshots, skipped)
}

/// Run one detection cycle against the registry.
///
/// When the current era cannot be determined the cycle aborts before any
/// record is touched.
pub async fn run_cycle(
    registry: &mut ValidatorRegistry,
    source: Arc<dyn ChainSource>,
    policy: &AlertPolicy,
    max_concurrent: usize,
    now: DateTime<Utc>,
) -> CycleResult<CycleReport> {
    let (active, era) = tokio::join!(source.active_validators(), source.current_era());

    // Era 0 has no completed era to read reward points from.
    let era = match era? {
        Some(era) if era > 0 => era,
        _ => return Err(CycleError::EraUnavailable),
    };
    let active: BTreeSet<String> = active?.into_iter().collect();

    let (snapshots, skipped) =
        fetch_snapshots(Arc::clone(&source), &active, era, max_concurrent).await;

    let mut report = CycleReport {
        era,
        active_set_size: active.len(),
        skipped,
        ..CycleReport::default()
    };

    for (address, snapshot) in &snapshots {
        observe_active(registry, policy, &mut report, address, snapshot, now);
    }

    let departed: Vec<String> = registry
        .all()
        .filter(|record| record.active && !active.contains(&record.address))
        .map(|record| record.address.clone())
        .collect();

    for address in departed {
        let Some(mut record) = registry.get(&address).cloned() else {
            continue;
        };
        record.active = false;

        crate::log_stderr!("Validator {} left the active set", format_address(&address));
        report.alerts.push(
            Alert::new(AlertKind::Removed, address.as_str(), era, now)
                .with_status(record.commission, record.era_points),
        );
        report.changed |= registry.upsert(&address, |_| record);
        report.removed.push(address);
    }

    Ok(report)
}

fn observe_active(
    registry: &mut ValidatorRegistry,
    policy: &AlertPolicy,
    report: &mut CycleReport,
    address: &str,
    snapshot: &ValidatorSnapshot,
    now: DateTime<Utc>,
) {
    let era = report.era;
    let mut fired = Vec::new();
    let mut joined = false;
    let mut rejoined = false;

    let changed = registry.upsert(address, |existing| match existing {
        None => {
            joined = true;
            fired.push(
                Alert::new(AlertKind::Joined, address, era, now)
                    .with_status(snapshot.commission, snapshot.era_points),
            );
            ValidatorRecord::joined(snapshot)
        }
        Some(previous) => {
            let mut record = previous.clone();
            if !record.active {
                rejoined = true;
                fired.push(
                    Alert::new(AlertKind::Rejoined, address, era, now)
                        .with_status(snapshot.commission, snapshot.era_points),
                );
            }
            record.apply_snapshot(snapshot);

            if let Some(decision) = policy.evaluate(&mut record, snapshot, now) {
                let kind = match decision {
                    PolicyAlert::Slash => AlertKind::Slashed,
                    PolicyAlert::Inactivity { threshold } => AlertKind::Inactivity { threshold },
                };
                fired.push(
                    Alert::new(kind, address, era, now)
                        .with_status(snapshot.commission, snapshot.era_points)
                        .with_slashing(snapshot.slashing.clone()),
                );
            }
            record
        }
    });

    if joined {
        crate::log_stderr!("Validator {} joined the active set", format_address(address));
        report.joined.push(address.to_string());
    }
    if rejoined {
        crate::log_stderr!("Validator {} rejoined the active set", format_address(address));
        report.rejoined.push(address.to_string());
    }
    for alert in &fired {
        if alert.kind.is_lifecycle() {
            crate::log_debug!(
                "Lifecycle alert {} for {}",
                alert.kind.as_str(),
                format_address(address)
            );
        } else {
            crate::log_debug!(
                "Alert {} fired for {}; cooldown started",
                alert.kind.as_str(),
                format_address(address)
            );
        }
    }

    report.changed |= changed;
    report.alerts.extend(fired);
}
