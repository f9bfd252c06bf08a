#![allow(dead_code)]

use anyhow::anyhow;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use validator_sentinel::{
    AlertMessage, AlertPolicy, AlertTransport, ChainFuture, ChainSource, EraPoints,
    InactivityResetPolicy, SlashingInfo, TransportFuture, ValidatorSnapshot,
};

pub const ALICE: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
pub const BOB: &str = "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty";

#[derive(Default)]
struct ChainState {
    active: Vec<String>,
    era: Option<u32>,
    snapshots: HashMap<String, ValidatorSnapshot>,
    failing: HashSet<String>,
}

/// In-memory chain whose active set, era and snapshots tests set directly
#[derive(Default)]
pub struct MockChain {
    state: Mutex<ChainState>,
}

impl MockChain {
    pub fn new(era: u32) -> Arc<Self> {
        let chain = Arc::new(Self::default());
        chain.set_era(Some(era));
        chain
    }

    pub fn set_era(&self, era: Option<u32>) {
        self.state.lock().expect("chain lock should not be poisoned").era = era;
    }

    /// Replace the active set with exactly these snapshots
    pub fn set_active(&self, snapshots: Vec<ValidatorSnapshot>) {
        let mut state = self.state.lock().expect("chain lock should not be poisoned");
        state.active = snapshots.iter().map(|s| s.address.clone()).collect();
        for snapshot in snapshots {
            state.snapshots.insert(snapshot.address.clone(), snapshot);
        }
    }

    pub fn fail_address(&self, address: &str) {
        self.state
            .lock()
            .expect("chain lock should not be poisoned")
            .failing
            .insert(address.to_string());
    }

    pub fn clear_failures(&self) {
        self.state
            .lock()
            .expect("chain lock should not be poisoned")
            .failing
            .clear();
    }
}

impl ChainSource for MockChain {
    fn active_validators(&self) -> ChainFuture<'_, Vec<String>> {
        Box::pin(async move {
            Ok(self
                .state
                .lock()
                .expect("chain lock should not be poisoned")
                .active
                .clone())
        })
    }

    fn current_era(&self) -> ChainFuture<'_, Option<u32>> {
        Box::pin(async move { Ok(self.state.lock().expect("chain lock should not be poisoned").era) })
    }

    fn fetch_snapshot<'a>(&'a self, address: &'a str, _era: u32) -> ChainFuture<'a, ValidatorSnapshot> {
        Box::pin(async move {
            let state = self.state.lock().expect("chain lock should not be poisoned");
            if state.failing.contains(address) {
                return Err(anyhow!("mock fetch failure for {}", address));
            }
            state
                .snapshots
                .get(address)
                .cloned()
                .ok_or_else(|| anyhow!("no snapshot for {}", address))
        })
    }
}

/// Transport that records everything it is asked to send
#[derive(Default)]
pub struct RecordingTransport {
    pub texts: Mutex<Vec<String>>,
    pub messages: Mutex<Vec<AlertMessage>>,
    fail: AtomicBool,
    fail_texts: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Fail only plain text sends (follower mentions)
    pub fn set_failing_texts(&self, fail: bool) {
        self.fail_texts.store(fail, Ordering::SeqCst);
    }

    pub fn titles(&self) -> Vec<String> {
        self.messages
            .lock()
            .expect("transport lock should not be poisoned")
            .iter()
            .map(|m| m.title.clone())
            .collect()
    }
}

impl AlertTransport for RecordingTransport {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn send_text<'a>(&'a self, text: &'a str) -> TransportFuture<'a> {
        Box::pin(async move {
            if self.fail.load(Ordering::SeqCst) || self.fail_texts.load(Ordering::SeqCst) {
                return Err(anyhow!("transport down"));
            }
            self.texts
                .lock()
                .expect("transport lock should not be poisoned")
                .push(text.to_string());
            Ok(())
        })
    }

    fn send_message<'a>(&'a self, message: &'a AlertMessage) -> TransportFuture<'a> {
        Box::pin(async move {
            if self.fail.load(Ordering::SeqCst) {
                return Err(anyhow!("transport down"));
            }
            self.messages
                .lock()
                .expect("transport lock should not be poisoned")
                .push(message.clone());
            Ok(())
        })
    }
}

/// Snapshot with `points` out of a 100-point pool, i.e. `points`% performance
pub fn snapshot(address: &str, points: u64, slashed: bool) -> ValidatorSnapshot {
    ValidatorSnapshot {
        address: address.to_string(),
        identity: None,
        slashing: slashed.then(|| SlashingInfo {
            span_index: 1,
            last_start: 40,
            last_nonzero_slash: 41,
            prior: vec![],
        }),
        commission: 5.0,
        era_points: EraPoints::new(100, points),
    }
}

pub fn default_policy() -> AlertPolicy {
    AlertPolicy::new(&[10, 25, 50], TimeDelta::days(14), InactivityResetPolicy::Never)
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0)
        .single()
        .expect("fixed test timestamp should be valid")
}
