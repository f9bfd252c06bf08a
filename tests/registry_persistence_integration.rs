mod common;

use chrono::TimeDelta;
use serde_json::Value;

use common::{ALICE, BOB, snapshot, t0};
use validator_sentinel::{SlashState, ValidatorRecord, ValidatorRegistry};

fn records(registry: &ValidatorRegistry) -> Vec<ValidatorRecord> {
    registry.all().cloned().collect()
}

fn populated(path: std::path::PathBuf) -> ValidatorRegistry {
    let mut registry = ValidatorRegistry::new(path);

    registry.upsert(ALICE, |_| ValidatorRecord::joined(&snapshot(ALICE, 80, false)));
    registry.upsert(BOB, |_| {
        let mut record = ValidatorRecord::joined(&snapshot(BOB, 7, true));
        record.active = false;
        record.inactivity_notified.extend([10, 25]);
        record.mark_notified(t0() + TimeDelta::milliseconds(1234));
        record
    });
    registry.upsert("zero-pool", |_| {
        let mut s = snapshot("zero-pool", 0, false);
        s.era_points = validator_sentinel::EraPoints::new(0, 0);
        ValidatorRecord::joined(&s)
    });
    registry
}

#[test]
fn persist_then_restore_round_trips_every_field() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("validators.json");

    let mut registry = populated(path.clone());
    registry.persist().expect("persist should succeed");
    assert!(!registry.is_dirty());

    let restored = ValidatorRegistry::restore(path);
    assert_eq!(records(&restored), records(&registry));

    let alice = restored.get(ALICE).expect("alice should be restored");
    assert!(alice.inactivity_notified.is_empty());
    assert_eq!(alice.last_notification_at, None);
    assert_eq!(alice.slash, SlashState::NeverSlashed);

    let bob = restored.get(BOB).expect("bob should be restored");
    assert_eq!(bob.slash, SlashState::SlashedAt { era: 41 });
    assert_eq!(bob.last_notification_at, Some(t0() + TimeDelta::milliseconds(1234)));
    assert!(!bob.active);

    let zero = restored.get("zero-pool").expect("zero-pool should be restored");
    assert_eq!(zero.era_points.performance_percent, None);
}

#[test]
fn document_uses_lists_and_epoch_millis() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("validators.json");

    populated(path.clone()).persist().expect("persist should succeed");
    let raw = std::fs::read_to_string(&path).expect("registry file should exist");
    let document: Value = serde_json::from_str(&raw).expect("registry should be valid JSON");

    let bob = &document[BOB];
    assert_eq!(bob["slashed"], Value::Bool(true));
    assert_eq!(bob["inactivityNotified"], serde_json::json!([10, 25]));
    assert_eq!(
        bob["lastNotificationAt"],
        serde_json::json!((t0() + TimeDelta::milliseconds(1234)).timestamp_millis())
    );
    assert_eq!(document[ALICE]["lastNotificationAt"], Value::Null);
    assert_eq!(document[ALICE]["inactivityNotified"], serde_json::json!([]));
    assert_eq!(document[ALICE]["eraPoints"]["validatorShare"], serde_json::json!(80));
}

#[test]
fn empty_registry_round_trips() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("validators.json");

    ValidatorRegistry::new(path.clone())
        .persist()
        .expect("persist should succeed");
    assert!(ValidatorRegistry::restore(path).is_empty());
}

#[test]
fn missing_file_starts_empty() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let registry = ValidatorRegistry::restore(dir.path().join("absent.json"));
    assert!(registry.is_empty());
    assert!(!registry.is_dirty());
}

#[test]
fn corrupt_file_starts_empty_and_is_moved_aside() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("validators.json");
    std::fs::write(&path, "{ not json").expect("fixture should be written");

    let registry = ValidatorRegistry::restore(path.clone());
    assert!(registry.is_empty());
    assert!(!path.exists());
    assert!(dir.path().join("validators.json.corrupt").exists());
}

#[test]
fn legacy_documents_without_optional_fields_load() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("validators.json");
    std::fs::write(
        &path,
        format!(
            r#"{{"{ALICE}": {{"active": true, "slashed": true, "commission": 3.5,
                "eraPoints": {{"total": 10, "validatorShare": 1, "performancePercent": 10.0}}}}}}"#
        ),
    )
    .expect("fixture should be written");

    let registry = ValidatorRegistry::restore(path);
    let alice = registry.get(ALICE).expect("alice should load");
    assert!(alice.is_slashed());
    assert!(alice.inactivity_notified.is_empty());
    assert_eq!(alice.last_notification_at, None);
}

#[test]
fn persist_if_dirty_skips_clean_registry() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("validators.json");

    let mut registry = populated(path.clone());
    assert!(registry.persist_if_dirty().expect("first persist should succeed"));
    assert!(!registry.persist_if_dirty().expect("second persist should succeed"));
}
