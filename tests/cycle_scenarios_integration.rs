mod common;

use chrono::TimeDelta;
use std::sync::Arc;

use common::{ALICE, BOB, MockChain, RecordingTransport, default_policy, snapshot, t0};
use validator_sentinel::{
    AlertKind, CycleError, Database, Monitor, Notifier, ValidatorRegistry, run_cycle,
};

fn registry() -> (tempfile::TempDir, ValidatorRegistry) {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let registry = ValidatorRegistry::new(dir.path().join("validators.json"));
    (dir, registry)
}

fn kinds(alerts: &[validator_sentinel::Alert]) -> Vec<AlertKind> {
    alerts.iter().map(|a| a.kind.clone()).collect()
}

#[tokio::test]
async fn reobserving_the_same_snapshot_fires_nothing_new() {
    let (_dir, mut registry) = registry();
    let chain = MockChain::new(100);
    let policy = default_policy();
    chain.set_active(vec![snapshot(ALICE, 80, false)]);

    let first = run_cycle(&mut registry, chain.clone(), &policy, 4, t0())
        .await
        .expect("first cycle should succeed");
    assert_eq!(kinds(&first.alerts), vec![AlertKind::Joined]);
    assert!(first.changed);

    let second = run_cycle(&mut registry, chain.clone(), &policy, 4, t0() + TimeDelta::hours(1))
        .await
        .expect("second cycle should succeed");
    assert!(second.alerts.is_empty());
    assert!(!second.changed);
}

#[tokio::test]
async fn slash_alert_is_edge_triggered() {
    let (_dir, mut registry) = registry();
    let chain = MockChain::new(100);
    let policy = default_policy();

    chain.set_active(vec![snapshot(ALICE, 80, false)]);
    run_cycle(&mut registry, chain.clone(), &policy, 4, t0())
        .await
        .expect("join cycle should succeed");

    chain.set_active(vec![snapshot(ALICE, 80, true)]);
    let slashed = run_cycle(&mut registry, chain.clone(), &policy, 4, t0() + TimeDelta::hours(1))
        .await
        .expect("slash cycle should succeed");
    assert_eq!(kinds(&slashed.alerts), vec![AlertKind::Slashed]);
    assert!(registry.get(ALICE).expect("record should exist").is_slashed());

    let later = run_cycle(&mut registry, chain.clone(), &policy, 4, t0() + TimeDelta::days(30))
        .await
        .expect("later cycle should succeed");
    assert!(later.alerts.is_empty());
}

#[tokio::test]
async fn one_threshold_fires_per_cooldown_window() {
    let (_dir, mut registry) = registry();
    let chain = MockChain::new(100);
    let policy = default_policy();

    chain.set_active(vec![snapshot(ALICE, 80, false)]);
    run_cycle(&mut registry, chain.clone(), &policy, 4, t0())
        .await
        .expect("join cycle should succeed");

    chain.set_active(vec![snapshot(ALICE, 5, false)]);
    let dropped = run_cycle(&mut registry, chain.clone(), &policy, 4, t0() + TimeDelta::hours(1))
        .await
        .expect("drop cycle should succeed");
    assert_eq!(kinds(&dropped.alerts), vec![AlertKind::Inactivity { threshold: 10 }]);

    let record = registry.get(ALICE).expect("record should exist");
    assert_eq!(record.inactivity_notified.iter().copied().collect::<Vec<_>>(), vec![10]);

    let blocked = run_cycle(&mut registry, chain.clone(), &policy, 4, t0() + TimeDelta::days(2))
        .await
        .expect("blocked cycle should succeed");
    assert!(blocked.alerts.is_empty());
}

#[tokio::test]
async fn slash_cooldown_suppresses_inactivity_until_it_elapses() {
    let (_dir, mut registry) = registry();
    let chain = MockChain::new(100);
    let policy = default_policy();

    chain.set_active(vec![snapshot(ALICE, 80, false)]);
    run_cycle(&mut registry, chain.clone(), &policy, 4, t0() - TimeDelta::days(1))
        .await
        .expect("join cycle should succeed");

    chain.set_active(vec![snapshot(ALICE, 80, true)]);
    let slash = run_cycle(&mut registry, chain.clone(), &policy, 4, t0())
        .await
        .expect("slash cycle should succeed");
    assert_eq!(kinds(&slash.alerts), vec![AlertKind::Slashed]);

    chain.set_active(vec![snapshot(ALICE, 20, true)]);
    let soon = run_cycle(&mut registry, chain.clone(), &policy, 4, t0() + TimeDelta::hours(1))
        .await
        .expect("cooldown cycle should succeed");
    assert!(soon.alerts.is_empty());

    let after = run_cycle(&mut registry, chain.clone(), &policy, 4, t0() + TimeDelta::days(15))
        .await
        .expect("post-cooldown cycle should succeed");
    assert_eq!(kinds(&after.alerts), vec![AlertKind::Inactivity { threshold: 25 }]);
}

#[tokio::test]
async fn removed_validator_rejoins_without_a_second_join() {
    let (_dir, mut registry) = registry();
    let chain = MockChain::new(100);
    let policy = default_policy();

    chain.set_active(vec![snapshot(ALICE, 80, false), snapshot(BOB, 5, false)]);
    run_cycle(&mut registry, chain.clone(), &policy, 4, t0())
        .await
        .expect("join cycle should succeed");
    run_cycle(&mut registry, chain.clone(), &policy, 4, t0() + TimeDelta::hours(1))
        .await
        .expect("threshold cycle should succeed");
    assert!(registry.get(BOB).expect("bob should be tracked").inactivity_notified.contains(&10));

    chain.set_active(vec![snapshot(ALICE, 80, false)]);
    let removal = run_cycle(&mut registry, chain.clone(), &policy, 4, t0() + TimeDelta::hours(2))
        .await
        .expect("removal cycle should succeed");
    assert_eq!(kinds(&removal.alerts), vec![AlertKind::Removed]);
    assert_eq!(removal.removed, vec![BOB.to_string()]);
    assert!(!registry.get(BOB).expect("bob should still be tracked").active);

    let quiet = run_cycle(&mut registry, chain.clone(), &policy, 4, t0() + TimeDelta::hours(3))
        .await
        .expect("quiet cycle should succeed");
    assert!(quiet.alerts.is_empty());

    chain.set_active(vec![snapshot(ALICE, 80, false), snapshot(BOB, 5, false)]);
    let rejoin = run_cycle(&mut registry, chain.clone(), &policy, 4, t0() + TimeDelta::hours(4))
        .await
        .expect("rejoin cycle should succeed");
    assert_eq!(kinds(&rejoin.alerts), vec![AlertKind::Rejoined]);
    assert!(rejoin.joined.is_empty());
    assert_eq!(rejoin.rejoined, vec![BOB.to_string()]);

    let bob = registry.get(BOB).expect("bob should be tracked");
    assert!(bob.active);
    assert!(bob.inactivity_notified.contains(&10));
    assert_eq!(registry.len(), 2);
}

#[tokio::test]
async fn three_cycle_join_slash_inactivity_scenario() {
    let (_dir, mut registry) = registry();
    let chain = MockChain::new(100);
    let policy = default_policy();

    chain.set_active(vec![snapshot(ALICE, 80, false)]);
    let cycle1 = run_cycle(&mut registry, chain.clone(), &policy, 4, t0())
        .await
        .expect("cycle 1 should succeed");
    assert_eq!(kinds(&cycle1.alerts), vec![AlertKind::Joined]);
    assert!(registry.get(ALICE).is_some());

    chain.set_active(vec![snapshot(ALICE, 5, true)]);
    let cycle2 = run_cycle(&mut registry, chain.clone(), &policy, 4, t0() + TimeDelta::minutes(5))
        .await
        .expect("cycle 2 should succeed");
    assert_eq!(kinds(&cycle2.alerts), vec![AlertKind::Slashed]);
    let record = registry.get(ALICE).expect("record should exist");
    assert!(record.is_slashed());
    assert!(record.inactivity_notified.is_empty());

    let cycle3 = run_cycle(&mut registry, chain.clone(), &policy, 4, t0() + TimeDelta::days(15))
        .await
        .expect("cycle 3 should succeed");
    assert_eq!(kinds(&cycle3.alerts), vec![AlertKind::Inactivity { threshold: 10 }]);
    let record = registry.get(ALICE).expect("record should exist");
    assert_eq!(record.inactivity_notified.iter().copied().collect::<Vec<_>>(), vec![10]);
}

#[tokio::test]
async fn missing_era_aborts_without_touching_the_registry() {
    let (_dir, mut registry) = registry();
    let chain = MockChain::new(100);
    let policy = default_policy();
    chain.set_active(vec![snapshot(ALICE, 80, false)]);

    chain.set_era(None);
    let err = run_cycle(&mut registry, chain.clone(), &policy, 4, t0())
        .await
        .expect_err("cycle without era should abort");
    assert!(matches!(err, CycleError::EraUnavailable));

    chain.set_era(Some(0));
    let err = run_cycle(&mut registry, chain.clone(), &policy, 4, t0())
        .await
        .expect_err("era 0 should abort");
    assert!(matches!(err, CycleError::EraUnavailable));

    assert!(registry.is_empty());
    assert!(!registry.is_dirty());
}

#[tokio::test]
async fn fetch_failure_skips_only_that_address() {
    let (_dir, mut registry) = registry();
    let chain = MockChain::new(100);
    let policy = default_policy();

    chain.set_active(vec![snapshot(ALICE, 80, false)]);
    run_cycle(&mut registry, chain.clone(), &policy, 4, t0())
        .await
        .expect("join cycle should succeed");

    chain.set_active(vec![snapshot(ALICE, 80, false), snapshot(BOB, 80, false)]);
    chain.fail_address(ALICE);
    let report = run_cycle(&mut registry, chain.clone(), &policy, 4, t0() + TimeDelta::hours(1))
        .await
        .expect("partial cycle should succeed");

    assert_eq!(report.skipped, vec![ALICE.to_string()]);
    assert_eq!(kinds(&report.alerts), vec![AlertKind::Joined]);
    assert_eq!(report.joined, vec![BOB.to_string()]);
    assert!(report.removed.is_empty());
    assert!(registry.get(ALICE).expect("alice should stay tracked").active);
}

#[tokio::test]
async fn monitor_persists_before_dispatch_and_survives_transport_failure() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let registry_path = dir.path().join("validators.json");
    let chain = MockChain::new(100);
    let transport = RecordingTransport::new();
    transport.set_failing(true);

    chain.set_active(vec![snapshot(ALICE, 80, false)]);
    let notifier = Notifier::new(
        transport.clone(),
        Database::in_memory().expect("in-memory db should open"),
    );
    let mut monitor = Monitor::new(
        ValidatorRegistry::new(registry_path.clone()),
        chain.clone(),
        notifier,
        default_policy(),
    );

    let summary = monitor
        .run_once_at(t0())
        .await
        .expect("cycle should succeed");
    assert_eq!(summary.report.alerts.len(), 1);
    assert_eq!(summary.alerts_delivered, 0);
    assert!(summary.persisted);
    assert!(registry_path.exists());

    let restored = ValidatorRegistry::restore(registry_path);
    assert!(restored.get(ALICE).expect("alice should be persisted").active);

    transport.set_failing(false);
    let second = monitor
        .run_once_at(t0() + TimeDelta::minutes(5))
        .await
        .expect("second cycle should succeed");
    assert!(second.report.alerts.is_empty());
    assert!(!second.persisted);
    assert!(transport.titles().is_empty());
    assert_eq!(monitor.cycles_run(), 2);
}

#[tokio::test]
async fn monitor_mentions_followers_and_records_history() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let chain = MockChain::new(100);
    let transport = RecordingTransport::new();
    let db = Database::in_memory().expect("in-memory db should open");
    {
        let conn = db.lock().expect("db lock should succeed");
        validator_sentinel::database::queries::add_subscription(&conn, ALICE, "777")
            .expect("subscription insert should succeed");
    }

    chain.set_active(vec![snapshot(ALICE, 80, false)]);
    let mut monitor = Monitor::new(
        ValidatorRegistry::new(dir.path().join("validators.json")),
        chain.clone() as Arc<dyn validator_sentinel::ChainSource>,
        Notifier::new(transport.clone(), db.clone()),
        default_policy(),
    );
    monitor.run_once_at(t0()).await.expect("cycle should succeed");

    let texts = transport.texts.lock().expect("transport lock should not be poisoned").clone();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("<@777>"));
    assert_eq!(transport.titles(), vec!["🆕 New Validator".to_string()]);

    let conn = db.lock().expect("db lock should succeed");
    let history = validator_sentinel::database::queries::recent_alerts(&conn, ALICE, 5)
        .expect("history query should succeed");
    assert_eq!(history.len(), 1);
    assert!(history[0].delivered);
    assert_eq!(history[0].alert_type, "VALIDATOR_JOINED");
}

#[tokio::test]
async fn failed_follower_mention_does_not_block_the_alert() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let chain = MockChain::new(100);
    let transport = RecordingTransport::new();
    transport.set_failing_texts(true);
    let db = Database::in_memory().expect("in-memory db should open");
    {
        let conn = db.lock().expect("db lock should succeed");
        validator_sentinel::database::queries::add_subscription(&conn, ALICE, "777")
            .expect("subscription insert should succeed");
    }

    chain.set_active(vec![snapshot(ALICE, 80, false)]);
    let mut monitor = Monitor::new(
        ValidatorRegistry::new(dir.path().join("validators.json")),
        chain.clone() as Arc<dyn validator_sentinel::ChainSource>,
        Notifier::new(transport.clone(), db.clone()),
        default_policy(),
    );
    let summary = monitor.run_once_at(t0()).await.expect("cycle should succeed");
    assert_eq!(summary.alerts_delivered, 1);

    let texts = transport.texts.lock().expect("transport lock should not be poisoned").clone();
    assert!(texts.is_empty());
    assert_eq!(transport.titles(), vec!["🆕 New Validator".to_string()]);

    let conn = db.lock().expect("db lock should succeed");
    let history = validator_sentinel::database::queries::recent_alerts(&conn, ALICE, 5)
        .expect("history query should succeed");
    assert_eq!(history.len(), 1);
    assert!(history[0].delivered);
}
