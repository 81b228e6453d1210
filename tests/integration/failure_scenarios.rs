//! Failure handling: unreachable devices, refused deliveries,
//! corrupt documents

use std::sync::Arc;
use std::time::Duration;

use vigil::alarm::Status;
use vigil::alerter::AlerterHandle;
use vigil::poller::PollerHandle;
use vigil::store::{SnapshotStore, StateStore};

use crate::helpers::*;

#[tokio::test]
async fn unreachable_fleet_yields_unknown_and_no_notifications() {
    let dirs = shared_dirs().await;

    // nothing scripted: every query fails
    let client = Arc::new(ScriptedClient::new(Duration::from_millis(1)));

    let (poller, poller_task) = PollerHandle::spawn(
        vec![device("10.0.0.1"), device("10.0.0.2")],
        client,
        dirs.snapshots.clone(),
        dirs.history.clone(),
        &poller_config(4),
    );
    poller.poll_now().await.unwrap();

    let notifier = Arc::new(RecordingNotifier::default());
    let (alerter, alerter_task) = AlerterHandle::spawn(
        dirs.snapshots.clone(),
        dirs.states.clone(),
        Some(notifier.clone()),
        &alerter_config(80, 3600),
    );
    alerter.evaluate_now().await.unwrap();

    assert_eq!(notifier.delivery_count(), 0);

    for ip in ["10.0.0.1", "10.0.0.2"] {
        let state = dirs
            .states
            .load(ip.parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.status, Status::Unknown);
        assert!(!state.alarm_active);
        assert!(state.last_alert_ts.is_none());
    }

    // the ledger still recorded the failed round, with empty values
    let content = std::fs::read_to_string(dirs.dir.path().join("cpu.csv")).unwrap();
    assert_eq!(content.lines().count(), 3);

    poller.shutdown().await.unwrap();
    alerter.shutdown().await.unwrap();
    poller_task.await.unwrap();
    alerter_task.await.unwrap();
}

#[tokio::test]
async fn refused_delivery_does_not_unwind_the_alarm_transition() {
    let dirs = shared_dirs().await;

    let client = Arc::new(ScriptedClient::new(Duration::from_millis(1)));
    client.set("10.0.0.1", Some(95));

    let (poller, poller_task) = PollerHandle::spawn(
        vec![device("10.0.0.1")],
        client,
        dirs.snapshots.clone(),
        dirs.history.clone(),
        &poller_config(1),
    );
    poller.poll_now().await.unwrap();

    let notifier = Arc::new(RecordingNotifier::failing());
    let (alerter, alerter_task) = AlerterHandle::spawn(
        dirs.snapshots.clone(),
        dirs.states.clone(),
        Some(notifier.clone()),
        &alerter_config(80, 3600),
    );
    alerter.evaluate_now().await.unwrap();

    assert_eq!(notifier.delivery_count(), 0);

    let state = dirs
        .states
        .load("10.0.0.1".parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(state.alarm_active, "transition must commit before delivery");

    poller.shutdown().await.unwrap();
    alerter.shutdown().await.unwrap();
    poller_task.await.unwrap();
    alerter_task.await.unwrap();
}

#[tokio::test]
async fn corrupt_snapshot_does_not_poison_the_cycle() {
    let dirs = shared_dirs().await;

    let client = Arc::new(ScriptedClient::new(Duration::from_millis(1)));
    client.set("10.0.0.2", Some(90));

    let (poller, poller_task) = PollerHandle::spawn(
        vec![device("10.0.0.2")],
        client,
        dirs.snapshots.clone(),
        dirs.history.clone(),
        &poller_config(1),
    );
    poller.poll_now().await.unwrap();

    // hand-planted garbage alongside the real snapshot
    std::fs::write(dirs.snapshots.path_for("10.0.0.1"), b"not json at all").unwrap();

    let notifier = Arc::new(RecordingNotifier::default());
    let (alerter, alerter_task) = AlerterHandle::spawn(
        dirs.snapshots.clone(),
        dirs.states.clone(),
        Some(notifier.clone()),
        &alerter_config(80, 3600),
    );
    alerter.evaluate_now().await.unwrap();

    assert_eq!(
        notifier.subjects(),
        vec!["[SNMP CPU] ALERT ip=10.0.0.2 cpu=90 thr=80"]
    );

    poller.shutdown().await.unwrap();
    alerter.shutdown().await.unwrap();
    poller_task.await.unwrap();
    alerter_task.await.unwrap();
}

#[tokio::test]
async fn missing_snapshot_directory_fails_the_cycle_loudly() {
    let dir = tempfile::tempdir().unwrap();

    let snapshots = SnapshotStore::new(dir.path().join("never-created"));
    let states = StateStore::new(dir.path().join("state"));
    states.ensure_dir().await.unwrap();

    let (alerter, task) =
        AlerterHandle::spawn(snapshots, states, None, &alerter_config(80, 3600));

    let result = alerter.evaluate_now().await;
    assert!(result.is_err(), "enumeration failure must surface");

    alerter.shutdown().await.unwrap();
    task.await.unwrap();
}
