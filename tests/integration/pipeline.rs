//! End-to-end poller → snapshot store → alerter → notifier flow
//!
//! The two actors share nothing but the snapshot directory, exactly as
//! the two deployed daemons would.

use std::sync::Arc;
use std::time::Duration;

use vigil::alarm::Status;
use vigil::alerter::AlerterHandle;
use vigil::poller::PollerHandle;

use crate::helpers::*;

#[tokio::test]
async fn alert_and_recovery_travel_through_the_snapshot_store() {
    let dirs = shared_dirs().await;

    let client = Arc::new(ScriptedClient::new(Duration::from_millis(1)));
    client.set("10.0.0.1", Some(92));
    client.set("10.0.0.2", Some(40));

    let (poller, poller_task) = PollerHandle::spawn(
        vec![device("10.0.0.1"), device("10.0.0.2")],
        client.clone(),
        dirs.snapshots.clone(),
        dirs.history.clone(),
        &poller_config(10),
    );

    let notifier = Arc::new(RecordingNotifier::default());
    let (alerter, alerter_task) = AlerterHandle::spawn(
        dirs.snapshots.clone(),
        dirs.states.clone(),
        Some(notifier.clone()),
        &alerter_config(80, 3600),
    );

    // round 1: device .1 is hot
    poller.poll_now().await.unwrap();
    alerter.evaluate_now().await.unwrap();

    assert_eq!(
        notifier.subjects(),
        vec!["[SNMP CPU] ALERT ip=10.0.0.1 cpu=92 thr=80"]
    );

    // round 2: device .1 cooled off
    client.set("10.0.0.1", Some(35));
    poller.poll_now().await.unwrap();
    alerter.evaluate_now().await.unwrap();

    assert_eq!(
        notifier.subjects(),
        vec![
            "[SNMP CPU] ALERT ip=10.0.0.1 cpu=92 thr=80",
            "[SNMP CPU] RECOVERY ip=10.0.0.1 cpu=35 thr=80",
        ]
    );

    // device .2 stayed quiet throughout
    let state = dirs
        .states
        .load("10.0.0.2".parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.status, Status::Ok);
    assert!(!state.alarm_active);
    assert!(state.last_alert_ts.is_none());

    poller.shutdown().await.unwrap();
    alerter.shutdown().await.unwrap();
    poller_task.await.unwrap();
    alerter_task.await.unwrap();
}

#[tokio::test]
async fn history_ledger_accumulates_across_rounds() {
    let dirs = shared_dirs().await;

    let client = Arc::new(ScriptedClient::new(Duration::from_millis(1)));
    client.set("10.0.0.1", Some(10));

    let (poller, poller_task) = PollerHandle::spawn(
        vec![device("10.0.0.1")],
        client,
        dirs.snapshots.clone(),
        dirs.history.clone(),
        &poller_config(1),
    );

    for _ in 0..3 {
        poller.poll_now().await.unwrap();
    }

    let content = std::fs::read_to_string(dirs.dir.path().join("cpu.csv")).unwrap();
    let lines: Vec<_> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "timestamp_utc,ip,cpu_percent");
    for row in &lines[1..] {
        assert!(row.contains(",10.0.0.1,10"));
    }

    poller.shutdown().await.unwrap();
    poller_task.await.unwrap();
}

#[tokio::test]
async fn snapshot_is_replaced_not_accumulated() {
    let dirs = shared_dirs().await;

    let client = Arc::new(ScriptedClient::new(Duration::from_millis(1)));
    client.set("10.0.0.1", Some(10));

    let (poller, poller_task) = PollerHandle::spawn(
        vec![device("10.0.0.1")],
        client.clone(),
        dirs.snapshots.clone(),
        dirs.history.clone(),
        &poller_config(1),
    );

    poller.poll_now().await.unwrap();
    client.set("10.0.0.1", Some(99));
    poller.poll_now().await.unwrap();

    let paths = dirs.snapshots.list().await.unwrap();
    assert_eq!(paths.len(), 1);

    let sample = dirs.snapshots.read(&paths[0]).await.unwrap().unwrap();
    assert_eq!(sample.cpu_percent, Some(99));

    poller.shutdown().await.unwrap();
    poller_task.await.unwrap();
}

#[tokio::test]
async fn alarm_state_survives_an_alerter_restart() {
    let dirs = shared_dirs().await;

    let client = Arc::new(ScriptedClient::new(Duration::from_millis(1)));
    client.set("10.0.0.1", Some(92));

    let (poller, poller_task) = PollerHandle::spawn(
        vec![device("10.0.0.1")],
        client,
        dirs.snapshots.clone(),
        dirs.history.clone(),
        &poller_config(1),
    );
    poller.poll_now().await.unwrap();

    let notifier = Arc::new(RecordingNotifier::default());

    // first alerter instance raises the alarm, then goes away
    let (alerter, alerter_task) = AlerterHandle::spawn(
        dirs.snapshots.clone(),
        dirs.states.clone(),
        Some(notifier.clone()),
        &alerter_config(80, 3600),
    );
    alerter.evaluate_now().await.unwrap();
    alerter.shutdown().await.unwrap();
    alerter_task.await.unwrap();

    // a fresh instance picks up the persisted state: no duplicate alert
    let (alerter, alerter_task) = AlerterHandle::spawn(
        dirs.snapshots.clone(),
        dirs.states.clone(),
        Some(notifier.clone()),
        &alerter_config(80, 3600),
    );
    alerter.evaluate_now().await.unwrap();

    assert_eq!(notifier.delivery_count(), 1);

    alerter.shutdown().await.unwrap();
    alerter_task.await.unwrap();
    poller.shutdown().await.unwrap();
    poller_task.await.unwrap();
}
