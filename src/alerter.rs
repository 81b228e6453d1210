//! Alerter actor - evaluates snapshots and drives alarm state
//!
//! Runs on its own schedule, fully decoupled from the poller: the only
//! thing the two share is the snapshot directory. Each cycle scans the
//! current snapshot documents in sorted order, advances every device's
//! alarm state machine, persists the state, and hands fired actions to
//! the notifier.
//!
//! Per-device evaluation is cheap (pure computation plus one atomic
//! file write), so the scan is sequential; cycles never overlap.
//!
//! Devices that still have state documents but no longer appear among
//! the snapshots are left untouched. There is no decay or expiry for
//! removed devices; their state files linger until cleaned up by hand.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, instrument, warn};

use crate::alarm::{AlarmState, Status};
use crate::config::AlerterConfig;
use crate::notify::{Notification, Notifier};
use crate::store::{SnapshotStore, StateStore};

/// Commands that can be sent to an AlerterActor
#[derive(Debug)]
pub enum AlerterCommand {
    /// Trigger an immediate evaluation cycle
    EvaluateNow {
        respond_to: oneshot::Sender<Result<()>>,
    },

    /// Gracefully shut down; an in-flight cycle finishes first
    Shutdown,
}

/// Actor that periodically re-evaluates every device's latest snapshot
pub struct AlerterActor {
    snapshots: SnapshotStore,
    states: StateStore,
    notifier: Option<Arc<dyn Notifier>>,
    threshold: i64,
    cooldown: chrono::Duration,
    cooldown_secs: u64,
    interval_duration: Duration,
    command_rx: mpsc::Receiver<AlerterCommand>,
}

impl AlerterActor {
    pub fn new(
        snapshots: SnapshotStore,
        states: StateStore,
        notifier: Option<Arc<dyn Notifier>>,
        config: &AlerterConfig,
        command_rx: mpsc::Receiver<AlerterCommand>,
    ) -> Self {
        Self {
            snapshots,
            states,
            notifier,
            threshold: config.threshold,
            cooldown: chrono::Duration::seconds(config.cooldown as i64),
            cooldown_secs: config.cooldown,
            interval_duration: Duration::from_secs(config.interval),
            command_rx,
        }
    }

    /// Run the actor's main loop until shutdown.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!(
            "starting alerter: threshold {}, cooldown {}s, interval {:?}",
            self.threshold, self.cooldown_secs, self.interval_duration
        );

        let mut ticker = interval(self.interval_duration);
        // an overrunning cycle delays the next one instead of
        // triggering a burst of back-to-back cycles
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        error!("evaluation cycle failed: {:#}", e);
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        AlerterCommand::EvaluateNow { respond_to } => {
                            debug!("received EvaluateNow command");
                            let result = self.run_cycle().await;
                            let _ = respond_to.send(result);
                        }

                        AlerterCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("alerter stopped");
    }

    /// One evaluation cycle over all current snapshots.
    #[instrument(skip(self))]
    async fn run_cycle(&self) -> Result<()> {
        let paths = self
            .snapshots
            .list()
            .await
            .context("failed to enumerate snapshots")?;

        for path in paths {
            if let Err(e) = self.process_snapshot(&path).await {
                error!("skipping {}: {:#}", path.display(), e);
            }
        }

        Ok(())
    }

    /// Evaluate a single snapshot document and persist the advanced
    /// alarm state.
    ///
    /// The state write happens before notification delivery: the
    /// transition is authoritative whether or not the message makes it
    /// out.
    async fn process_snapshot(&self, path: &std::path::Path) -> Result<()> {
        let sample = match self.snapshots.read(path).await {
            Ok(Some(sample)) => sample,
            Ok(None) => return Ok(()),
            Err(e) => {
                info!("unreadable snapshot {}: {e}", path.display());
                return Ok(());
            }
        };

        let now = Utc::now();
        let status = Status::from_value(sample.cpu_percent, self.threshold);

        let mut state = self
            .states
            .load(sample.ip)
            .await
            .context("failed to load alarm state")?
            .unwrap_or_else(|| AlarmState::new(sample.ip, now));

        let action = state.observe(status, now, self.cooldown);

        self.states
            .save(&state)
            .await
            .context("failed to persist alarm state")?;

        if status == Status::Unknown {
            info!(
                "ip={} status=UNKNOWN (cpu_percent is null) snap={}",
                sample.ip, sample.timestamp_utc
            );
            return Ok(());
        }

        let Some(action) = action else {
            debug!("ip={} status={:?} action=none", sample.ip, status);
            return Ok(());
        };

        info!(
            "ip={} status={:?} action={}",
            sample.ip,
            status,
            action.as_str()
        );

        if let Some(notifier) = &self.notifier {
            let notification = Notification {
                action,
                ip: sample.ip,
                cpu_percent: sample.cpu_percent,
                threshold: self.threshold,
                snapshot_ts: sample.timestamp_utc,
                cooldown_secs: self.cooldown_secs,
            };

            match notifier.notify(&notification).await {
                Ok(()) => info!("ip={} notified ({})", sample.ip, action.as_str()),
                Err(e) => {
                    // state is already committed; delivery is advisory
                    error!(
                        "ip={} notification FAILED ({}): {:#}",
                        sample.ip,
                        action.as_str(),
                        e
                    );
                }
            }
        }

        Ok(())
    }
}

/// Handle for controlling an AlerterActor
#[derive(Clone)]
pub struct AlerterHandle {
    sender: mpsc::Sender<AlerterCommand>,
}

impl AlerterHandle {
    /// Spawn the alerter as a tokio task.
    pub fn spawn(
        snapshots: SnapshotStore,
        states: StateStore,
        notifier: Option<Arc<dyn Notifier>>,
        config: &AlerterConfig,
    ) -> (Self, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = AlerterActor::new(snapshots, states, notifier, config, cmd_rx);
        let task = tokio::spawn(actor.run());

        (Self { sender: cmd_tx }, task)
    }

    /// Trigger an immediate evaluation cycle and wait for it.
    pub async fn evaluate_now(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(AlerterCommand::EvaluateNow { respond_to: tx })
            .await
            .context("failed to send EvaluateNow command")?;

        rx.await.context("failed to receive response")??;
        Ok(())
    }

    /// Gracefully shut down the alerter.
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(AlerterCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
