//! Poller actor - queries the device fleet and persists samples
//!
//! One actor covers the whole registry. Each round fans out one SNMP
//! query per device, bounded by a counting semaphore, and joins every
//! query before persisting: the round is a synchronization barrier, so
//! no two rounds for the same device ever overlap. If a round overruns
//! the interval, the next one starts right after completion instead of
//! running concurrently.
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → fan out queries (≤ N in flight) → join all
//!            → append history row + replace snapshot per device
//!     ↑
//!     └─── Commands (PollNow, Shutdown)
//! ```
//!
//! A device's query failure becomes an absent-value sample and never
//! fails the round. Only store writes can fail per device; those are
//! logged and retried implicitly on the next round.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, instrument, warn};

use crate::Sample;
use crate::client::MetricClient;
use crate::config::PollerConfig;
use crate::registry::Device;
use crate::store::{HistoryLedger, SnapshotStore};

/// Commands that can be sent to a PollerActor
#[derive(Debug)]
pub enum PollerCommand {
    /// Trigger an immediate round (bypassing the interval timer)
    PollNow {
        respond_to: oneshot::Sender<Result<()>>,
    },

    /// Gracefully shut down; an in-flight round finishes first
    Shutdown,
}

/// Actor that polls every registered device at a fixed interval
pub struct PollerActor {
    devices: Vec<Device>,
    client: Arc<dyn MetricClient>,
    snapshots: SnapshotStore,
    history: HistoryLedger,
    concurrency_limit: usize,
    interval_duration: Duration,
    command_rx: mpsc::Receiver<PollerCommand>,
}

impl PollerActor {
    pub fn new(
        devices: Vec<Device>,
        client: Arc<dyn MetricClient>,
        snapshots: SnapshotStore,
        history: HistoryLedger,
        config: &PollerConfig,
        command_rx: mpsc::Receiver<PollerCommand>,
    ) -> Self {
        Self {
            devices,
            client,
            snapshots,
            history,
            concurrency_limit: config.concurrency_limit,
            interval_duration: Duration::from_secs(config.interval),
            command_rx,
        }
    }

    /// Run the actor's main loop until shutdown.
    #[instrument(skip(self), fields(devices = self.devices.len()))]
    pub async fn run(mut self) {
        debug!(
            "starting poller: {} devices, interval {:?}, limit {}",
            self.devices.len(),
            self.interval_duration,
            self.concurrency_limit
        );

        let mut ticker = interval(self.interval_duration);
        // an overrunning round delays the next one instead of
        // triggering a burst of back-to-back rounds
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_round().await {
                        error!("polling round failed: {:#}", e);
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        PollerCommand::PollNow { respond_to } => {
                            debug!("received PollNow command");
                            let result = self.run_round().await;
                            let _ = respond_to.send(result);
                        }

                        PollerCommand::Shutdown => {
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

        debug!("poller stopped");
    }

    /// Execute one polling round over all devices.
    ///
    /// Fan-out is bounded by the concurrency limit; the method returns
    /// only after every device's query has resolved and its results
    /// have been persisted (or the persistence failure logged).
    #[instrument(skip(self))]
    async fn run_round(&self) -> Result<()> {
        let round_ts = Utc::now();
        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let mut queries = JoinSet::new();

        for device in self.devices.iter().cloned() {
            let semaphore = semaphore.clone();
            let client = self.client.clone();

            queries.spawn(async move {
                // never closed, so acquisition cannot fail
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore closed");

                let cpu_percent = match client.get_cpu_percent(&device).await {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!("ip={} query failed: {e}", device.ip);
                        None
                    }
                };

                Sample {
                    timestamp_utc: round_ts,
                    ip: device.ip,
                    cpu_percent,
                }
            });
        }

        let mut samples = Vec::with_capacity(self.devices.len());
        while let Some(joined) = queries.join_next().await {
            match joined {
                Ok(sample) => samples.push(sample),
                Err(e) => error!("device query task failed: {e}"),
            }
        }

        for sample in &samples {
            match sample.cpu_percent {
                Some(value) => info!("ip={} cpu={value}", sample.ip),
                None => info!("ip={} cpu=UNKNOWN", sample.ip),
            }

            if let Err(e) = self.history.append(sample).await {
                error!("ip={} history append failed: {e}", sample.ip);
            }
            if let Err(e) = self.snapshots.write(sample).await {
                error!("ip={} snapshot write failed: {e}", sample.ip);
            }
        }

        Ok(())
    }
}

/// Handle for controlling a PollerActor
#[derive(Clone)]
pub struct PollerHandle {
    sender: mpsc::Sender<PollerCommand>,
}

impl PollerHandle {
    /// Spawn the poller as a tokio task.
    ///
    /// Returns the handle plus the task's join handle so callers can
    /// wait for the in-flight round to finish after `shutdown`.
    pub fn spawn(
        devices: Vec<Device>,
        client: Arc<dyn MetricClient>,
        snapshots: SnapshotStore,
        history: HistoryLedger,
        config: &PollerConfig,
    ) -> (Self, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let actor = PollerActor::new(devices, client, snapshots, history, config, cmd_rx);
        let task = tokio::spawn(actor.run());

        (Self { sender: cmd_tx }, task)
    }

    /// Trigger an immediate round and wait for it to complete.
    pub async fn poll_now(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PollerCommand::PollNow { respond_to: tx })
            .await
            .context("failed to send PollNow command")?;

        rx.await.context("failed to receive response")??;
        Ok(())
    }

    /// Gracefully shut down the poller.
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(PollerCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
