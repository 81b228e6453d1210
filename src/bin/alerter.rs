use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};
use vigil::{
    alerter::AlerterHandle,
    config::{Alert, read_config_file},
    notify::{Notifier, WebhookNotifier},
    store::{SnapshotStore, StateStore},
};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,
}

fn init() {
    dotenv::dotenv().ok();

    let filter = filter::Targets::new().with_targets(vec![
        ("vigil", LevelFilter::TRACE),
        ("vigil_alerter", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?;

    // the poller owns the snapshot directory; starting without it
    // would only log an enumeration error every cycle
    let snapshots = SnapshotStore::new(&config.snapshot_dir);
    snapshots.require_dir().await.with_context(|| {
        format!(
            "snapshot directory {} is not accessible",
            config.snapshot_dir.display()
        )
    })?;

    let states = StateStore::new(&config.state_dir);
    states.ensure_dir().await?;

    let notifier: Option<Arc<dyn Notifier>> = config.alert.as_ref().map(|alert| match alert {
        Alert::Webhook(webhook) => {
            Arc::new(WebhookNotifier::new(webhook.clone())) as Arc<dyn Notifier>
        }
    });

    if notifier.is_none() {
        info!("no alert target configured, actions will be log-only");
    }

    info!(
        "threshold={} cooldown={}s interval={}s",
        config.alerter.threshold, config.alerter.cooldown, config.alerter.interval
    );
    info!("latest_dir={}", config.snapshot_dir.display());
    info!("state_dir={}", config.state_dir.display());

    let (handle, task) = AlerterHandle::spawn(snapshots, states, notifier, &config.alerter);

    tokio::signal::ctrl_c().await?;
    debug!("shutdown signal received");

    handle.shutdown().await?;
    task.await?;

    Ok(())
}
