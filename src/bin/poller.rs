use std::sync::Arc;

use clap::Parser;
use tracing::{debug, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};
use vigil::{
    client::SnmpClient,
    config::read_config_file,
    poller::PollerHandle,
    registry::load_devices,
    store::{HistoryLedger, SnapshotStore},
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
        ("vigil_poller", LevelFilter::TRACE),
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

    // registry or storage problems at startup are fatal
    let devices = load_devices(&config.devices_file, &config.snmp.default_cpu_oid)?;

    let snapshots = SnapshotStore::new(&config.snapshot_dir);
    snapshots.ensure_dir().await?;
    let history = HistoryLedger::new(&config.history_file);

    info!(
        "devices={} interval={}s limit={}",
        devices.len(),
        config.poller.interval,
        config.poller.concurrency_limit
    );
    info!("csv={}", config.history_file.display());
    info!("latest_dir={}", config.snapshot_dir.display());

    let client = Arc::new(SnmpClient::new(&config.snmp));
    let (handle, task) = PollerHandle::spawn(devices, client, snapshots, history, &config.poller);

    tokio::signal::ctrl_c().await?;
    debug!("shutdown signal received");

    handle.shutdown().await?;
    task.await?;

    Ok(())
}
