use std::path::PathBuf;

use tracing::trace;

/// Cisco CPU 5-second average, the original deployment's default OID.
pub const DEFAULT_CPU_OID: &str = "1.3.6.1.4.1.9.2.1.56.0";

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Device registry file (JSON list of devices)
    #[serde(default = "default_devices_file")]
    pub devices_file: PathBuf,

    /// Append-only CPU history ledger
    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,

    /// Directory of per-device latest snapshots (written by the poller)
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,

    /// Directory of per-device alarm state (owned by the alerter)
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    #[serde(default)]
    pub snmp: SnmpConfig,

    #[serde(default)]
    pub poller: PollerConfig,

    #[serde(default)]
    pub alerter: AlerterConfig,

    /// Where notifications go; without it, actions are log-only
    pub alert: Option<Alert>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SnmpConfig {
    #[serde(default = "default_community")]
    pub community: String,

    /// Fallback OID for devices without an explicit `cpu_oid`
    #[serde(default = "default_cpu_oid")]
    pub default_cpu_oid: String,

    /// Per-query timeout in seconds
    #[serde(default = "default_snmp_timeout")]
    pub timeout: u64,

    /// Additional attempts after the first failed query
    #[serde(default = "default_snmp_retries")]
    pub retries: usize,
}

impl Default for SnmpConfig {
    fn default() -> Self {
        SnmpConfig {
            community: default_community(),
            default_cpu_oid: default_cpu_oid(),
            timeout: default_snmp_timeout(),
            retries: default_snmp_retries(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct PollerConfig {
    /// Seconds between polling rounds
    #[serde(default = "default_poll_interval")]
    pub interval: u64,

    /// Maximum SNMP queries in flight at once
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        PollerConfig {
            interval: default_poll_interval(),
            concurrency_limit: default_concurrency_limit(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct AlerterConfig {
    /// Seconds between evaluation cycles
    #[serde(default = "default_eval_interval")]
    pub interval: u64,

    /// CPU percentage at or above which a device is HIGH
    #[serde(default = "default_threshold")]
    pub threshold: i64,

    /// Seconds between repeated notifications while a device stays HIGH
    #[serde(default = "default_cooldown")]
    pub cooldown: u64,
}

impl Default for AlerterConfig {
    fn default() -> Self {
        AlerterConfig {
            interval: default_eval_interval(),
            threshold: default_threshold(),
            cooldown: default_cooldown(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alert {
    Webhook(Webhook),
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Webhook {
    pub url: String,
}

fn default_devices_file() -> PathBuf {
    PathBuf::from("./shared/devices.json")
}

fn default_history_file() -> PathBuf {
    PathBuf::from("./shared/cpu.csv")
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("./shared/latest")
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("./shared/state")
}

fn default_community() -> String {
    String::from("public")
}

fn default_cpu_oid() -> String {
    String::from(DEFAULT_CPU_OID)
}

fn default_snmp_timeout() -> u64 {
    2
}

fn default_snmp_retries() -> usize {
    1
}

fn default_poll_interval() -> u64 {
    30
}

fn default_concurrency_limit() -> usize {
    50
}

fn default_eval_interval() -> u64 {
    40
}

fn default_threshold() -> i64 {
    80
}

fn default_cooldown() -> u64 {
    60 * 60
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
