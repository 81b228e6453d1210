//! SNMP metric client
//!
//! The poller talks to devices through the [`MetricClient`] trait so
//! tests can substitute an instrumented double. The production
//! implementation wraps `csnmp`'s async SNMP2c client: one GET per
//! device per round, with a bounded number of retries.
//!
//! Every failure kind collapses to an absent sample value downstream;
//! the [`QueryFailure`] variants exist for log lines only and never
//! reach alerting logic.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use csnmp::{ObjectIdentifier, ObjectValue, Snmp2cClient};
use tracing::{instrument, trace};

use crate::config::SnmpConfig;
use crate::registry::Device;

/// Why a single device query produced no value.
#[derive(Debug)]
pub enum QueryFailure {
    /// The configured OID does not parse
    BadOid(String),

    /// The UDP socket could not be set up
    Transport(String),

    /// The SNMP exchange itself failed (timeout, error-status, ...)
    Snmp(String),

    /// The agent answered with something that is not an integer
    NonNumeric(String),
}

impl fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryFailure::BadOid(oid) => write!(f, "invalid OID: {oid}"),
            QueryFailure::Transport(msg) => write!(f, "transport setup failed: {msg}"),
            QueryFailure::Snmp(msg) => write!(f, "SNMP query failed: {msg}"),
            QueryFailure::NonNumeric(value) => {
                write!(f, "non-numeric SNMP response: {value}")
            }
        }
    }
}

impl std::error::Error for QueryFailure {}

/// One SNMP GET against one device/OID pair.
#[async_trait]
pub trait MetricClient: Send + Sync {
    async fn get_cpu_percent(&self, device: &Device) -> Result<i64, QueryFailure>;
}

/// Production client querying devices over SNMP2c.
#[derive(Debug, Clone)]
pub struct SnmpClient {
    community: Vec<u8>,
    timeout: Duration,
    retries: usize,
}

impl SnmpClient {
    pub fn new(config: &SnmpConfig) -> Self {
        Self {
            community: config.community.as_bytes().to_vec(),
            timeout: Duration::from_secs(config.timeout),
            retries: config.retries,
        }
    }

    async fn query_once(&self, device: &Device, oid: ObjectIdentifier) -> Result<i64, QueryFailure> {
        let target = SocketAddr::new(device.ip, 161);

        let client = Snmp2cClient::new(
            target,
            self.community.clone(),
            None,
            Some(self.timeout),
            0,
        )
        .await
        .map_err(|e| QueryFailure::Transport(e.to_string()))?;

        let value = client
            .get(oid)
            .await
            .map_err(|e| QueryFailure::Snmp(e.to_string()))?;

        numeric_value(value)
    }
}

/// Narrow an SNMP response to a plain integer reading.
fn numeric_value(value: ObjectValue) -> Result<i64, QueryFailure> {
    match value {
        ObjectValue::Integer(v) => Ok(v as i64),
        ObjectValue::Counter32(v) => Ok(v as i64),
        ObjectValue::Unsigned32(v) => Ok(v as i64),
        ObjectValue::TimeTicks(v) => Ok(v as i64),
        // a counter past i64::MAX must not wrap into a bogus reading
        ObjectValue::Counter64(v) => i64::try_from(v)
            .map_err(|_| QueryFailure::NonNumeric(format!("counter64 {v} out of range"))),
        other => Err(QueryFailure::NonNumeric(format!("{other:?}"))),
    }
}

#[async_trait]
impl MetricClient for SnmpClient {
    #[instrument(skip(self), fields(ip = %device.ip))]
    async fn get_cpu_percent(&self, device: &Device) -> Result<i64, QueryFailure> {
        let oid: ObjectIdentifier = device
            .cpu_oid
            .parse()
            .map_err(|_| QueryFailure::BadOid(device.cpu_oid.clone()))?;

        let mut last_failure = None;
        for attempt in 0..=self.retries {
            match self.query_once(device, oid).await {
                Ok(value) => {
                    trace!("got cpu={value} on attempt {attempt}");
                    return Ok(value);
                }
                Err(e) => {
                    trace!("attempt {attempt} failed: {e}");
                    last_failure = Some(e);
                }
            }
        }

        // retries >= 0 guarantees at least one attempt ran
        Err(last_failure.expect("at least one SNMP attempt"))
    }
}
