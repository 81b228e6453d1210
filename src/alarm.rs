//! Per-device alarm state machine
//!
//! ## Decision table
//!
//! ```text
//! UNKNOWN                          → log only, alarm_active untouched
//! HIGH, alarm inactive             → ALERT, alarm_active = true
//! HIGH, alarm active, cooldown up  → REMINDER, refresh last_alert_ts
//! HIGH, alarm active, in cooldown  → nothing
//! OK,   alarm active               → RECOVERY, alarm_active = false
//! OK,   alarm inactive             → nothing
//! ```
//!
//! `status` and `updated_ts` are refreshed on every observation;
//! `alarm_active` and `last_alert_ts` move only on the transitions
//! above. UNKNOWN is the one status that never touches the alarm axis,
//! so a flapping SNMP agent cannot silently clear an active alarm.

use std::net::IpAddr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Categorical reading of a sample against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    High,
    Unknown,
}

impl Status {
    pub fn from_value(cpu_percent: Option<i64>, threshold: i64) -> Status {
        match cpu_percent {
            None => Status::Unknown,
            Some(value) if value >= threshold => Status::High,
            Some(_) => Status::Ok,
        }
    }
}

/// Notification-worthy transition produced by an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmAction {
    Alert,
    Reminder,
    Recovery,
}

impl AlarmAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmAction::Alert => "ALERT",
            AlarmAction::Reminder => "REMINDER",
            AlarmAction::Recovery => "RECOVERY",
        }
    }
}

/// Persisted alarm bookkeeping for one device.
///
/// Owned exclusively by the alerter; the poller never reads or writes
/// it. Survives restarts via the state store and is created lazily on
/// first observation of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmState {
    pub ip: IpAddr,
    pub status: Status,
    pub alarm_active: bool,
    pub last_alert_ts: Option<DateTime<Utc>>,
    pub updated_ts: DateTime<Utc>,
}

impl AlarmState {
    pub fn new(ip: IpAddr, now: DateTime<Utc>) -> Self {
        Self {
            ip,
            status: Status::Ok,
            alarm_active: false,
            last_alert_ts: None,
            updated_ts: now,
        }
    }

    /// Advance the state machine by one observation.
    ///
    /// Returns the action to notify about, if any. The state is updated
    /// in place and must be persisted by the caller regardless of the
    /// returned action.
    pub fn observe(
        &mut self,
        status: Status,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Option<AlarmAction> {
        self.updated_ts = now;
        self.status = status;

        match status {
            Status::Unknown => None,

            Status::High => {
                if !self.alarm_active {
                    self.alarm_active = true;
                    self.last_alert_ts = Some(now);
                    return Some(AlarmAction::Alert);
                }

                let cooled_down = match self.last_alert_ts {
                    None => true,
                    Some(last) => now - last >= cooldown,
                };

                if cooled_down {
                    self.last_alert_ts = Some(now);
                    Some(AlarmAction::Reminder)
                } else {
                    None
                }
            }

            Status::Ok => {
                if self.alarm_active {
                    self.alarm_active = false;
                    self.last_alert_ts = Some(now);
                    Some(AlarmAction::Recovery)
                } else {
                    None
                }
            }
        }
    }
}
