//! Durable filesystem state shared between the poller and the alerter
//!
//! Three stores, each with exactly one writer:
//!
//! - [`SnapshotStore`]: latest sample per device, written by the poller
//!   and read by the alerter. This directory is the inter-process
//!   boundary between the two daemons.
//! - [`StateStore`]: alarm bookkeeping per device, private to the
//!   alerter.
//! - [`HistoryLedger`]: append-only CSV of every sample ever taken.
//!
//! JSON documents are replaced via write-to-temp-then-rename, so a
//! reader never observes a half-written document and no cross-process
//! locking is needed.

pub mod atomic;
pub mod error;
pub mod history;
pub mod snapshot;
pub mod state;

pub use error::{StoreError, StoreResult};
pub use history::HistoryLedger;
pub use snapshot::SnapshotStore;
pub use state::StateStore;
