//! # Host Execution Context
//!
//! The host serializes calls: one operation runs to completion, including
//! every settlement it triggers, before the next one starts. Each call sees
//! a single [`CallContext`] whose `now` is fixed for the whole call, which is
//! what lets a transfer settle sender and recipient independently.
//!
//! Time comes from a [`Clock`]. Production uses [`SystemClock`]; tests and
//! the simulator drive a [`ManualClock`].

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount, Timestamp};

/// Per-call environment supplied by the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// The account invoking the operation.
    pub caller: Address,
    /// Host time for this call, constant for its whole duration.
    pub now: Timestamp,
    /// Base-asset value attached to the call (zero for plain calls).
    pub value: Amount,
}

impl CallContext {
    /// Context for a call carrying no value.
    pub fn new(caller: impl Into<Address>, now: Timestamp) -> Self {
        Self {
            caller: caller.into(),
            now,
            value: 0,
        }
    }

    /// Attaches base-asset value to the call.
    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }

    /// Context for a nested call made by contract `caller` within this call.
    /// Time is inherited; value is not forwarded.
    pub fn nested(&self, caller: &Address) -> Self {
        Self {
            caller: caller.clone(),
            now: self.now,
            value: 0,
        }
    }
}

/// Source of host time.
pub trait Clock: Send + Sync {
    /// Current unix time in seconds.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time via `chrono`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // Pre-1970 clocks are not a thing we support.
        Utc::now().timestamp().max(0) as Timestamp
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Starts at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Moves time forward by `seconds`.
    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }

    /// Jumps to `timestamp`.
    pub fn set(&self, timestamp: Timestamp) {
        self.now.store(timestamp, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
