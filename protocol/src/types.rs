//! # Core Types
//!
//! Addresses and the numeric aliases every other module speaks in. Amounts
//! and rates are plain `u128`s; timestamps are unix seconds. Nothing here
//! ever touches floating point.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Token amount in the smallest unit.
pub type Amount = u128;

/// Growth per second, scaled by [`crate::config::PRECISION_FACTOR`].
pub type RatePerSecond = u128;

/// Unix timestamp in seconds, supplied by the host for every call.
pub type Timestamp = u64;

/// Identifier of an account or contract on a chain.
///
/// Addresses are opaque strings. The ledger never parses them; it only
/// compares and orders them, so `BTreeMap` iteration over holders is
/// deterministic across runs.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Wraps a raw address string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for Address {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}
