//! # Contract Events
//!
//! Notifications emitted by successful operations. Failed operations emit
//! nothing: events are staged alongside state changes and committed with
//! them.
//!
//! Every event is also mirrored to `tracing` at append time so operators get
//! a readable trail without subscribing to the log.

use serde::{Deserialize, Serialize};

use crate::access::Capability;
use crate::types::{Address, Amount, RatePerSecond, Timestamp};

/// Everything a contract in this workspace can announce.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Ledger credit moved. `from == None` is a mint (including interest
    /// settlement); `to == None` is a burn.
    Transfer {
        from: Option<Address>,
        to: Option<Address>,
        amount: Amount,
    },
    /// Spending allowance set.
    Approval {
        owner: Address,
        spender: Address,
        amount: Amount,
    },
    /// The global rate was lowered.
    InterestRateSet { new_rate: RatePerSecond },
    /// A capability was granted.
    RoleGranted {
        account: Address,
        capability: Capability,
    },
    /// A capability was revoked.
    RoleRevoked {
        account: Address,
        capability: Capability,
    },
    /// Ownership changed hands.
    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },
    /// Base asset deposited into the vault for ledger credit.
    Deposit { user: Address, amount: Amount },
    /// Ledger credit redeemed for base asset.
    Redeem { user: Address, amount: Amount },
    /// Credit burned on this chain for delivery to another.
    LockedOrBurned {
        holder: Address,
        dest_chain: u64,
        amount: Amount,
        user_interest_rate: RatePerSecond,
    },
    /// Credit minted on this chain from another chain.
    ReleasedOrMinted {
        receiver: Address,
        source_chain: u64,
        amount: Amount,
        user_interest_rate: RatePerSecond,
    },
    /// A remote chain was enabled or disabled on the bridge pool.
    ChainUpdated { chain_selector: u64, enabled: bool },
}

/// An event plus where and when it was emitted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Emitting contract.
    pub emitter: Address,
    /// Host time of the emitting call.
    pub at: Timestamp,
    /// The event itself.
    pub event: Event,
}

/// Append-only event log owned by one contract.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a batch of events emitted by one call.
    pub fn extend(&mut self, emitter: &Address, at: Timestamp, events: Vec<Event>) {
        for event in events {
            tracing::debug!(emitter = %emitter, at, ?event, "event");
            self.records.push(EventRecord {
                emitter: emitter.clone(),
                at,
                event,
            });
        }
    }

    /// Appends a single event.
    pub fn push(&mut self, emitter: &Address, at: Timestamp, event: Event) {
        self.extend(emitter, at, vec![event]);
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// The most recent record, if any.
    pub fn last(&self) -> Option<&EventRecord> {
        self.records.last()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// `true` if nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Removes and returns every record.
    pub fn drain(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.records)
    }
}
