//! # Access Control
//!
//! Two independent capability checkers, composed by the contracts that need
//! them rather than inherited:
//!
//! - [`Ownable`]: a single, transferable owner. Gates rate changes and role
//!   administration.
//! - [`RoleSet`]: a set of accounts holding one capability. The ledger uses
//!   one for [`Capability::MintAndBurn`].
//!
//! Both implement [`AccessControl`], so a contract only ever asks
//! "does `caller` hold `capability`?" and never how it was granted.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Address;

/// A named permission checked at a gated entry point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Contract owner.
    Owner,
    /// May mint and burn ledger credit on behalf of any holder.
    MintAndBurn,
    /// May deliver inbound cross-chain messages to a bridge pool.
    Relay,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Owner => write!(f, "owner"),
            Capability::MintAndBurn => write!(f, "mint-and-burn"),
            Capability::Relay => write!(f, "relay"),
        }
    }
}

/// Authorization failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The caller lacks the capability the entry point requires.
    #[error("unauthorized: {account} lacks the {capability} capability")]
    Unauthorized {
        /// The rejected caller.
        account: Address,
        /// The capability that was required.
        capability: Capability,
    },
}

/// Capability lookup, implemented by every checker.
pub trait AccessControl {
    /// Returns `true` if `account` holds `capability`.
    fn has_capability(&self, account: &Address, capability: Capability) -> bool;

    /// Fails with [`AccessError::Unauthorized`] unless `account` holds
    /// `capability`.
    fn require_capability(
        &self,
        account: &Address,
        capability: Capability,
    ) -> Result<(), AccessError> {
        if self.has_capability(account, capability) {
            Ok(())
        } else {
            Err(AccessError::Unauthorized {
                account: account.clone(),
                capability,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Ownable
// ---------------------------------------------------------------------------

/// Single-owner checker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownable {
    owner: Address,
}

impl Ownable {
    /// Creates a checker owned by `owner`.
    pub fn new(owner: Address) -> Self {
        Self { owner }
    }

    /// Current owner.
    pub fn owner(&self) -> &Address {
        &self.owner
    }

    /// Hands ownership to `new_owner`. Only the current owner may call this.
    ///
    /// Returns the previous owner.
    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: Address,
    ) -> Result<Address, AccessError> {
        self.require_capability(caller, Capability::Owner)?;
        Ok(std::mem::replace(&mut self.owner, new_owner))
    }
}

impl AccessControl for Ownable {
    fn has_capability(&self, account: &Address, capability: Capability) -> bool {
        capability == Capability::Owner && &self.owner == account
    }
}

// ---------------------------------------------------------------------------
// RoleSet
// ---------------------------------------------------------------------------

/// Set of accounts holding one capability.
///
/// Membership changes are not gated here; the owning contract checks its
/// [`Ownable`] before calling [`grant`](Self::grant) or
/// [`revoke`](Self::revoke).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSet {
    capability: Capability,
    members: BTreeSet<Address>,
}

impl RoleSet {
    /// Creates an empty set for `capability`.
    pub fn new(capability: Capability) -> Self {
        Self {
            capability,
            members: BTreeSet::new(),
        }
    }

    /// The capability this set confers.
    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Adds `account`. Returns `false` if it was already a member.
    pub fn grant(&mut self, account: Address) -> bool {
        self.members.insert(account)
    }

    /// Removes `account`. Returns `false` if it was not a member.
    pub fn revoke(&mut self, account: &Address) -> bool {
        self.members.remove(account)
    }

    /// Members in address order.
    pub fn members(&self) -> impl Iterator<Item = &Address> {
        self.members.iter()
    }
}

impl AccessControl for RoleSet {
    fn has_capability(&self, account: &Address, capability: Capability) -> bool {
        capability == self.capability && self.members.contains(account)
    }
}
