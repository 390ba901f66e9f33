//! # Rebase Token Pool
//!
//! The on-chain end of a cross-chain transfer. A messaging layer (out of
//! scope here: encoding, relay, fees, rate limits) drives two calls:
//!
//! ```text
//! source chain       lock_or_burn    -> burn credit, emit BridgeMessage
//! destination chain  release_or_mint -> mint credit at the message's rate
//! ```
//!
//! The message carries the holder's locked rate, and the destination mints
//! with [`RebaseToken::mint_with_rate`], so a favourable historic rate
//! survives the hop even if the destination's global rate is lower. The
//! two legs settle on independent clocks; interest for the in-flight time
//! is not carried over.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rebase_protocol::access::{AccessControl, AccessError, Capability, Ownable, RoleSet};
use rebase_protocol::events::{Event, EventLog, EventRecord};
use rebase_protocol::runtime::CallContext;
use rebase_protocol::{Address, Amount, RatePerSecond};

use crate::rebase_token::{RebaseToken, TokenError};

/// Errors that can occur during pool operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The remote chain is not enabled on this pool.
    #[error("unsupported chain selector {0}")]
    UnsupportedChain(u64),

    /// A message addressed to another chain was delivered here.
    #[error("message for chain {actual} delivered to chain {expected}")]
    WrongDestination {
        /// This pool's chain selector.
        expected: u64,
        /// The message's destination.
        actual: u64,
    },

    /// The pool is bound to a different ledger.
    #[error("pool is bound to ledger {expected}, got {actual}")]
    WrongLedger {
        /// The bound ledger.
        expected: Address,
        /// The ledger passed in.
        actual: Address,
    },

    /// The caller lacks the required capability.
    #[error(transparent)]
    Unauthorized(#[from] AccessError),

    /// The ledger refused the burn or mint.
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Payload handed to the messaging layer by [`RebaseTokenPool::lock_or_burn`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeMessage {
    /// Selector of the chain the credit left.
    pub source_chain: u64,
    /// Selector of the chain that should mint it.
    pub dest_chain: u64,
    /// Holder on the source chain.
    pub sender: Address,
    /// Recipient on the destination chain.
    pub receiver: Address,
    /// Burned amount.
    pub amount: Amount,
    /// The sender's locked rate at burn time.
    pub user_interest_rate: RatePerSecond,
}

/// Bridge adapter for one ledger on one chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebaseTokenPool {
    address: Address,
    token: Address,
    chain_selector: u64,
    ownable: Ownable,
    relayers: RoleSet,
    remote_chains: BTreeSet<u64>,
    #[serde(skip)]
    events: EventLog,
}

impl RebaseTokenPool {
    /// Deploys a pool for the ledger at `token` on chain `chain_selector`.
    /// The owner starts out as the only relayer.
    pub fn new(
        address: impl Into<Address>,
        token: Address,
        owner: Address,
        chain_selector: u64,
    ) -> Self {
        let mut relayers = RoleSet::new(Capability::Relay);
        relayers.grant(owner.clone());
        Self {
            address: address.into(),
            token,
            chain_selector,
            ownable: Ownable::new(owner),
            relayers,
            remote_chains: BTreeSet::new(),
            events: EventLog::new(),
        }
    }

    /// The pool's address. Needs the ledger's mint-and-burn capability.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// This chain's selector.
    pub fn chain_selector(&self) -> u64 {
        self.chain_selector
    }

    /// Events committed so far.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Takes every event emitted so far.
    pub fn take_events(&mut self) -> Vec<EventRecord> {
        self.events.drain()
    }

    /// `true` if `chain_selector` is enabled.
    pub fn is_supported_chain(&self, chain_selector: u64) -> bool {
        self.remote_chains.contains(&chain_selector)
    }

    /// Enabled remote chains in ascending order.
    pub fn supported_chains(&self) -> impl Iterator<Item = u64> + '_ {
        self.remote_chains.iter().copied()
    }

    /// Enables and disables remote chains. Owner only. Removals are applied
    /// after additions.
    pub fn apply_chain_updates(
        &mut self,
        ctx: &CallContext,
        add: &[u64],
        remove: &[u64],
    ) -> Result<(), PoolError> {
        self.ownable.require_capability(&ctx.caller, Capability::Owner)?;
        let mut events = Vec::new();
        for selector in add {
            if self.remote_chains.insert(*selector) {
                events.push(Event::ChainUpdated {
                    chain_selector: *selector,
                    enabled: true,
                });
            }
        }
        for selector in remove {
            if self.remote_chains.remove(selector) {
                events.push(Event::ChainUpdated {
                    chain_selector: *selector,
                    enabled: false,
                });
            }
        }
        self.events.extend(&self.address, ctx.now, events);
        Ok(())
    }

    /// Grants the relay capability. Owner only.
    pub fn grant_relayer(&mut self, ctx: &CallContext, relayer: &Address) -> Result<bool, PoolError> {
        self.ownable.require_capability(&ctx.caller, Capability::Owner)?;
        let granted = self.relayers.grant(relayer.clone());
        if granted {
            self.events.push(
                &self.address,
                ctx.now,
                Event::RoleGranted {
                    account: relayer.clone(),
                    capability: Capability::Relay,
                },
            );
        }
        Ok(granted)
    }

    fn check_ledger(&self, token: &RebaseToken) -> Result<(), PoolError> {
        if token.address() != &self.token {
            return Err(PoolError::WrongLedger {
                expected: self.token.clone(),
                actual: token.address().clone(),
            });
        }
        Ok(())
    }

    /// Burns `amount` of the caller's credit and returns the message the
    /// messaging layer must deliver to `dest_chain`.
    ///
    /// [`FULL_BALANCE`](rebase_protocol::config::FULL_BALANCE) sends the
    /// caller's entire settled balance.
    pub fn lock_or_burn(
        &mut self,
        ctx: &CallContext,
        token: &mut RebaseToken,
        receiver: &Address,
        dest_chain: u64,
        amount: Amount,
    ) -> Result<BridgeMessage, PoolError> {
        self.check_ledger(token)?;
        if !self.is_supported_chain(dest_chain) {
            return Err(PoolError::UnsupportedChain(dest_chain));
        }

        let holder = &ctx.caller;
        let user_interest_rate = token.user_interest_rate(holder);
        let amount = token.burn(&ctx.nested(&self.address), holder, amount)?;

        self.events.push(
            &self.address,
            ctx.now,
            Event::LockedOrBurned {
                holder: holder.clone(),
                dest_chain,
                amount,
                user_interest_rate,
            },
        );
        tracing::info!(holder = %holder, dest_chain, amount, user_interest_rate, "locked or burned");

        Ok(BridgeMessage {
            source_chain: self.chain_selector,
            dest_chain,
            sender: holder.clone(),
            receiver: receiver.clone(),
            amount,
            user_interest_rate,
        })
    }

    /// Mints a delivered message's amount to its receiver at the rate the
    /// message carries. Relayers only.
    pub fn release_or_mint(
        &mut self,
        ctx: &CallContext,
        token: &mut RebaseToken,
        message: &BridgeMessage,
    ) -> Result<Amount, PoolError> {
        self.relayers.require_capability(&ctx.caller, Capability::Relay)?;
        self.check_ledger(token)?;
        if message.dest_chain != self.chain_selector {
            return Err(PoolError::WrongDestination {
                expected: self.chain_selector,
                actual: message.dest_chain,
            });
        }
        if !self.is_supported_chain(message.source_chain) {
            return Err(PoolError::UnsupportedChain(message.source_chain));
        }

        token.mint_with_rate(
            &ctx.nested(&self.address),
            &message.receiver,
            message.amount,
            message.user_interest_rate,
        )?;

        self.events.push(
            &self.address,
            ctx.now,
            Event::ReleasedOrMinted {
                receiver: message.receiver.clone(),
                source_chain: message.source_chain,
                amount: message.amount,
                user_interest_rate: message.user_interest_rate,
            },
        );
        tracing::info!(
            receiver = %message.receiver,
            source_chain = message.source_chain,
            amount = message.amount,
            "released or minted"
        );
        Ok(message.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rebase_protocol::config::{LedgerConfig, FULL_BALANCE};

    fn setup(selector: u64) -> (RebaseTokenPool, RebaseToken) {
        let owner = CallContext::new("owner", 0);
        let mut token = RebaseToken::new("token", "owner".into(), &LedgerConfig::default());
        let mut pool = RebaseTokenPool::new("pool", token.address().clone(), "owner".into(), selector);
        token.grant_mint_and_burn_role(&owner, pool.address()).unwrap();
        pool.apply_chain_updates(&owner, &[1, 2], &[]).unwrap();
        (pool, token)
    }

    #[test]
    fn chain_updates_are_owner_gated() {
        let (mut pool, _) = setup(1);
        assert!(pool
            .apply_chain_updates(&CallContext::new("mallory", 0), &[9], &[])
            .is_err());
        pool.apply_chain_updates(&CallContext::new("owner", 0), &[], &[2])
            .unwrap();
        assert_eq!(pool.supported_chains().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn lock_to_unknown_chain_rejected() {
        let (mut pool, mut token) = setup(1);
        let err = pool
            .lock_or_burn(&CallContext::new("alice", 0), &mut token, &"alice".into(), 77, 1)
            .unwrap_err();
        assert_eq!(err, PoolError::UnsupportedChain(77));
    }

    #[test]
    fn full_balance_lock_burns_settled_balance() {
        let (mut pool, mut token) = setup(1);
        let alice = Address::from("alice");
        token
            .mint(&CallContext::new("pool", 0), &alice, 100_000)
            .unwrap();

        let message = pool
            .lock_or_burn(&CallContext::new("alice", 3_600), &mut token, &alice, 2, FULL_BALANCE)
            .unwrap();
        assert_eq!(message.amount, 100_018);
        assert_eq!(token.principal_balance_of(&alice), 0);
        assert_eq!(token.total_supply(), 0);
    }

    #[test]
    fn release_requires_relayer() {
        let (mut pool, mut token) = setup(2);
        let message = BridgeMessage {
            source_chain: 1,
            dest_chain: 2,
            sender: "alice".into(),
            receiver: "alice".into(),
            amount: 10,
            user_interest_rate: 7,
        };
        assert!(matches!(
            pool.release_or_mint(&CallContext::new("mallory", 0), &mut token, &message),
            Err(PoolError::Unauthorized(_))
        ));
        pool.release_or_mint(&CallContext::new("owner", 0), &mut token, &message)
            .unwrap();
        assert_eq!(token.user_interest_rate(&"alice".into()), 7);
        assert_eq!(token.principal_balance_of(&"alice".into()), 10);
    }

    #[test]
    fn misrouted_message_rejected() {
        let (mut pool, mut token) = setup(2);
        let message = BridgeMessage {
            source_chain: 1,
            dest_chain: 3,
            sender: "alice".into(),
            receiver: "alice".into(),
            amount: 10,
            user_interest_rate: 7,
        };
        assert_eq!(
            pool.release_or_mint(&CallContext::new("owner", 0), &mut token, &message),
            Err(PoolError::WrongDestination {
                expected: 2,
                actual: 3
            })
        );
    }
}
