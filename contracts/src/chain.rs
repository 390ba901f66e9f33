//! # Host Chain
//!
//! Binds one ledger, its vault, its bridge pool and the native bank into a
//! single state object and runs every call as a transaction against it.
//!
//! [`Chain::transact`] snapshots the state before the call and restores it
//! if the call fails. That is what makes a vault redeem whose payout is
//! rejected leave the holder's balance untouched: the burn is already
//! applied when the bank refuses, and the snapshot puts it back.
//!
//! ## Deployment
//!
//! [`Chain::deploy`] performs the usual wiring in one go:
//!
//! 1. deploy the ledger, owned by `owner`
//! 2. deploy the vault bound to it
//! 3. deploy the bridge pool for this chain's selector
//! 4. grant both the mint-and-burn capability

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rebase_protocol::access::AccessError;
use rebase_protocol::bank::{BankError, NativeBank};
use rebase_protocol::config::{LedgerConfig, POOL_ADDRESS, TOKEN_ADDRESS, VAULT_ADDRESS};
use rebase_protocol::events::EventRecord;
use rebase_protocol::runtime::{CallContext, Clock};
use rebase_protocol::{Address, Amount, RatePerSecond, Timestamp};

use crate::rebase_token::{RebaseToken, TokenError};
use crate::token_pool::{BridgeMessage, PoolError, RebaseTokenPool};
use crate::vault::{Vault, VaultError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Any failure surfaced by a host transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Bank(#[from] BankError),

    #[error(transparent)]
    Access(#[from] AccessError),
}

impl ChainError {
    /// `true` if the call was rejected for lack of a capability, at any
    /// layer.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            ChainError::Access(_)
                | ChainError::Token(TokenError::Unauthorized(_))
                | ChainError::Vault(VaultError::Token(TokenError::Unauthorized(_)))
                | ChainError::Pool(PoolError::Unauthorized(_))
                | ChainError::Pool(PoolError::Token(TokenError::Unauthorized(_)))
        )
    }
}

// ---------------------------------------------------------------------------
// ChainState
// ---------------------------------------------------------------------------

/// Everything a transaction may touch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainState {
    /// The interest-accruing ledger.
    pub token: RebaseToken,
    /// Base-asset custodian.
    pub vault: Vault,
    /// Cross-chain adapter.
    pub pool: RebaseTokenPool,
    /// Native base-asset balances.
    pub bank: NativeBank,
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// A single-threaded host executing calls one at a time.
pub struct Chain {
    state: ChainState,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("now", &self.clock.now())
            .field("state", &self.state)
            .finish()
    }
}

impl Chain {
    /// Deploys and wires the ledger, vault and pool.
    pub fn deploy(
        config: &LedgerConfig,
        owner: Address,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ChainError> {
        let now = clock.now();
        let mut token = RebaseToken::new(TOKEN_ADDRESS, owner.clone(), config);
        let vault = Vault::new(VAULT_ADDRESS, token.address().clone());
        let pool = RebaseTokenPool::new(
            POOL_ADDRESS,
            token.address().clone(),
            owner.clone(),
            config.chain_selector,
        );

        let ctx = CallContext::new(owner.clone(), now);
        token.grant_mint_and_burn_role(&ctx, vault.address())?;
        token.grant_mint_and_burn_role(&ctx, pool.address())?;

        tracing::info!(
            owner = %owner,
            token = %token.address(),
            vault = %vault.address(),
            pool = %pool.address(),
            chain_selector = config.chain_selector,
            rate = token.interest_rate(),
            "rebase ledger deployed"
        );

        Ok(Self {
            state: ChainState {
                token,
                vault,
                pool,
                bank: NativeBank::new(),
            },
            clock,
        })
    }

    /// Resumes a host from previously persisted state.
    pub fn from_state(state: ChainState, clock: Arc<dyn Clock>) -> Self {
        Self { state, clock }
    }

    /// Current host time.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// The full state, read-only.
    pub fn state(&self) -> &ChainState {
        &self.state
    }

    /// Consumes the host, returning its state for persistence.
    pub fn into_state(self) -> ChainState {
        self.state
    }

    /// The ledger, read-only.
    pub fn token(&self) -> &RebaseToken {
        &self.state.token
    }

    /// The vault, read-only.
    pub fn vault(&self) -> &Vault {
        &self.state.vault
    }

    /// The bridge pool, read-only.
    pub fn pool(&self) -> &RebaseTokenPool {
        &self.state.pool
    }

    /// The native bank, read-only.
    pub fn bank(&self) -> &NativeBank {
        &self.state.bank
    }

    /// Direct access to the native bank, for funding accounts and marking
    /// recipients that refuse value. Not a ledger operation.
    pub fn bank_mut(&mut self) -> &mut NativeBank {
        &mut self.state.bank
    }

    /// Runs `f` as one all-or-nothing call by `caller` carrying `value`.
    ///
    /// On error every change `f` made, to any contract or the bank, is
    /// discarded.
    pub fn transact<T, E, F>(&mut self, caller: &Address, value: Amount, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut ChainState, &CallContext) -> Result<T, E>,
        E: fmt::Display,
    {
        let ctx = CallContext::new(caller.clone(), self.clock.now()).with_value(value);
        let snapshot = self.state.clone();
        match f(&mut self.state, &ctx) {
            Ok(out) => Ok(out),
            Err(err) => {
                self.state = snapshot;
                tracing::warn!(caller = %ctx.caller, now = ctx.now, error = %err, "call reverted");
                Err(err)
            }
        }
    }

    /// Drains events from every contract, ordered by time.
    pub fn take_events(&mut self) -> Vec<EventRecord> {
        let mut events = self.state.token.take_events();
        events.extend(self.state.vault.take_events());
        events.extend(self.state.pool.take_events());
        events.sort_by_key(|r| r.at);
        events
    }

    // -- Reads --------------------------------------------------------------

    /// Displayed balance of `holder` right now.
    pub fn balance_of(&self, holder: &Address) -> Amount {
        self.state.token.balance_of(holder, self.clock.now())
    }

    // -- Vault --------------------------------------------------------------

    /// Deposits `value` of base asset for ledger credit.
    pub fn deposit(&mut self, caller: &Address, value: Amount) -> Result<Amount, ChainError> {
        self.transact(caller, value, |s, ctx| {
            Ok(s.vault.deposit(ctx, &mut s.token, &mut s.bank)?)
        })
    }

    /// Redeems ledger credit for base asset.
    pub fn redeem(&mut self, caller: &Address, amount: Amount) -> Result<Amount, ChainError> {
        self.transact(caller, 0, |s, ctx| {
            Ok(s.vault.redeem(ctx, &mut s.token, &mut s.bank, amount)?)
        })
    }

    // -- Ledger -------------------------------------------------------------

    /// `transfer` on the ledger.
    pub fn transfer(
        &mut self,
        caller: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<bool, ChainError> {
        self.transact(caller, 0, |s, ctx| Ok(s.token.transfer(ctx, to, amount)?))
    }

    /// `transfer_from` on the ledger.
    pub fn transfer_from(
        &mut self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<bool, ChainError> {
        self.transact(caller, 0, |s, ctx| {
            Ok(s.token.transfer_from(ctx, from, to, amount)?)
        })
    }

    /// `approve` on the ledger.
    pub fn approve(
        &mut self,
        caller: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<bool, ChainError> {
        self.transact(caller, 0, |s, ctx| {
            Ok::<_, ChainError>(s.token.approve(ctx, spender, amount))
        })
    }

    /// Direct `mint`; the caller must hold the mint-and-burn capability.
    pub fn mint(&mut self, caller: &Address, to: &Address, amount: Amount) -> Result<(), ChainError> {
        self.transact(caller, 0, |s, ctx| Ok(s.token.mint(ctx, to, amount)?))
    }

    /// Direct `burn`; the caller must hold the mint-and-burn capability.
    pub fn burn(
        &mut self,
        caller: &Address,
        from: &Address,
        amount: Amount,
    ) -> Result<Amount, ChainError> {
        self.transact(caller, 0, |s, ctx| Ok(s.token.burn(ctx, from, amount)?))
    }

    /// Lowers the global rate.
    pub fn set_interest_rate(
        &mut self,
        caller: &Address,
        rate: RatePerSecond,
    ) -> Result<(), ChainError> {
        self.transact(caller, 0, |s, ctx| Ok(s.token.set_interest_rate(ctx, rate)?))
    }

    /// Grants the ledger's mint-and-burn capability.
    pub fn grant_mint_and_burn_role(
        &mut self,
        caller: &Address,
        account: &Address,
    ) -> Result<bool, ChainError> {
        self.transact(caller, 0, |s, ctx| {
            Ok(s.token.grant_mint_and_burn_role(ctx, account)?)
        })
    }

    /// Revokes the ledger's mint-and-burn capability.
    pub fn revoke_mint_and_burn_role(
        &mut self,
        caller: &Address,
        account: &Address,
    ) -> Result<bool, ChainError> {
        self.transact(caller, 0, |s, ctx| {
            Ok(s.token.revoke_mint_and_burn_role(ctx, account)?)
        })
    }

    /// Hands ledger ownership to `new_owner`.
    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: &Address,
    ) -> Result<(), ChainError> {
        self.transact(caller, 0, |s, ctx| {
            Ok(s.token.transfer_ownership(ctx, new_owner.clone())?)
        })
    }

    // -- Bridge -------------------------------------------------------------

    /// Enables and disables remote chains on the pool.
    pub fn apply_chain_updates(
        &mut self,
        caller: &Address,
        add: &[u64],
        remove: &[u64],
    ) -> Result<(), ChainError> {
        self.transact(caller, 0, |s, ctx| {
            Ok(s.pool.apply_chain_updates(ctx, add, remove)?)
        })
    }

    /// Grants the pool's relay capability.
    pub fn grant_relayer(&mut self, caller: &Address, relayer: &Address) -> Result<bool, ChainError> {
        self.transact(caller, 0, |s, ctx| Ok(s.pool.grant_relayer(ctx, relayer)?))
    }

    /// Source leg of a cross-chain transfer.
    pub fn bridge_out(
        &mut self,
        caller: &Address,
        receiver: &Address,
        dest_chain: u64,
        amount: Amount,
    ) -> Result<BridgeMessage, ChainError> {
        self.transact(caller, 0, |s, ctx| {
            Ok(s.pool.lock_or_burn(ctx, &mut s.token, receiver, dest_chain, amount)?)
        })
    }

    /// Destination leg of a cross-chain transfer.
    pub fn bridge_in(
        &mut self,
        caller: &Address,
        message: &BridgeMessage,
    ) -> Result<Amount, ChainError> {
        self.transact(caller, 0, |s, ctx| {
            Ok(s.pool.release_or_mint(ctx, &mut s.token, message)?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rebase_protocol::runtime::ManualClock;

    fn deployed() -> (Chain, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let chain = Chain::deploy(&LedgerConfig::default(), "owner".into(), clock.clone()).unwrap();
        (chain, clock)
    }

    #[test]
    fn deploy_wires_roles() {
        let (chain, _) = deployed();
        assert!(chain.token().has_mint_and_burn_role(chain.vault().address()));
        assert!(chain.token().has_mint_and_burn_role(chain.pool().address()));
        assert_eq!(chain.vault().ledger_address(), chain.token().address());
    }

    #[test]
    fn failed_transaction_restores_everything() {
        let (mut chain, _) = deployed();
        let alice = Address::from("alice");
        chain.bank_mut().credit(&alice, 10).unwrap();
        let before = chain.state().clone();

        let result: Result<(), ChainError> = chain.transact(&alice, 0, |s, ctx| {
            s.bank.transfer(&ctx.caller, &"bob".into(), 10)?;
            Err(ChainError::Bank(BankError::RecipientRejected("bob".into())))
        });
        assert!(result.is_err());
        assert_eq!(chain.state(), &before);
    }

    #[test]
    fn unauthorized_is_detected_through_layers() {
        let (mut chain, _) = deployed();
        let err = chain
            .mint(&"mallory".into(), &"mallory".into(), 1)
            .unwrap_err();
        assert!(err.is_unauthorized());
        let err = chain.redeem(&"alice".into(), 1).unwrap_err();
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn events_are_drained_in_time_order() {
        let (mut chain, clock) = deployed();
        let alice = Address::from("alice");
        chain.bank_mut().credit(&alice, 100).unwrap();
        clock.advance(10);
        chain.deposit(&alice, 100).unwrap();
        let events = chain.take_events();
        assert!(events.windows(2).all(|w| w[0].at <= w[1].at));
        assert!(chain.take_events().is_empty());
    }
}
