//! # Rebase Token Contract
//!
//! An interest-bearing ledger whose balances grow every second without any
//! rebase transaction. Each holder carries three numbers: settled
//! `principal`, a `locked_rate`, and the `last_settled` time. The displayed
//! balance is the principal scaled by the time elapsed since settlement (see
//! [`rebase_protocol::accrual`]).
//!
//! ## Mutation Protocol
//!
//! Every entry point that changes balances first *settles* each holder it
//! touches: interest accrued since `last_settled` is minted as principal and
//! the clock is reset to `now`. Only then is the operation's own effect
//! applied. Settling a holder twice at the same `now` is a no-op.
//!
//! ## Rate Assignment
//!
//! - `mint` pins the recipient to the *current global rate*, overwriting
//!   whatever it held before.
//! - A transfer to a holder with zero principal makes the recipient adopt
//!   the *sender's* locked rate. Recipients that already hold credit keep
//!   their own rate.
//! - The global rate only ever goes down, and strictly so.
//!
//! ## Atomicity
//!
//! Operations build their changes in a [`Pending`] working set (settled
//! copies of the touched accounts, the new principal total, the events) and
//! write them back only after every check has passed. A failed call leaves
//! the ledger exactly as it was.
//!
//! ## Security Model
//!
//! - `mint`, `mint_with_rate` and `burn` require [`Capability::MintAndBurn`].
//! - `set_interest_rate` and role administration require the owner.
//! - Capability checks happen before any settlement, so an unauthorized
//!   call never even settles interest.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rebase_protocol::access::{AccessControl, AccessError, Capability, Ownable, RoleSet};
use rebase_protocol::config::{LedgerConfig, FULL_BALANCE, UNLIMITED_ALLOWANCE};
use rebase_protocol::events::{Event, EventLog, EventRecord};
use rebase_protocol::runtime::CallContext;
use rebase_protocol::storage::{HolderAccount, LedgerState};
use rebase_protocol::{Address, Amount, RatePerSecond, Timestamp};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The caller lacks the required capability.
    #[error(transparent)]
    Unauthorized(#[from] AccessError),

    /// The holder's settled principal does not cover the amount.
    #[error("insufficient balance: {holder} has {available}, requested {requested}")]
    InsufficientBalance {
        /// The debited holder.
        holder: Address,
        /// Settled principal at the time of the call.
        available: Amount,
        /// Resolved amount of the operation.
        requested: Amount,
    },

    /// The spender's allowance does not cover the amount.
    #[error(
        "insufficient allowance: {spender} may spend {available} of {owner}'s balance, requested {requested}"
    )]
    InsufficientAllowance {
        /// The account whose credit is being spent.
        owner: Address,
        /// The account spending it.
        spender: Address,
        /// Remaining allowance.
        available: Amount,
        /// Resolved amount of the operation.
        requested: Amount,
    },

    /// A new global rate must be strictly below the current one.
    #[error("interest rate can only decrease: current {current}, proposed {proposed}")]
    RateCanOnlyDecrease {
        /// Global rate before the call.
        current: RatePerSecond,
        /// Rejected value.
        proposed: RatePerSecond,
    },

    /// A balance or the supply would leave the `u128` range.
    #[error("arithmetic overflow during {operation}")]
    ArithmeticOverflow {
        /// Which step overflowed.
        operation: &'static str,
    },
}

fn overflow(operation: &'static str) -> TokenError {
    TokenError::ArithmeticOverflow { operation }
}

// ---------------------------------------------------------------------------
// TokenDescriptor
// ---------------------------------------------------------------------------

/// Identity, metadata and access control of a deployed ledger. Everything
/// but the balances.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDescriptor {
    /// Contract address.
    pub address: Address,
    /// Token name.
    pub name: String,
    /// Token ticker.
    pub symbol: String,
    /// Display decimals.
    pub decimals: u8,
    /// Owner checker.
    pub ownable: Ownable,
    /// Accounts allowed to mint and burn.
    pub minters: RoleSet,
}

// ---------------------------------------------------------------------------
// Pending working set
// ---------------------------------------------------------------------------

/// Changes staged by one call, applied by [`RebaseToken::commit`].
struct Pending {
    accounts: BTreeMap<Address, HolderAccount>,
    allowance: Option<(Address, Address, Amount)>,
    total_principal: Amount,
    events: Vec<Event>,
}

impl Pending {
    fn new(state: &LedgerState) -> Self {
        Self {
            accounts: BTreeMap::new(),
            allowance: None,
            total_principal: state.total_principal(),
            events: Vec::new(),
        }
    }

    fn account(&self, state: &LedgerState, holder: &Address) -> HolderAccount {
        self.accounts
            .get(holder)
            .copied()
            .unwrap_or_else(|| state.account(holder))
    }

    fn put(&mut self, holder: &Address, account: HolderAccount) {
        self.accounts.insert(holder.clone(), account);
    }

    /// Mints the holder's accrued interest as principal and resets its clock.
    fn settle(
        &mut self,
        state: &LedgerState,
        holder: &Address,
        now: Timestamp,
    ) -> Result<HolderAccount, TokenError> {
        let (settled, interest) = self
            .account(state, holder)
            .settled(now)
            .ok_or_else(|| overflow("settlement"))?;

        if interest > 0 {
            self.total_principal = self
                .total_principal
                .checked_add(interest)
                .ok_or_else(|| overflow("settlement"))?;
            self.events.push(Event::Transfer {
                from: None,
                to: Some(holder.clone()),
                amount: interest,
            });
            tracing::debug!(holder = %holder, interest, now, "settled accrued interest");
        }

        self.put(holder, settled);
        Ok(settled)
    }
}

// ---------------------------------------------------------------------------
// RebaseToken
// ---------------------------------------------------------------------------

/// The interest-accruing ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebaseToken {
    descriptor: TokenDescriptor,
    state: LedgerState,
    #[serde(skip)]
    events: EventLog,
}

impl RebaseToken {
    /// Deploys a fresh ledger owned by `owner`.
    ///
    /// Nobody holds the mint-and-burn capability yet; the owner grants it to
    /// the vault and the bridge pool after deployment.
    pub fn new(address: impl Into<Address>, owner: Address, config: &LedgerConfig) -> Self {
        Self {
            descriptor: TokenDescriptor {
                address: address.into(),
                name: config.name.clone(),
                symbol: config.symbol.clone(),
                decimals: config.decimals,
                ownable: Ownable::new(owner),
                minters: RoleSet::new(Capability::MintAndBurn),
            },
            state: LedgerState::new(config.initial_interest_rate),
            events: EventLog::new(),
        }
    }

    /// Reassembles a ledger from persisted parts.
    pub fn from_parts(descriptor: TokenDescriptor, state: LedgerState) -> Self {
        Self {
            descriptor,
            state,
            events: EventLog::new(),
        }
    }

    fn commit(&mut self, pending: Pending, now: Timestamp) {
        for (holder, account) in pending.accounts {
            self.state.put_account(&holder, account);
        }
        if let Some((owner, spender, amount)) = pending.allowance {
            self.state.set_allowance(&owner, &spender, amount);
        }
        self.state.set_total_principal(pending.total_principal);
        self.events
            .extend(&self.descriptor.address, now, pending.events);
    }

    // -- Metadata & reads ---------------------------------------------------

    /// Contract address.
    pub fn address(&self) -> &Address {
        &self.descriptor.address
    }

    /// Token name.
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Token ticker.
    pub fn symbol(&self) -> &str {
        &self.descriptor.symbol
    }

    /// Display decimals.
    pub fn decimals(&self) -> u8 {
        self.descriptor.decimals
    }

    /// Current owner.
    pub fn owner(&self) -> &Address {
        self.descriptor.ownable.owner()
    }

    /// Identity, metadata and roles, for persistence.
    pub fn descriptor(&self) -> &TokenDescriptor {
        &self.descriptor
    }

    /// The underlying store, read-only.
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Events emitted by committed calls.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Takes every event emitted so far.
    pub fn take_events(&mut self) -> Vec<EventRecord> {
        self.events.drain()
    }

    /// Displayed balance at `now`: principal plus interest accrued since the
    /// holder's last settlement. Does not settle anything.
    pub fn balance_of(&self, holder: &Address, now: Timestamp) -> Amount {
        self.state.account(holder).displayed_balance(now)
    }

    /// Settled principal only, ignoring unsettled interest.
    pub fn principal_balance_of(&self, holder: &Address) -> Amount {
        self.state.account(holder).principal
    }

    /// Sum of all settled principal. Interest that nobody has settled yet
    /// is not part of the supply.
    pub fn total_supply(&self) -> Amount {
        self.state.total_principal()
    }

    /// Rate newly funded holders receive.
    pub fn interest_rate(&self) -> RatePerSecond {
        self.state.current_rate()
    }

    /// Rate locked in by `holder`.
    pub fn user_interest_rate(&self, holder: &Address) -> RatePerSecond {
        self.state.account(holder).locked_rate
    }

    /// When `holder` was last settled.
    pub fn user_last_settled(&self, holder: &Address) -> Timestamp {
        self.state.account(holder).last_settled
    }

    /// Remaining allowance.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.state.allowance(owner, spender)
    }

    /// `true` if `account` may mint and burn.
    pub fn has_mint_and_burn_role(&self, account: &Address) -> bool {
        self.descriptor
            .minters
            .has_capability(account, Capability::MintAndBurn)
    }

    // -- Administration -----------------------------------------------------

    /// Lowers the global rate. Existing holders keep their locked rates.
    ///
    /// # Errors
    ///
    /// [`TokenError::Unauthorized`] unless the caller is the owner.
    /// [`TokenError::RateCanOnlyDecrease`] unless `new_rate` is strictly
    /// below the current rate.
    pub fn set_interest_rate(
        &mut self,
        ctx: &CallContext,
        new_rate: RatePerSecond,
    ) -> Result<(), TokenError> {
        self.descriptor
            .ownable
            .require_capability(&ctx.caller, Capability::Owner)?;

        let current = self.state.current_rate();
        if new_rate >= current {
            return Err(TokenError::RateCanOnlyDecrease {
                current,
                proposed: new_rate,
            });
        }

        self.state.set_current_rate(new_rate);
        self.events.push(
            &self.descriptor.address,
            ctx.now,
            Event::InterestRateSet { new_rate },
        );
        tracing::info!(previous = current, new_rate, "global interest rate lowered");
        Ok(())
    }

    /// Grants the mint-and-burn capability. Owner only.
    ///
    /// Returns `false` if the account already held it.
    pub fn grant_mint_and_burn_role(
        &mut self,
        ctx: &CallContext,
        account: &Address,
    ) -> Result<bool, TokenError> {
        self.descriptor
            .ownable
            .require_capability(&ctx.caller, Capability::Owner)?;
        let granted = self.descriptor.minters.grant(account.clone());
        if granted {
            self.events.push(
                &self.descriptor.address,
                ctx.now,
                Event::RoleGranted {
                    account: account.clone(),
                    capability: Capability::MintAndBurn,
                },
            );
            tracing::info!(account = %account, "mint-and-burn role granted");
        }
        Ok(granted)
    }

    /// Revokes the mint-and-burn capability. Owner only.
    ///
    /// Returns `false` if the account did not hold it.
    pub fn revoke_mint_and_burn_role(
        &mut self,
        ctx: &CallContext,
        account: &Address,
    ) -> Result<bool, TokenError> {
        self.descriptor
            .ownable
            .require_capability(&ctx.caller, Capability::Owner)?;
        let revoked = self.descriptor.minters.revoke(account);
        if revoked {
            self.events.push(
                &self.descriptor.address,
                ctx.now,
                Event::RoleRevoked {
                    account: account.clone(),
                    capability: Capability::MintAndBurn,
                },
            );
            tracing::info!(account = %account, "mint-and-burn role revoked");
        }
        Ok(revoked)
    }

    /// Hands ownership to `new_owner`. Owner only.
    pub fn transfer_ownership(
        &mut self,
        ctx: &CallContext,
        new_owner: Address,
    ) -> Result<(), TokenError> {
        let previous_owner = self
            .descriptor
            .ownable
            .transfer_ownership(&ctx.caller, new_owner.clone())?;
        self.events.push(
            &self.descriptor.address,
            ctx.now,
            Event::OwnershipTransferred {
                previous_owner,
                new_owner,
            },
        );
        Ok(())
    }

    // -- Mint & burn --------------------------------------------------------

    /// Settles `to`, pins it to the current global rate and issues `amount`
    /// of new principal.
    ///
    /// Re-pinning happens on every mint, not only the first one.
    pub fn mint(&mut self, ctx: &CallContext, to: &Address, amount: Amount) -> Result<(), TokenError> {
        self.require_minter(ctx)?;
        let rate = self.state.current_rate();
        self.mint_at_rate(ctx, to, amount, rate)
    }

    /// Like [`mint`](Self::mint) but pins `to` to `rate` instead of the
    /// global rate. The destination leg of a bridge transfer uses this to
    /// carry a holder's rate across chains.
    pub fn mint_with_rate(
        &mut self,
        ctx: &CallContext,
        to: &Address,
        amount: Amount,
        rate: RatePerSecond,
    ) -> Result<(), TokenError> {
        self.require_minter(ctx)?;
        self.mint_at_rate(ctx, to, amount, rate)
    }

    fn mint_at_rate(
        &mut self,
        ctx: &CallContext,
        to: &Address,
        amount: Amount,
        rate: RatePerSecond,
    ) -> Result<(), TokenError> {
        let mut pending = Pending::new(&self.state);
        let mut account = pending.settle(&self.state, to, ctx.now)?;

        account.locked_rate = rate;
        account.principal = account
            .principal
            .checked_add(amount)
            .ok_or_else(|| overflow("mint"))?;
        pending.total_principal = pending
            .total_principal
            .checked_add(amount)
            .ok_or_else(|| overflow("mint"))?;
        pending.put(to, account);
        pending.events.push(Event::Transfer {
            from: None,
            to: Some(to.clone()),
            amount,
        });

        self.commit(pending, ctx.now);
        tracing::debug!(to = %to, amount, rate, "minted");
        Ok(())
    }

    /// Settles `from`, then destroys `amount` of its principal.
    ///
    /// [`FULL_BALANCE`] burns everything the holder has after settlement.
    /// Returns the resolved amount.
    ///
    /// # Errors
    ///
    /// [`TokenError::Unauthorized`] without the mint-and-burn capability.
    /// [`TokenError::InsufficientBalance`] if the settled principal is short.
    pub fn burn(
        &mut self,
        ctx: &CallContext,
        from: &Address,
        amount: Amount,
    ) -> Result<Amount, TokenError> {
        let (pending, amount) = self.stage_burn(ctx, from, amount)?;
        self.commit(pending, ctx.now);
        tracing::debug!(from = %from, amount, "burned");
        Ok(amount)
    }

    /// Runs every check [`RebaseToken::burn`] would and returns the amount it
    /// would destroy, without changing anything.
    pub fn preview_burn(
        &self,
        ctx: &CallContext,
        from: &Address,
        amount: Amount,
    ) -> Result<Amount, TokenError> {
        self.stage_burn(ctx, from, amount).map(|(_, amount)| amount)
    }

    fn stage_burn(
        &self,
        ctx: &CallContext,
        from: &Address,
        amount: Amount,
    ) -> Result<(Pending, Amount), TokenError> {
        self.require_minter(ctx)?;

        let mut pending = Pending::new(&self.state);
        let mut account = pending.settle(&self.state, from, ctx.now)?;

        let amount = resolve_full_balance(amount, &account);
        if account.principal < amount {
            return Err(TokenError::InsufficientBalance {
                holder: from.clone(),
                available: account.principal,
                requested: amount,
            });
        }

        account.principal -= amount;
        pending.total_principal = pending
            .total_principal
            .checked_sub(amount)
            .ok_or_else(|| overflow("burn"))?;
        pending.put(from, account);
        pending.events.push(Event::Transfer {
            from: Some(from.clone()),
            to: None,
            amount,
        });
        Ok((pending, amount))
    }

    fn require_minter(&self, ctx: &CallContext) -> Result<(), TokenError> {
        self.descriptor
            .minters
            .require_capability(&ctx.caller, Capability::MintAndBurn)?;
        Ok(())
    }

    // -- Transfers ----------------------------------------------------------

    /// Moves `amount` of the caller's credit to `to`.
    ///
    /// Both sides are settled first. [`FULL_BALANCE`] moves the caller's
    /// entire settled balance. A recipient with zero principal adopts the
    /// caller's locked rate.
    pub fn transfer(
        &mut self,
        ctx: &CallContext,
        to: &Address,
        amount: Amount,
    ) -> Result<bool, TokenError> {
        let mut pending = Pending::new(&self.state);
        let (from_account, to_account, amount) =
            self.prepare_move(&mut pending, &ctx.caller, to, amount, ctx.now)?;
        self.apply_move(&mut pending, &ctx.caller, to, from_account, to_account, amount)?;
        self.commit(pending, ctx.now);
        Ok(true)
    }

    /// Moves `amount` of `from`'s credit to `to`, spending the caller's
    /// allowance.
    ///
    /// The sentinel is resolved before the allowance check, so spending
    /// `from`'s full balance needs an allowance covering that balance. An
    /// [`UNLIMITED_ALLOWANCE`] is never decreased.
    pub fn transfer_from(
        &mut self,
        ctx: &CallContext,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<bool, TokenError> {
        let spender = &ctx.caller;
        let mut pending = Pending::new(&self.state);
        let (from_account, to_account, amount) =
            self.prepare_move(&mut pending, from, to, amount, ctx.now)?;

        let available = self.state.allowance(from, spender);
        if available != UNLIMITED_ALLOWANCE {
            if available < amount {
                return Err(TokenError::InsufficientAllowance {
                    owner: from.clone(),
                    spender: spender.clone(),
                    available,
                    requested: amount,
                });
            }
            pending.allowance = Some((from.clone(), spender.clone(), available - amount));
        }

        self.apply_move(&mut pending, from, to, from_account, to_account, amount)?;
        self.commit(pending, ctx.now);
        Ok(true)
    }

    /// Sets the caller's allowance for `spender`. Allowances do not accrue.
    pub fn approve(&mut self, ctx: &CallContext, spender: &Address, amount: Amount) -> bool {
        self.state.set_allowance(&ctx.caller, spender, amount);
        self.events.push(
            &self.descriptor.address,
            ctx.now,
            Event::Approval {
                owner: ctx.caller.clone(),
                spender: spender.clone(),
                amount,
            },
        );
        true
    }

    /// Settles both parties and resolves the sentinel.
    fn prepare_move(
        &self,
        pending: &mut Pending,
        from: &Address,
        to: &Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<(HolderAccount, HolderAccount, Amount), TokenError> {
        let from_account = pending.settle(&self.state, from, now)?;
        let to_account = pending.settle(&self.state, to, now)?;
        let amount = resolve_full_balance(amount, &from_account);
        Ok((from_account, to_account, amount))
    }

    /// Applies rate inheritance and the debit/credit pair.
    fn apply_move(
        &self,
        pending: &mut Pending,
        from: &Address,
        to: &Address,
        mut from_account: HolderAccount,
        mut to_account: HolderAccount,
        amount: Amount,
    ) -> Result<(), TokenError> {
        if from_account.principal < amount {
            return Err(TokenError::InsufficientBalance {
                holder: from.clone(),
                available: from_account.principal,
                requested: amount,
            });
        }

        if from != to {
            if to_account.principal == 0 {
                to_account.locked_rate = from_account.locked_rate;
            }
            from_account.principal -= amount;
            to_account.principal = to_account
                .principal
                .checked_add(amount)
                .ok_or_else(|| overflow("transfer"))?;
            pending.put(from, from_account);
            pending.put(to, to_account);
        }

        pending.events.push(Event::Transfer {
            from: Some(from.clone()),
            to: Some(to.clone()),
            amount,
        });
        Ok(())
    }
}

/// Replaces the [`FULL_BALANCE`] sentinel with the settled principal, which
/// equals the displayed balance right after settlement.
fn resolve_full_balance(amount: Amount, settled: &HolderAccount) -> Amount {
    if amount == FULL_BALANCE {
        settled.principal
    } else {
        amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rebase_protocol::config::DEFAULT_INTEREST_RATE;

    const OWNER: &str = "owner";
    const MINTER: &str = "vault";

    fn deployed() -> RebaseToken {
        let mut token = RebaseToken::new("token", OWNER.into(), &LedgerConfig::default());
        token
            .grant_mint_and_burn_role(&CallContext::new(OWNER, 0), &MINTER.into())
            .unwrap();
        token
    }

    fn minter_at(now: Timestamp) -> CallContext {
        CallContext::new(MINTER, now)
    }

    #[test]
    fn fresh_ledger_uses_configured_rate() {
        let token = deployed();
        assert_eq!(token.interest_rate(), DEFAULT_INTEREST_RATE);
        assert_eq!(token.total_supply(), 0);
        assert_eq!(token.name(), "Rebase Token");
    }

    #[test]
    fn mint_pins_current_rate_and_starts_clock() {
        let mut token = deployed();
        let alice = Address::from("alice");
        token.mint(&minter_at(1_000), &alice, 100_000).unwrap();
        assert_eq!(token.principal_balance_of(&alice), 100_000);
        assert_eq!(token.user_interest_rate(&alice), DEFAULT_INTEREST_RATE);
        assert_eq!(token.user_last_settled(&alice), 1_000);
        assert_eq!(token.balance_of(&alice, 1_000), 100_000);
        assert_eq!(token.balance_of(&alice, 4_600), 100_018);
    }

    #[test]
    fn balance_read_does_not_settle() {
        let mut token = deployed();
        let alice = Address::from("alice");
        token.mint(&minter_at(0), &alice, 100_000).unwrap();
        let _ = token.balance_of(&alice, 3_600);
        assert_eq!(token.principal_balance_of(&alice), 100_000);
        assert_eq!(token.total_supply(), 100_000);
    }

    #[test]
    fn second_mint_settles_interest_first() {
        let mut token = deployed();
        let alice = Address::from("alice");
        token.mint(&minter_at(0), &alice, 100_000).unwrap();
        token.mint(&minter_at(3_600), &alice, 1).unwrap();
        assert_eq!(token.principal_balance_of(&alice), 100_019);
        assert_eq!(token.total_supply(), 100_019);
        assert_eq!(token.state().audit_total_principal(), Some(100_019));
    }

    #[test]
    fn mint_requires_role() {
        let mut token = deployed();
        let err = token
            .mint(&CallContext::new("mallory", 0), &"mallory".into(), 1)
            .unwrap_err();
        assert!(matches!(err, TokenError::Unauthorized(_)));
        assert_eq!(token.total_supply(), 0);
        assert!(token.events().records().iter().all(|r| !matches!(
            r.event,
            Event::Transfer { .. }
        )));
    }

    #[test]
    fn burn_more_than_settled_balance_rejected_atomically() {
        let mut token = deployed();
        let alice = Address::from("alice");
        token.mint(&minter_at(0), &alice, 100_000).unwrap();
        let err = token.burn(&minter_at(3_600), &alice, 200_000).unwrap_err();
        assert_eq!(
            err,
            TokenError::InsufficientBalance {
                holder: alice.clone(),
                available: 100_018,
                requested: 200_000,
            }
        );
        // The failed call did not even keep its settlement.
        assert_eq!(token.principal_balance_of(&alice), 100_000);
        assert_eq!(token.user_last_settled(&alice), 0);
    }

    #[test]
    fn burn_full_balance_leaves_zero() {
        let mut token = deployed();
        let alice = Address::from("alice");
        token.mint(&minter_at(0), &alice, 100_000).unwrap();
        let burned = token.burn(&minter_at(3_600), &alice, FULL_BALANCE).unwrap();
        assert_eq!(burned, 100_018);
        assert_eq!(token.balance_of(&alice, 3_600), 0);
        assert_eq!(token.balance_of(&alice, 1_000_000), 0);
        assert_eq!(token.total_supply(), 0);
    }

    #[test]
    fn rate_must_strictly_decrease() {
        let mut token = deployed();
        let owner = CallContext::new(OWNER, 0);
        let err = token
            .set_interest_rate(&owner, DEFAULT_INTEREST_RATE)
            .unwrap_err();
        assert!(matches!(err, TokenError::RateCanOnlyDecrease { .. }));
        token
            .set_interest_rate(&owner, DEFAULT_INTEREST_RATE - 1)
            .unwrap();
        assert_eq!(token.interest_rate(), DEFAULT_INTEREST_RATE - 1);
    }

    #[test]
    fn set_interest_rate_requires_owner() {
        let mut token = deployed();
        let err = token
            .set_interest_rate(&CallContext::new(MINTER, 0), 1)
            .unwrap_err();
        assert!(matches!(err, TokenError::Unauthorized(_)));
        assert_eq!(token.interest_rate(), DEFAULT_INTEREST_RATE);
    }

    #[test]
    fn self_transfer_only_settles() {
        let mut token = deployed();
        let alice = Address::from("alice");
        token.mint(&minter_at(0), &alice, 100_000).unwrap();
        token
            .transfer(&CallContext::new("alice", 3_600), &alice, 50_000)
            .unwrap();
        assert_eq!(token.principal_balance_of(&alice), 100_018);
    }

    #[test]
    fn revoked_minter_can_no_longer_mint() {
        let mut token = deployed();
        let owner = CallContext::new(OWNER, 0);
        assert!(token.revoke_mint_and_burn_role(&owner, &MINTER.into()).unwrap());
        assert!(!token.has_mint_and_burn_role(&MINTER.into()));
        assert!(token.mint(&minter_at(0), &"alice".into(), 1).is_err());
    }

    #[test]
    fn ownership_transfer_moves_admin_rights() {
        let mut token = deployed();
        token
            .transfer_ownership(&CallContext::new(OWNER, 0), "dao".into())
            .unwrap();
        assert_eq!(token.owner().as_str(), "dao");
        assert!(token
            .set_interest_rate(&CallContext::new(OWNER, 0), 1)
            .is_err());
        token.set_interest_rate(&CallContext::new("dao", 0), 1).unwrap();
    }
}
