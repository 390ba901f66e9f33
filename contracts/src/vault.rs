//! # Vault Contract
//!
//! Exchanges the host's native base asset 1:1 for ledger credit and back.
//! The vault holds no ledger state of its own. Custody is simply the vault
//! address's balance in the host's [`NativeBank`].
//!
//! ```text
//! deposit : caller --value--> vault ; ledger.mint(caller, value)
//! redeem  : ledger.burn(caller, amount) ; vault --amount--> caller
//! ```
//!
//! ## Rollback Contract
//!
//! `redeem` dry-runs both the burn and the payout before applying either,
//! so a refused payout returns [`VaultError::RedeemTransferFailed`] with
//! the caller's credit untouched. [`crate::chain::Chain::transact`] adds
//! whole-state rollback on top for every other failure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rebase_protocol::bank::{BankError, NativeBank};
use rebase_protocol::events::{Event, EventLog, EventRecord};
use rebase_protocol::runtime::CallContext;
use rebase_protocol::{Address, Amount};

use crate::rebase_token::{RebaseToken, TokenError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during vault operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// Deposits must carry value.
    #[error("deposit amount must be greater than zero")]
    ZeroAmount,

    /// The ledger handed in is not the one this vault was deployed against.
    #[error("vault is bound to ledger {expected}, got {actual}")]
    WrongLedger {
        /// The bound ledger.
        expected: Address,
        /// The ledger that was passed in.
        actual: Address,
    },

    /// The caller could not fund the deposit.
    #[error("deposit funding failed: {0}")]
    Funding(BankError),

    /// The payout to the redeemer was rejected.
    #[error("redeem transfer to {recipient} failed: {source}")]
    RedeemTransferFailed {
        /// The redeemer.
        recipient: Address,
        /// Why the bank refused.
        #[source]
        source: BankError,
    },

    /// The ledger refused the mint or burn.
    #[error(transparent)]
    Token(#[from] TokenError),
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// Custodian binding one base asset to one ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    address: Address,
    ledger: Address,
    #[serde(skip)]
    events: EventLog,
}

impl Vault {
    /// Deploys a vault at `address` bound to the ledger at `ledger`.
    ///
    /// The ledger owner still has to grant the vault the mint-and-burn
    /// capability before deposits work.
    pub fn new(address: impl Into<Address>, ledger: Address) -> Self {
        Self {
            address: address.into(),
            ledger,
            events: EventLog::new(),
        }
    }

    /// The vault's own address (where custody balances sit).
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The bound ledger. Collaborators use this to verify wiring.
    pub fn ledger_address(&self) -> &Address {
        &self.ledger
    }

    /// Deposits and redeems committed so far.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Takes every event emitted so far.
    pub fn take_events(&mut self) -> Vec<EventRecord> {
        self.events.drain()
    }

    /// Base asset currently in custody.
    pub fn reserves(&self, bank: &NativeBank) -> Amount {
        bank.balance_of(&self.address)
    }

    fn check_ledger(&self, token: &RebaseToken) -> Result<(), VaultError> {
        if token.address() != &self.ledger {
            return Err(VaultError::WrongLedger {
                expected: self.ledger.clone(),
                actual: token.address().clone(),
            });
        }
        Ok(())
    }

    /// Takes `ctx.value` of base asset from the caller and mints the same
    /// amount of ledger credit to them at the current global rate.
    ///
    /// Returns the amount minted.
    ///
    /// # Errors
    ///
    /// [`VaultError::ZeroAmount`] for value-less calls,
    /// [`VaultError::Funding`] if the caller cannot pay,
    /// [`VaultError::Token`] if the ledger refuses the mint.
    pub fn deposit(
        &mut self,
        ctx: &CallContext,
        token: &mut RebaseToken,
        bank: &mut NativeBank,
    ) -> Result<Amount, VaultError> {
        self.check_ledger(token)?;
        let amount = ctx.value;
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }

        bank.check_transfer(&ctx.caller, &self.address, amount)
            .map_err(VaultError::Funding)?;
        token.mint(&ctx.nested(&self.address), &ctx.caller, amount)?;
        bank.transfer(&ctx.caller, &self.address, amount)
            .map_err(VaultError::Funding)?;

        self.events.push(
            &self.address,
            ctx.now,
            Event::Deposit {
                user: ctx.caller.clone(),
                amount,
            },
        );
        tracing::info!(user = %ctx.caller, amount, "deposit");
        Ok(amount)
    }

    /// Burns `amount` of the caller's credit and pays out the same amount of
    /// base asset. [`FULL_BALANCE`](rebase_protocol::config::FULL_BALANCE) redeems the caller's entire displayed
    /// balance, interest included.
    ///
    /// Returns the amount redeemed.
    ///
    /// # Errors
    ///
    /// [`VaultError::Token`] if the burn fails,
    /// [`VaultError::RedeemTransferFailed`] if the caller refuses the payout
    /// or the vault cannot cover it. Both are detected before anything is
    /// burned, so a failed redeem changes nothing.
    pub fn redeem(
        &mut self,
        ctx: &CallContext,
        token: &mut RebaseToken,
        bank: &mut NativeBank,
        amount: Amount,
    ) -> Result<Amount, VaultError> {
        self.check_ledger(token)?;
        let burner = ctx.nested(&self.address);
        let amount = token.preview_burn(&burner, &ctx.caller, amount)?;
        let payout_failed = |source| VaultError::RedeemTransferFailed {
            recipient: ctx.caller.clone(),
            source,
        };

        bank.check_transfer(&self.address, &ctx.caller, amount)
            .map_err(payout_failed)?;
        token.burn(&burner, &ctx.caller, amount)?;
        bank.transfer(&self.address, &ctx.caller, amount)
            .map_err(payout_failed)?;

        self.events.push(
            &self.address,
            ctx.now,
            Event::Redeem {
                user: ctx.caller.clone(),
                amount,
            },
        );
        tracing::info!(user = %ctx.caller, amount, "redeem");
        Ok(amount)
    }
}
