//! # Native Base-Asset Accounting
//!
//! The host chain's own balance book for the base asset the vault takes in
//! and pays out. Contracts never keep their own copy of these balances; the
//! vault relies entirely on this book for custody.
//!
//! Some recipients refuse incoming value (think of a contract account with
//! no receive hook). [`NativeBank::transfer`] reports that as
//! [`BankError::RecipientRejected`] instead of silently dropping the funds.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Address, Amount};

/// Errors from native transfers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BankError {
    /// The sender does not hold enough of the base asset.
    #[error("insufficient funds: {account} has {available}, needs {requested}")]
    InsufficientFunds {
        /// The debited account.
        account: Address,
        /// Its current balance.
        available: Amount,
        /// The amount asked for.
        requested: Amount,
    },

    /// The recipient refuses incoming value.
    #[error("recipient {0} rejected the transfer")]
    RecipientRejected(Address),

    /// Crediting would overflow the recipient's balance.
    #[error("balance overflow crediting {amount} to {account}")]
    Overflow {
        /// The credited account.
        account: Address,
        /// The amount that overflowed.
        amount: Amount,
    },
}

/// Base-asset balances keyed by address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeBank {
    balances: BTreeMap<Address, Amount>,
    rejecting: BTreeSet<Address>,
}

impl NativeBank {
    /// An empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Base-asset balance of `account`.
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Creates `amount` out of thin air for `account`. Genesis allocations
    /// and devnet faucets only.
    pub fn credit(&mut self, account: &Address, amount: Amount) -> Result<Amount, BankError> {
        let balance = self.balances.entry(account.clone()).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(BankError::Overflow {
            account: account.clone(),
            amount,
        })?;
        Ok(*balance)
    }

    /// Marks whether `account` accepts incoming value.
    pub fn set_accepts_value(&mut self, account: &Address, accepts: bool) {
        if accepts {
            self.rejecting.remove(account);
        } else {
            self.rejecting.insert(account.clone());
        }
    }

    /// Returns `true` unless `account` was marked as refusing value.
    pub fn accepts_value(&self, account: &Address) -> bool {
        !self.rejecting.contains(account)
    }

    /// Checks that [`NativeBank::transfer`] would succeed without moving
    /// anything. Contracts call this before committing their own side of an
    /// exchange.
    pub fn check_transfer(
        &self,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), BankError> {
        self.plan_transfer(from, to, amount).map(|_| ())
    }

    /// Moves `amount` from `from` to `to`.
    ///
    /// Checks everything before touching either balance, so a failed
    /// transfer leaves the book unchanged.
    pub fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), BankError> {
        if let Some((debited, credited)) = self.plan_transfer(from, to, amount)? {
            self.balances.insert(from.clone(), debited);
            self.balances.insert(to.clone(), credited);
        }
        Ok(())
    }

    /// New `(from, to)` balances, or `None` for a self-transfer.
    fn plan_transfer(
        &self,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<Option<(Amount, Amount)>, BankError> {
        if !self.accepts_value(to) {
            return Err(BankError::RecipientRejected(to.clone()));
        }

        let available = self.balance_of(from);
        if available < amount {
            return Err(BankError::InsufficientFunds {
                account: from.clone(),
                available,
                requested: amount,
            });
        }
        if from == to {
            return Ok(None);
        }

        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(BankError::Overflow {
                account: to.clone(),
                amount,
            })?;
        Ok(Some((available - amount, credited)))
    }

    /// Sum of all balances. Walks every account; meant for audits and tests.
    pub fn total(&self) -> Amount {
        self.balances
            .values()
            .fold(0u128, |acc, b| acc.saturating_add(*b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funded(account: &str, amount: Amount) -> NativeBank {
        let mut bank = NativeBank::new();
        bank.credit(&account.into(), amount).unwrap();
        bank
    }

    #[test]
    fn transfer_moves_funds() {
        let mut bank = funded("alice", 1_000);
        bank.transfer(&"alice".into(), &"bob".into(), 400).unwrap();
        assert_eq!(bank.balance_of(&"alice".into()), 600);
        assert_eq!(bank.balance_of(&"bob".into()), 400);
        assert_eq!(bank.total(), 1_000);
    }

    #[test]
    fn overdraft_rejected_without_side_effects() {
        let mut bank = funded("alice", 100);
        let err = bank.transfer(&"alice".into(), &"bob".into(), 101).unwrap_err();
        assert!(matches!(err, BankError::InsufficientFunds { available: 100, .. }));
        assert_eq!(bank.balance_of(&"alice".into()), 100);
        assert_eq!(bank.balance_of(&"bob".into()), 0);
    }

    #[test]
    fn rejecting_recipient_keeps_funds_with_sender() {
        let mut bank = funded("vault", 500);
        bank.set_accepts_value(&"contract".into(), false);
        let err = bank
            .transfer(&"vault".into(), &"contract".into(), 500)
            .unwrap_err();
        assert_eq!(err, BankError::RecipientRejected("contract".into()));
        assert_eq!(bank.balance_of(&"vault".into()), 500);

        bank.set_accepts_value(&"contract".into(), true);
        bank.transfer(&"vault".into(), &"contract".into(), 500).unwrap();
        assert_eq!(bank.balance_of(&"contract".into()), 500);
    }

    #[test]
    fn check_transfer_agrees_with_transfer() {
        let mut bank = funded("vault", 50);
        bank.set_accepts_value(&"contract".into(), false);
        assert_eq!(
            bank.check_transfer(&"vault".into(), &"contract".into(), 10),
            Err(BankError::RecipientRejected("contract".into()))
        );
        assert!(matches!(
            bank.check_transfer(&"vault".into(), &"alice".into(), 51),
            Err(BankError::InsufficientFunds { .. })
        ));
        assert_eq!(bank.check_transfer(&"vault".into(), &"alice".into(), 50), Ok(()));
        assert_eq!(bank.balance_of(&"vault".into()), 50);
        bank.transfer(&"vault".into(), &"alice".into(), 50).unwrap();
        assert_eq!(bank.balance_of(&"alice".into()), 50);
    }

    #[test]
    fn credit_overflow_detected() {
        let mut bank = funded("alice", u128::MAX);
        assert!(matches!(
            bank.credit(&"alice".into(), 1),
            Err(BankError::Overflow { .. })
        ));
    }
}
