//! # Ledger State
//!
//! The explicit mutable store behind the ledger: one global rate record, one
//! record per holder, and the allowance table.
//!
//! ```text
//! global      { current_rate }
//! accounts    address -> { principal, locked_rate, last_settled }
//! allowances  owner -> spender -> amount
//! ```
//!
//! `total_principal` is maintained incrementally so that reading the supply
//! never walks every holder. [`LedgerState::audit_total_principal`] does the
//! walk for tests and audits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::accrual;
use crate::types::{Address, Amount, RatePerSecond, Timestamp};

// ---------------------------------------------------------------------------
// GlobalRateState
// ---------------------------------------------------------------------------

/// The process-wide rate newly funded holders receive.
///
/// Invariant: never increases. Enforcement lives in the ledger's
/// `set_interest_rate`; this record only stores the value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalRateState {
    /// Current global rate per second.
    pub current_rate: RatePerSecond,
}

// ---------------------------------------------------------------------------
// HolderAccount
// ---------------------------------------------------------------------------

/// Per-holder ledger record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderAccount {
    /// Settled credit. Excludes interest accrued since `last_settled`.
    pub principal: Amount,
    /// Rate captured when the holder was funded (or inherited on first
    /// receipt). Survives later global rate cuts.
    pub locked_rate: RatePerSecond,
    /// Time of the last settlement.
    pub last_settled: Timestamp,
}

impl HolderAccount {
    /// Principal plus interest accrued up to `now`, saturating on the
    /// (unrealistic) overflow path.
    pub fn displayed_balance(&self, now: Timestamp) -> Amount {
        accrual::displayed_balance(self.principal, self.locked_rate, self.last_settled, now)
    }

    /// Interest accrued since the last settlement, or `None` on overflow.
    pub fn accrued_interest(&self, now: Timestamp) -> Option<Amount> {
        accrual::accrued_interest(self.principal, self.locked_rate, self.last_settled, now)
    }

    /// A copy of this account with accrued interest moved into principal and
    /// the clock reset to `now`, together with the interest amount.
    ///
    /// Settling twice at the same `now` yields zero interest the second time.
    /// The clock is reset even when nothing accrued (zero principal), so a
    /// later mint never back-dates growth.
    pub fn settled(&self, now: Timestamp) -> Option<(HolderAccount, Amount)> {
        let interest = self.accrued_interest(now)?;
        let principal = self.principal.checked_add(interest)?;
        Some((
            HolderAccount {
                principal,
                locked_rate: self.locked_rate,
                last_settled: now.max(self.last_settled),
            },
            interest,
        ))
    }
}

// ---------------------------------------------------------------------------
// LedgerState
// ---------------------------------------------------------------------------

/// Everything the ledger persists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    global: GlobalRateState,
    accounts: BTreeMap<Address, HolderAccount>,
    allowances: BTreeMap<Address, BTreeMap<Address, Amount>>,
    total_principal: Amount,
}

impl LedgerState {
    /// A fresh ledger with no holders.
    pub fn new(initial_rate: RatePerSecond) -> Self {
        Self {
            global: GlobalRateState {
                current_rate: initial_rate,
            },
            accounts: BTreeMap::new(),
            allowances: BTreeMap::new(),
            total_principal: 0,
        }
    }

    /// Rebuilds a state from its persisted parts.
    pub fn from_parts(
        global: GlobalRateState,
        accounts: BTreeMap<Address, HolderAccount>,
        allowances: BTreeMap<Address, BTreeMap<Address, Amount>>,
        total_principal: Amount,
    ) -> Self {
        Self {
            global,
            accounts,
            allowances,
            total_principal,
        }
    }

    /// The global rate record.
    pub fn global(&self) -> GlobalRateState {
        self.global
    }

    /// Current global rate.
    pub fn current_rate(&self) -> RatePerSecond {
        self.global.current_rate
    }

    /// Overwrites the global rate. Policy checks are the caller's job.
    pub fn set_current_rate(&mut self, rate: RatePerSecond) {
        self.global.current_rate = rate;
    }

    /// The holder's record, or an all-zero record if it never held anything.
    pub fn account(&self, holder: &Address) -> HolderAccount {
        self.accounts.get(holder).copied().unwrap_or_default()
    }

    /// Stores a holder's record.
    pub fn put_account(&mut self, holder: &Address, account: HolderAccount) {
        self.accounts.insert(holder.clone(), account);
    }

    /// All holder records in address order.
    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &HolderAccount)> {
        self.accounts.iter()
    }

    /// Number of addresses that ever held a record.
    pub fn holder_count(&self) -> usize {
        self.accounts.len()
    }

    /// Sum of settled principal, maintained incrementally.
    pub fn total_principal(&self) -> Amount {
        self.total_principal
    }

    /// Overwrites the incremental principal total.
    pub fn set_total_principal(&mut self, total: Amount) {
        self.total_principal = total;
    }

    /// Recomputes the principal total by walking every holder.
    pub fn audit_total_principal(&self) -> Option<Amount> {
        self.accounts
            .values()
            .try_fold(0u128, |acc, a| acc.checked_add(a.principal))
    }

    /// Remaining allowance `owner` granted to `spender`.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|s| s.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Sets an allowance. Zero removes the entry.
    pub fn set_allowance(&mut self, owner: &Address, spender: &Address, amount: Amount) {
        if amount == 0 {
            if let Some(spenders) = self.allowances.get_mut(owner) {
                spenders.remove(spender);
                if spenders.is_empty() {
                    self.allowances.remove(owner);
                }
            }
            return;
        }
        self.allowances
            .entry(owner.clone())
            .or_default()
            .insert(spender.clone(), amount);
    }

    /// All allowances as `(owner, spender, amount)`.
    pub fn allowances(&self) -> impl Iterator<Item = (&Address, &Address, Amount)> {
        self.allowances
            .iter()
            .flat_map(|(owner, s)| s.iter().map(move |(spender, amt)| (owner, spender, *amt)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_INTEREST_RATE;

    #[test]
    fn unknown_holder_reads_as_zero() {
        let state = LedgerState::new(DEFAULT_INTEREST_RATE);
        let account = state.account(&"nobody".into());
        assert_eq!(account, HolderAccount::default());
        assert_eq!(account.displayed_balance(1_000_000), 0);
    }

    #[test]
    fn settle_moves_interest_into_principal() {
        let account = HolderAccount {
            principal: 100_000,
            locked_rate: DEFAULT_INTEREST_RATE,
            last_settled: 0,
        };
        let (settled, interest) = account.settled(3_600).unwrap();
        assert_eq!(interest, 18);
        assert_eq!(settled.principal, 100_018);
        assert_eq!(settled.last_settled, 3_600);
        assert_eq!(settled.locked_rate, DEFAULT_INTEREST_RATE);
    }

    #[test]
    fn settle_is_idempotent_at_the_same_time() {
        let account = HolderAccount {
            principal: 5_000_000,
            locked_rate: DEFAULT_INTEREST_RATE,
            last_settled: 10,
        };
        let (once, _) = account.settled(10_000).unwrap();
        let (twice, interest) = once.settled(10_000).unwrap();
        assert_eq!(interest, 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn settle_resets_clock_for_empty_account() {
        let account = HolderAccount {
            principal: 0,
            locked_rate: DEFAULT_INTEREST_RATE,
            last_settled: 0,
        };
        let (settled, interest) = account.settled(9_999).unwrap();
        assert_eq!(interest, 0);
        assert_eq!(settled.last_settled, 9_999);
    }

    #[test]
    fn zero_allowance_removes_entry() {
        let mut state = LedgerState::new(0);
        let (alice, bob) = (Address::from("alice"), Address::from("bob"));
        state.set_allowance(&alice, &bob, 50);
        assert_eq!(state.allowance(&alice, &bob), 50);
        state.set_allowance(&alice, &bob, 0);
        assert_eq!(state.allowance(&alice, &bob), 0);
        assert_eq!(state.allowances().count(), 0);
    }

    #[test]
    fn audit_matches_sum_of_principal() {
        let mut state = LedgerState::new(0);
        for (name, principal) in [("a", 10u128), ("b", 20), ("c", 30)] {
            state.put_account(
                &name.into(),
                HolderAccount {
                    principal,
                    ..Default::default()
                },
            );
        }
        assert_eq!(state.audit_total_principal(), Some(60));
    }
}
