//! # Interest Accrual Arithmetic
//!
//! Balances grow linearly between settlements:
//!
//! ```text
//! factor(t)    = PRECISION + locked_rate * (t - last_settled)
//! displayed(t) = floor(principal * factor(t) / PRECISION)
//! ```
//!
//! Growth never compounds inside one settlement interval; compounding only
//! happens when a mutation settles the accrued interest into principal.
//! Division floors, so any dust below the fixed-point precision stays with
//! the ledger and never with the holder.
//!
//! The product `principal * factor` can exceed 128 bits for large balances
//! held for a long time, so it is computed in 256 bits.

use primitive_types::U256;

use crate::config::PRECISION_FACTOR;
use crate::types::{Amount, RatePerSecond, Timestamp};

/// Largest value the read path reports when the true displayed balance does
/// not fit in a `u128`. Kept one below [`crate::config::FULL_BALANCE`] so a
/// read can never be mistaken for the sentinel.
pub const MAX_DISPLAYED_BALANCE: Amount = u128::MAX - 1;

/// Seconds elapsed since `last_settled`. A host clock that reports a time
/// before the last settlement yields zero rather than negative growth.
pub fn elapsed_seconds(last_settled: Timestamp, now: Timestamp) -> u64 {
    now.saturating_sub(last_settled)
}

/// The multiplicative accrual factor, scaled by `PRECISION_FACTOR`.
///
/// Equals exactly `PRECISION_FACTOR` when no time has elapsed.
pub fn accrual_factor(rate: RatePerSecond, last_settled: Timestamp, now: Timestamp) -> U256 {
    let elapsed = U256::from(elapsed_seconds(last_settled, now));
    // rate < 2^128 and elapsed < 2^64, so neither step can overflow 256 bits.
    U256::from(PRECISION_FACTOR) + U256::from(rate) * elapsed
}

/// Displayed balance at `now`, or `None` if it does not fit in a `u128`.
pub fn checked_displayed_balance(
    principal: Amount,
    rate: RatePerSecond,
    last_settled: Timestamp,
    now: Timestamp,
) -> Option<Amount> {
    if principal == 0 {
        return Some(0);
    }
    let factor = accrual_factor(rate, last_settled, now);
    let scaled = U256::from(principal).checked_mul(factor)?;
    let balance = scaled / U256::from(PRECISION_FACTOR);
    if balance > U256::from(u128::MAX) {
        return None;
    }
    Some(balance.low_u128())
}

/// Displayed balance at `now`, saturating at [`MAX_DISPLAYED_BALANCE`].
pub fn displayed_balance(
    principal: Amount,
    rate: RatePerSecond,
    last_settled: Timestamp,
    now: Timestamp,
) -> Amount {
    checked_displayed_balance(principal, rate, last_settled, now)
        .map(|b| b.min(MAX_DISPLAYED_BALANCE))
        .unwrap_or(MAX_DISPLAYED_BALANCE)
}

/// Interest accrued since `last_settled` and not yet materialized as
/// principal, or `None` on overflow.
pub fn accrued_interest(
    principal: Amount,
    rate: RatePerSecond,
    last_settled: Timestamp,
    now: Timestamp,
) -> Option<Amount> {
    let displayed = checked_displayed_balance(principal, rate, last_settled, now)?;
    // factor >= PRECISION_FACTOR, so displayed >= principal.
    Some(displayed - principal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_INTEREST_RATE;
    use proptest::prelude::*;

    #[test]
    fn factor_is_identity_without_elapsed_time() {
        assert_eq!(
            accrual_factor(DEFAULT_INTEREST_RATE, 1_000, 1_000),
            U256::from(PRECISION_FACTOR)
        );
    }

    #[test]
    fn one_hour_at_default_rate() {
        // 100_000 * (1e18 + 5e10 * 3600) / 1e18 = 100_018
        assert_eq!(displayed_balance(100_000, DEFAULT_INTEREST_RATE, 0, 3_600), 100_018);
        assert_eq!(accrued_interest(100_000, DEFAULT_INTEREST_RATE, 0, 3_600), Some(18));
    }

    #[test]
    fn dust_rounds_down() {
        // 1 * (1e18 + 5e10) / 1e18 = 1.00000005 -> 1
        assert_eq!(displayed_balance(1, DEFAULT_INTEREST_RATE, 0, 1), 1);
    }

    #[test]
    fn zero_principal_never_grows() {
        assert_eq!(displayed_balance(0, DEFAULT_INTEREST_RATE, 0, u64::MAX), 0);
    }

    #[test]
    fn clock_before_last_settlement_means_no_growth() {
        assert_eq!(elapsed_seconds(500, 100), 0);
        assert_eq!(displayed_balance(1_000, DEFAULT_INTEREST_RATE, 500, 100), 1_000);
    }

    #[test]
    fn large_principal_does_not_overflow_128_bits_midway() {
        // 1e9 tokens at 18 decimals held for a year.
        let principal: Amount = 1_000_000_000 * PRECISION_FACTOR;
        let year = 365 * 24 * 3_600;
        let balance = checked_displayed_balance(principal, DEFAULT_INTEREST_RATE, 0, year);
        assert!(balance.is_some());
        assert!(balance.unwrap() > principal);
    }

    #[test]
    fn unrepresentable_balance_saturates_on_read() {
        assert_eq!(
            checked_displayed_balance(u128::MAX / 2, PRECISION_FACTOR - 1, 0, 10),
            None
        );
        assert_eq!(
            displayed_balance(u128::MAX / 2, PRECISION_FACTOR - 1, 0, 10),
            MAX_DISPLAYED_BALANCE
        );
    }

    proptest! {
        #[test]
        fn prop_balance_is_monotonic_in_time(
            principal in 0u128..=1_000_000_000_000_000_000_000_000u128,
            rate in 0u128..1_000_000_000_000u128,
            t1 in 0u64..10_000_000u64,
            dt in 0u64..10_000_000u64,
        ) {
            let b1 = displayed_balance(principal, rate, 0, t1);
            let b2 = displayed_balance(principal, rate, 0, t1 + dt);
            prop_assert!(b2 >= b1);
        }

        #[test]
        fn prop_growth_is_linear_within_one_unit(
            principal in 1u128..=1_000_000_000_000_000_000_000u128,
            rate in 1u128..1_000_000_000_000u128,
            interval in 1u64..1_000_000u64,
        ) {
            let b0 = displayed_balance(principal, rate, 0, 0);
            let b1 = displayed_balance(principal, rate, 0, interval);
            let b2 = displayed_balance(principal, rate, 0, 2 * interval);
            let first = b1 - b0;
            let second = b2 - b1;
            prop_assert!(first.abs_diff(second) <= 1);
        }
    }
}
