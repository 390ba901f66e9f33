//! Integration tests for the vault.
//!
//! Deposits and redemptions go through [`Chain`], so the rollback of a
//! rejected payout is exercised exactly as a host would run it.

use std::sync::Arc;

use rebase_contracts::chain::{Chain, ChainError};
use rebase_contracts::vault::VaultError;
use rebase_protocol::bank::BankError;
use rebase_protocol::config::{LedgerConfig, FULL_BALANCE};
use rebase_protocol::runtime::ManualClock;
use rebase_protocol::Address;

fn deployed() -> (Chain, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let chain = Chain::deploy(&LedgerConfig::default(), "owner".into(), clock.clone()).unwrap();
    (chain, clock)
}

#[test]
fn deposit_then_immediate_full_redeem() {
    let (mut chain, _) = deployed();
    let alice = Address::from("alice");
    chain.bank_mut().credit(&alice, 100_000).unwrap();

    chain.deposit(&alice, 100_000).unwrap();
    assert_eq!(chain.balance_of(&alice), 100_000);
    assert_eq!(chain.vault().reserves(chain.bank()), 100_000);

    let redeemed = chain.redeem(&alice, FULL_BALANCE).unwrap();
    assert_eq!(redeemed, 100_000);
    assert_eq!(chain.balance_of(&alice), 0);
    assert_eq!(chain.bank().balance_of(&alice), 100_000);
    assert_eq!(chain.token().total_supply(), 0);
}

#[test]
fn redeem_with_interest_needs_reserves() {
    let (mut chain, clock) = deployed();
    let alice = Address::from("alice");
    chain.bank_mut().credit(&alice, 100_000).unwrap();
    chain.deposit(&alice, 100_000).unwrap();
    clock.advance(3_600);

    // The vault only holds the principal; interest must be funded.
    let err = chain.redeem(&alice, FULL_BALANCE).unwrap_err();
    assert!(matches!(
        err,
        ChainError::Vault(VaultError::RedeemTransferFailed {
            source: BankError::InsufficientFunds { .. },
            ..
        })
    ));
    assert_eq!(chain.balance_of(&alice), 100_018);

    let vault = chain.vault().address().clone();
    chain.bank_mut().credit(&vault, 18).unwrap();
    assert_eq!(chain.redeem(&alice, FULL_BALANCE).unwrap(), 100_018);
    assert_eq!(chain.bank().balance_of(&alice), 100_018);
}

#[test]
fn rejected_payout_rolls_back_the_burn() {
    let (mut chain, clock) = deployed();
    let alice = Address::from("alice");
    chain.bank_mut().credit(&alice, 100_000).unwrap();
    chain.deposit(&alice, 100_000).unwrap();
    clock.advance(60);

    chain.bank_mut().set_accepts_value(&alice, false);
    let before = chain.state().clone();

    let err = chain.redeem(&alice, 50_000).unwrap_err();
    assert_eq!(
        err,
        ChainError::Vault(VaultError::RedeemTransferFailed {
            recipient: alice.clone(),
            source: BankError::RecipientRejected(alice.clone()),
        })
    );
    assert_eq!(chain.state(), &before);
    assert_eq!(chain.token().principal_balance_of(&alice), 100_000);
    assert_eq!(chain.vault().reserves(chain.bank()), 100_000);
}

#[test]
fn zero_value_deposit_rejected() {
    let (mut chain, _) = deployed();
    let err = chain.deposit(&"alice".into(), 0).unwrap_err();
    assert_eq!(err, ChainError::Vault(VaultError::ZeroAmount));
}

#[test]
fn unfunded_deposit_rejected() {
    let (mut chain, _) = deployed();
    let err = chain.deposit(&"alice".into(), 1).unwrap_err();
    assert!(matches!(err, ChainError::Vault(VaultError::Funding(_))));
    assert_eq!(chain.token().total_supply(), 0);
}

#[test]
fn vault_without_role_cannot_mint() {
    let (mut chain, _) = deployed();
    let owner = Address::from("owner");
    let vault = chain.vault().address().clone();
    chain.revoke_mint_and_burn_role(&owner, &vault).unwrap();

    let alice = Address::from("alice");
    chain.bank_mut().credit(&alice, 10).unwrap();
    let err = chain.deposit(&alice, 10).unwrap_err();
    assert!(err.is_unauthorized());
    // The base asset went back to alice with the rollback.
    assert_eq!(chain.bank().balance_of(&alice), 10);
}
