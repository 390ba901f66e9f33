//! Cross-chain tests: two independent hosts with their own clocks, joined
//! by hand-delivered bridge messages.

use std::sync::Arc;

use rebase_contracts::chain::{Chain, ChainError};
use rebase_contracts::token_pool::PoolError;
use rebase_protocol::config::{LedgerConfig, DEFAULT_INTEREST_RATE, FULL_BALANCE};
use rebase_protocol::runtime::ManualClock;
use rebase_protocol::Address;

const SOURCE: u64 = 1;
const DEST: u64 = 2;

fn chain(selector: u64, remote: u64) -> (Chain, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0));
    let config = LedgerConfig {
        chain_selector: selector,
        ..LedgerConfig::default()
    };
    let owner = Address::from("owner");
    let mut chain = Chain::deploy(&config, owner.clone(), clock.clone()).unwrap();
    chain.apply_chain_updates(&owner, &[remote], &[]).unwrap();
    (chain, clock)
}

#[test]
fn bridged_credit_keeps_its_rate() {
    let (mut source, source_clock) = chain(SOURCE, DEST);
    let (mut dest, _) = chain(DEST, SOURCE);
    let alice = Address::from("alice");
    let owner = Address::from("owner");

    source.bank_mut().credit(&alice, 100_000).unwrap();
    source.deposit(&alice, 100_000).unwrap();
    dest.set_interest_rate(&owner, 10_000_000_000).unwrap();
    source_clock.advance(3_600);

    let message = source
        .bridge_out(&alice, &alice, DEST, FULL_BALANCE)
        .unwrap();
    assert_eq!(message.amount, 100_018);
    assert_eq!(message.user_interest_rate, DEFAULT_INTEREST_RATE);
    assert_eq!(message.source_chain, SOURCE);
    assert_eq!(source.balance_of(&alice), 0);
    assert_eq!(source.token().total_supply(), 0);

    dest.bridge_in(&owner, &message).unwrap();
    assert_eq!(dest.balance_of(&alice), 100_018);
    assert_eq!(dest.token().user_interest_rate(&alice), DEFAULT_INTEREST_RATE);
    assert_eq!(dest.token().interest_rate(), 10_000_000_000);
}

#[test]
fn bridge_out_to_disabled_chain_rejected() {
    let (mut source, _) = chain(SOURCE, DEST);
    let alice = Address::from("alice");
    source.bank_mut().credit(&alice, 10).unwrap();
    source.deposit(&alice, 10).unwrap();

    let err = source.bridge_out(&alice, &alice, 99, 10).unwrap_err();
    assert_eq!(err, ChainError::Pool(PoolError::UnsupportedChain(99)));
    assert_eq!(source.balance_of(&alice), 10);
}

#[test]
fn relayer_gate_applies_to_delivery() {
    let (mut source, _) = chain(SOURCE, DEST);
    let (mut dest, _) = chain(DEST, SOURCE);
    let alice = Address::from("alice");
    source.bank_mut().credit(&alice, 10).unwrap();
    source.deposit(&alice, 10).unwrap();
    let message = source.bridge_out(&alice, &"bob".into(), DEST, 10).unwrap();

    let relay = Address::from("relay");
    assert!(dest.bridge_in(&relay, &message).unwrap_err().is_unauthorized());

    dest.grant_relayer(&"owner".into(), &relay).unwrap();
    assert_eq!(dest.bridge_in(&relay, &message).unwrap(), 10);
    assert_eq!(dest.balance_of(&"bob".into()), 10);
}

#[test]
fn message_for_another_chain_rejected() {
    let (mut source, _) = chain(SOURCE, DEST);
    let alice = Address::from("alice");
    source.bank_mut().credit(&alice, 10).unwrap();
    source.deposit(&alice, 10).unwrap();
    let message = source.bridge_out(&alice, &alice, DEST, 10).unwrap();

    // Delivering back to the source chain is a routing error.
    let err = source.bridge_in(&"owner".into(), &message).unwrap_err();
    assert!(matches!(
        err,
        ChainError::Pool(PoolError::WrongDestination { .. })
    ));
}

#[test]
fn message_json_is_flat() {
    let (mut source, _) = chain(SOURCE, DEST);
    let alice = Address::from("alice");
    source.bank_mut().credit(&alice, 10).unwrap();
    source.deposit(&alice, 10).unwrap();
    let message = source.bridge_out(&alice, &"bob".into(), DEST, 10).unwrap();

    let json = serde_json::to_value(&message).unwrap();
    assert_eq!(json["receiver"], "bob");
    assert_eq!(json["dest_chain"], DEST);
    assert_eq!(json["user_interest_rate"], DEFAULT_INTEREST_RATE as u64);
}
