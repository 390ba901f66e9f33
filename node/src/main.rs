// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Rebase Node
//!
//! Entry point for the `rebase-node` binary. Parses CLI arguments,
//! initializes logging and metrics, loads the chain from the data directory,
//! runs one operation as a transaction and saves the result.
//!
//! - `init`    : deploy ledger, vault and pool
//! - `deposit`, `redeem`, `transfer`, ...: one ledger operation each
//! - `balance`, `status`: read-only queries
//! - `simulate`: an in-memory growth scenario
//! - `version` : print build version information

mod cli;
mod logging;
mod metrics;
mod store;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};
use clap::Parser;

use rebase_contracts::chain::{Chain, ChainError};
use rebase_contracts::token_pool::BridgeMessage;
use rebase_protocol::config::{LedgerConfig, FULL_BALANCE};
use rebase_protocol::runtime::{Clock, ManualClock, SystemClock};
use rebase_protocol::{Address, Amount, Timestamp};

use cli::{Commands, RebaseNodeCli};
use logging::LogFormat;
use metrics::LedgerMetrics;
use store::ChainStore;

fn main() -> Result<()> {
    let cli = RebaseNodeCli::parse();
    logging::init_logging(&cli.log_level, LogFormat::from_str_lossy(&cli.log_format));

    let metrics = LedgerMetrics::new().context("failed to create metrics registry")?;
    let clock: Arc<dyn Clock> = match cli.at {
        Some(at) => Arc::new(ManualClock::new(at)),
        None => Arc::new(SystemClock),
    };

    let outcome = run(&cli, clock, &metrics);

    if cli.metrics {
        print!("{}", metrics.encode().context("failed to encode metrics")?);
    }
    outcome
}

fn run(cli: &RebaseNodeCli, clock: Arc<dyn Clock>, metrics: &LedgerMetrics) -> Result<()> {
    match &cli.command {
        Commands::Version => {
            print_version();
            Ok(())
        }
        Commands::Simulate(args) => simulate(args, metrics),
        Commands::Init(args) => init(cli, args, clock, metrics),
        command => {
            let store = ChainStore::open(&cli.data_dir)?;
            let mut chain = Chain::from_state(store.load()?, clock);
            let mutated = execute(command, &mut chain, metrics)?;
            if mutated {
                for record in chain.take_events() {
                    tracing::debug!(emitter = %record.emitter, at = record.at, event = ?record.event, "emitted");
                }
                store.save(chain.state())?;
            }
            metrics.record_state(chain.state());
            Ok(())
        }
    }
}

/// Deploys a fresh chain into the data directory.
fn init(
    cli: &RebaseNodeCli,
    args: &cli::InitArgs,
    clock: Arc<dyn Clock>,
    metrics: &LedgerMetrics,
) -> Result<()> {
    let config = match &args.config {
        Some(path) => LedgerConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => LedgerConfig::default(),
    };

    let store = ChainStore::open(&cli.data_dir)?;
    if store.is_initialized()? {
        bail!("{} already holds a deployed ledger", cli.data_dir.display());
    }

    let mut chain = Chain::deploy(&config, Address::from(args.owner.as_str()), clock)?;
    chain.take_events();
    store.save(chain.state())?;
    metrics.observe("init", true);
    metrics.record_state(chain.state());

    let token = chain.token();
    println!("Ledger deployed.");
    println!("  Data directory : {}", cli.data_dir.display());
    println!("  Token          : {} ({}) at {}", token.name(), token.symbol(), token.address());
    println!("  Owner          : {}", token.owner());
    println!("  Vault          : {}", chain.vault().address());
    println!("  Pool           : {} (chain {})", chain.pool().address(), chain.pool().chain_selector());
    println!("  Interest rate  : {}", token.interest_rate());
    Ok(())
}

/// Runs one command against a loaded chain. Returns whether state changed.
fn execute(command: &Commands, chain: &mut Chain, metrics: &LedgerMetrics) -> Result<bool> {
    let op = op_name(command);
    let result: Result<Option<String>, ChainError> = match command {
        Commands::Faucet { account, amount } => chain
            .bank_mut()
            .credit(&account.as_str().into(), *amount)
            .map(|balance| Some(format!("{account} native balance: {balance}")))
            .map_err(ChainError::from),
        Commands::AcceptValue { account, accepts } => {
            chain.bank_mut().set_accepts_value(&account.as_str().into(), *accepts);
            Ok(Some(format!("{account} accepts value: {accepts}")))
        }
        Commands::Deposit { caller, amount } => chain
            .deposit(&caller.as_str().into(), *amount)
            .map(|minted| Some(format!("deposited {minted}"))),
        Commands::Redeem { caller, amount } => chain
            .redeem(&caller.as_str().into(), *amount)
            .map(|paid| Some(format!("redeemed {paid}"))),
        Commands::Transfer { caller, to, amount } => chain
            .transfer(&caller.as_str().into(), &to.as_str().into(), *amount)
            .map(|_| None),
        Commands::Approve { caller, spender, amount } => chain
            .approve(&caller.as_str().into(), &spender.as_str().into(), *amount)
            .map(|_| None),
        Commands::TransferFrom { caller, from, to, amount } => chain
            .transfer_from(
                &caller.as_str().into(),
                &from.as_str().into(),
                &to.as_str().into(),
                *amount,
            )
            .map(|_| None),
        Commands::Mint { caller, to, amount } => chain
            .mint(&caller.as_str().into(), &to.as_str().into(), *amount)
            .map(|_| None),
        Commands::Burn { caller, from, amount } => chain
            .burn(&caller.as_str().into(), &from.as_str().into(), *amount)
            .map(|burned| Some(format!("burned {burned}"))),
        Commands::SetRate { caller, rate } => chain
            .set_interest_rate(&caller.as_str().into(), *rate)
            .map(|_| None),
        Commands::GrantRole { caller, account } => chain
            .grant_mint_and_burn_role(&caller.as_str().into(), &account.as_str().into())
            .map(|granted| (!granted).then(|| format!("{account} already holds the role"))),
        Commands::RevokeRole { caller, account } => chain
            .revoke_mint_and_burn_role(&caller.as_str().into(), &account.as_str().into())
            .map(|revoked| (!revoked).then(|| format!("{account} did not hold the role"))),
        Commands::TransferOwnership { caller, new_owner } => chain
            .transfer_ownership(&caller.as_str().into(), &new_owner.as_str().into())
            .map(|_| None),
        Commands::ChainUpdate(args) => chain
            .apply_chain_updates(&args.caller.as_str().into(), &args.add, &args.remove)
            .map(|_| None),
        Commands::BridgeOut(args) => {
            let message = chain.bridge_out(
                &args.caller.as_str().into(),
                &args.receiver.as_str().into(),
                args.dest_chain,
                args.amount,
            );
            match message {
                Ok(message) => {
                    let json = serde_json::to_string_pretty(&message)?;
                    match &args.out {
                        Some(path) => std::fs::write(path, json).with_context(|| {
                            format!("failed to write message to {}", path.display())
                        })?,
                        None => println!("{json}"),
                    }
                    Ok(None)
                }
                Err(err) => Err(err),
            }
        }
        Commands::BridgeIn { caller, message } => {
            let raw = std::fs::read_to_string(message)
                .with_context(|| format!("failed to read {}", message.display()))?;
            let message: BridgeMessage =
                serde_json::from_str(&raw).context("malformed bridge message")?;
            chain
                .bridge_in(&caller.as_str().into(), &message)
                .map(|minted| Some(format!("released {minted} to {}", message.receiver)))
        }
        Commands::Balance { account } => {
            print_balance(chain, &account.as_str().into());
            return Ok(false);
        }
        Commands::Status => {
            print_status(chain);
            return Ok(false);
        }
        Commands::Init(_) | Commands::Simulate(_) | Commands::Version => return Ok(false),
    };

    metrics.observe(op, result.is_ok());
    match result {
        Ok(Some(line)) => {
            println!("{line}");
            Ok(true)
        }
        Ok(None) => Ok(true),
        Err(err) => Err(err).with_context(|| format!("{op} failed")),
    }
}

fn op_name(command: &Commands) -> &'static str {
    match command {
        Commands::Init(_) => "init",
        Commands::Faucet { .. } => "faucet",
        Commands::AcceptValue { .. } => "accept_value",
        Commands::Deposit { .. } => "deposit",
        Commands::Redeem { .. } => "redeem",
        Commands::Transfer { .. } => "transfer",
        Commands::Approve { .. } => "approve",
        Commands::TransferFrom { .. } => "transfer_from",
        Commands::Mint { .. } => "mint",
        Commands::Burn { .. } => "burn",
        Commands::SetRate { .. } => "set_interest_rate",
        Commands::GrantRole { .. } => "grant_mint_and_burn_role",
        Commands::RevokeRole { .. } => "revoke_mint_and_burn_role",
        Commands::TransferOwnership { .. } => "transfer_ownership",
        Commands::ChainUpdate(_) => "apply_chain_updates",
        Commands::BridgeOut(_) => "lock_or_burn",
        Commands::BridgeIn { .. } => "release_or_mint",
        Commands::Balance { .. } => "balance_of",
        Commands::Status => "status",
        Commands::Simulate(_) => "simulate",
        Commands::Version => "version",
    }
}

fn print_balance(chain: &Chain, account: &Address) {
    let token = chain.token();
    let now = chain.now();
    println!("{account}");
    println!("  Balance       : {}", token.balance_of(account, now));
    println!("  Principal     : {}", token.principal_balance_of(account));
    println!("  Interest rate : {}", token.user_interest_rate(account));
    println!("  Last settled  : {}", format_time(token.user_last_settled(account)));
    println!("  Native        : {}", chain.bank().balance_of(account));
}

fn print_status(chain: &Chain) {
    let token = chain.token();
    println!("{} ({}), {} decimals", token.name(), token.symbol(), token.decimals());
    println!("  Now            : {}", format_time(chain.now()));
    println!("  Owner          : {}", token.owner());
    println!("  Interest rate  : {}", token.interest_rate());
    println!("  Total supply   : {}", token.total_supply());
    println!("  Holders        : {}", token.state().holder_count());
    let minters = &token.descriptor().minters;
    let members: Vec<String> = minters.members().map(|m| m.to_string()).collect();
    println!("  Minters        : [{}] ({})", members.join(", "), minters.capability());
    println!("  Vault reserves : {}", chain.vault().reserves(chain.bank()));
    println!("  Base asset     : {} in circulation", chain.bank().total());
    let chains: Vec<String> = chain.pool().supported_chains().map(|c| c.to_string()).collect();
    println!(
        "  Pool           : chain {}, remotes [{}]",
        chain.pool().chain_selector(),
        chains.join(", ")
    );
}

fn format_time(ts: Timestamp) -> String {
    match Utc.timestamp_opt(ts as i64, 0).single() {
        Some(dt) => format!("{} ({ts})", dt.to_rfc3339()),
        None => ts.to_string(),
    }
}

/// Deposits, then reports the balance every hour. Optionally lowers the
/// global rate halfway and shows that the depositor keeps its rate while a
/// later depositor gets the new one.
fn simulate(args: &cli::SimulateArgs, metrics: &LedgerMetrics) -> Result<()> {
    const HOUR: u64 = 3_600;
    let clock = Arc::new(ManualClock::new(0));
    let owner = Address::from("owner");
    let (alice, bob) = (Address::from("alice"), Address::from("bob"));
    let mut chain = Chain::deploy(&LedgerConfig::default(), owner.clone(), clock.clone())?;

    chain.bank_mut().credit(&alice, args.deposit)?;
    chain.bank_mut().credit(&bob, args.deposit)?;
    chain.deposit(&alice, args.deposit)?;
    metrics.observe("deposit", true);

    println!("{:>6}  {:>24}  {:>24}", "hour", "alice", "bob");
    for hour in 0..=args.hours {
        if hour == args.hours / 2 {
            if let Some(rate) = args.lower_rate_to {
                let lowered = chain.set_interest_rate(&owner, rate);
                metrics.observe("set_interest_rate", lowered.is_ok());
                lowered?;
                chain.deposit(&bob, args.deposit)?;
                metrics.observe("deposit", true);
            }
        }
        println!(
            "{:>6}  {:>24}  {:>24}",
            hour,
            chain.balance_of(&alice),
            chain.balance_of(&bob)
        );
        clock.advance(HOUR);
    }

    let redeemable: Amount = chain.balance_of(&alice);
    println!(
        "alice: rate {}, redeemable {} ({} interest)",
        chain.token().user_interest_rate(&alice),
        redeemable,
        redeemable.saturating_sub(args.deposit)
    );
    if chain.token().principal_balance_of(&bob) > 0 {
        println!("bob:   rate {}", chain.token().user_interest_rate(&bob));
    }

    // The vault only holds deposits; it cannot pay out interest unfunded.
    let full = chain.redeem(&alice, FULL_BALANCE);
    metrics.observe("redeem", full.is_ok());
    match full {
        Ok(paid) => println!("redeemed {paid}"),
        Err(err) => println!("full redeem reverted: {err}"),
    }
    metrics.record_state(chain.state());
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("rebase-node {}", env!("CARGO_PKG_VERSION"));
    println!("rustc       {}", option_env!("RUSTC_VERSION").unwrap_or("unknown"));
}
