//! # CLI Interface
//!
//! Defines the command-line argument structure for `rebase-node` using
//! `clap` derive. Every ledger operation is one subcommand run against the
//! chain persisted in the data directory; `simulate` runs in memory.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use rebase_protocol::config::FULL_BALANCE;
use rebase_protocol::{Amount, RatePerSecond, Timestamp};

/// Operator CLI for the rebase ledger.
///
/// Deploys a ledger, vault and bridge pool into a data directory and runs
/// one operation per invocation against the persisted state.
#[derive(Parser, Debug)]
#[command(
    name = "rebase-node",
    about = "Operator CLI for the rebase ledger",
    version,
    propagate_version = true
)]
pub struct RebaseNodeCli {
    /// Directory holding the ledger database.
    #[arg(long, short = 'd', env = "REBASE_DATA_DIR", default_value = "./rebase-data", global = true)]
    pub data_dir: PathBuf,

    /// Run the command at this unix time instead of the wall clock.
    #[arg(long, env = "REBASE_AT", global = true)]
    pub at: Option<Timestamp>,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "REBASE_LOG_FORMAT", default_value = "pretty", global = true)]
    pub log_format: String,

    /// Default log filter when `RUST_LOG` is not set.
    #[arg(long, env = "REBASE_LOG", default_value = "rebase_node=info,rebase_contracts=info,rebase_protocol=warn", global = true)]
    pub log_level: String,

    /// Print Prometheus metrics after the command.
    #[arg(long, env = "REBASE_METRICS", global = true)]
    pub metrics: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy a fresh ledger, vault and pool into the data directory.
    Init(InitArgs),
    /// Credit native base asset to an account (test networks only).
    Faucet {
        account: String,
        #[arg(value_parser = parse_amount)]
        amount: Amount,
    },
    /// Mark whether an account accepts incoming native value.
    AcceptValue {
        account: String,
        #[arg(action = clap::ArgAction::Set)]
        accepts: bool,
    },
    /// Exchange native value for ledger credit.
    Deposit {
        caller: String,
        #[arg(value_parser = parse_amount)]
        amount: Amount,
    },
    /// Exchange ledger credit for native value. `max` redeems everything.
    Redeem {
        caller: String,
        #[arg(value_parser = parse_amount)]
        amount: Amount,
    },
    /// Move credit between holders.
    Transfer {
        caller: String,
        to: String,
        #[arg(value_parser = parse_amount)]
        amount: Amount,
    },
    /// Set a spender's allowance. `max` is unlimited.
    Approve {
        caller: String,
        spender: String,
        #[arg(value_parser = parse_amount)]
        amount: Amount,
    },
    /// Move credit on behalf of `from`, spending the caller's allowance.
    TransferFrom {
        caller: String,
        from: String,
        to: String,
        #[arg(value_parser = parse_amount)]
        amount: Amount,
    },
    /// Mint directly; the caller needs the mint-and-burn role.
    Mint {
        caller: String,
        to: String,
        #[arg(value_parser = parse_amount)]
        amount: Amount,
    },
    /// Burn directly; the caller needs the mint-and-burn role.
    Burn {
        caller: String,
        from: String,
        #[arg(value_parser = parse_amount)]
        amount: Amount,
    },
    /// Lower the global interest rate (owner only).
    SetRate { caller: String, rate: RatePerSecond },
    /// Grant the mint-and-burn role (owner only).
    GrantRole { caller: String, account: String },
    /// Revoke the mint-and-burn role (owner only).
    RevokeRole { caller: String, account: String },
    /// Hand ledger ownership to another account (owner only).
    TransferOwnership { caller: String, new_owner: String },
    /// Enable or disable remote chains on the bridge pool (owner only).
    ChainUpdate(ChainUpdateArgs),
    /// Burn credit for delivery to another chain; prints the message JSON.
    BridgeOut(BridgeOutArgs),
    /// Deliver a bridge message produced on another chain.
    BridgeIn {
        caller: String,
        /// Path to the message JSON written by `bridge-out`.
        message: PathBuf,
    },
    /// Show a holder's balance, principal, rate and settlement time.
    Balance { account: String },
    /// Show ledger-wide state.
    Status,
    /// Replay a deposit and watch it grow, entirely in memory.
    Simulate(SimulateArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `init` subcommand.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Ledger owner.
    #[arg(long, env = "REBASE_OWNER", default_value = "owner")]
    pub owner: String,

    /// Ledger configuration file (TOML). Defaults apply when omitted.
    #[arg(long, short = 'c', env = "REBASE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Arguments for the `chain-update` subcommand.
#[derive(Args, Debug)]
pub struct ChainUpdateArgs {
    pub caller: String,
    /// Chain selectors to enable.
    #[arg(long, value_delimiter = ',')]
    pub add: Vec<u64>,
    /// Chain selectors to disable.
    #[arg(long, value_delimiter = ',')]
    pub remove: Vec<u64>,
}

/// Arguments for the `bridge-out` subcommand.
#[derive(Args, Debug)]
pub struct BridgeOutArgs {
    pub caller: String,
    pub receiver: String,
    pub dest_chain: u64,
    #[arg(value_parser = parse_amount)]
    pub amount: Amount,
    /// Write the message here instead of stdout.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

/// Arguments for the `simulate` subcommand.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Amount deposited at time zero.
    #[arg(long, default_value_t = 100_000)]
    pub deposit: Amount,

    /// Simulated duration in hours.
    #[arg(long, default_value_t = 24)]
    pub hours: u64,

    /// Lower the global rate to this value halfway through.
    #[arg(long)]
    pub lower_rate_to: Option<RatePerSecond>,
}

/// Parses an amount. `max` stands for the full-balance / unlimited sentinel.
pub fn parse_amount(raw: &str) -> Result<Amount, String> {
    if raw.eq_ignore_ascii_case("max") {
        return Ok(FULL_BALANCE);
    }
    raw.replace('_', "")
        .parse::<Amount>()
        .map_err(|e| format!("invalid amount {raw:?}: {e}"))
}
