//! # Rebase Protocol Contracts
//!
//! On-chain logic for an interest-bearing credit ledger:
//!
//! - **Rebase Token**: the ledger. Balances grow linearly with time at a
//!   per-holder locked rate; interest is materialized lazily whenever a
//!   holder is touched.
//! - **Vault**: swaps the native base asset 1:1 for ledger credit and back.
//! - **Token Pool**: burns on one chain and re-mints on another, carrying
//!   the holder's locked rate along.
//! - **Chain**: the host that runs calls against all three as
//!   all-or-nothing transactions.
//!
//! ## Design Principles
//!
//! 1. All monetary operations check for overflow. Growth math runs in 256
//!    bits and results are narrowed explicitly.
//! 2. Every balance mutation settles the holders it touches first.
//! 3. Capabilities gate every privileged operation and are checked before
//!    any state is read for writing.
//! 4. Every public type is serializable (serde) for persistence.

pub mod chain;
pub mod rebase_token;
pub mod token_pool;
pub mod vault;

pub use chain::{Chain, ChainError, ChainState};
pub use rebase_token::{RebaseToken, TokenDescriptor, TokenError};
pub use token_pool::{BridgeMessage, PoolError, RebaseTokenPool};
pub use vault::{Vault, VaultError};
