// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Rebase Protocol: Core Library
//!
//! Primitives for an interest-accruing ledger whose balances grow every
//! second without discrete rebase events. Holders lock in the global rate
//! when they are funded; the global rate can only ever go down.
//!
//! ## Architecture
//!
//! - **types**: addresses and numeric aliases.
//! - **config**: constants and the loadable [`config::LedgerConfig`].
//! - **accrual**: the fixed-point balance formula. The only place that
//!   multiplies rates by time.
//! - **access**: owner and role capability checkers.
//! - **runtime**: per-call context and clocks.
//! - **bank**: the host's native base-asset balances.
//! - **events**: typed notifications and the per-contract event log.
//! - **storage**: the explicit ledger store and its sled persistence.
//!
//! ## Design Philosophy
//!
//! 1. Integer math only. Rounding always favors the ledger.
//! 2. State is passed explicitly; nothing hides in globals.
//! 3. Every operation either commits fully or not at all.
//! 4. If it touches money, it has tests. Plural.

pub mod access;
pub mod accrual;
pub mod bank;
pub mod config;
pub mod events;
pub mod runtime;
pub mod storage;
pub mod types;

pub use types::{Address, Amount, RatePerSecond, Timestamp};
