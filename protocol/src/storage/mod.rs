//! # Storage Module
//!
//! The ledger's state model and its persistence layer.
//!
//! ## Architecture
//!
//! ```text
//! state.rs : HolderAccount, GlobalRateState, LedgerState (in-memory store)
//! db.rs    : sled persistence with one tree per table
//! ```
//!
//! Contracts operate on [`LedgerState`] by reference. The host decides when
//! a committed state is written to a [`LedgerDB`]; the database never sees
//! an operation that later rolled back.
//!
//! Bincode for on-disk records, JSON for humans.

pub mod db;
pub mod state;

pub use db::{DbError, DbResult, LedgerDB, MetaRecord};
pub use state::{GlobalRateState, HolderAccount, LedgerState};
