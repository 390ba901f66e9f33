//! # LedgerDB: Persistent Storage
//!
//! Persistence for the ledger, built on sled's embedded key-value store.
//!
//! ## Tree Layout
//!
//! | Tree         | Key                      | Value                     |
//! |--------------|--------------------------|---------------------------|
//! | `accounts`   | `address` (UTF-8)        | `bincode(HolderAccount)`  |
//! | `allowances` | `owner 0x00 spender`     | amount (16B BE)           |
//! | `metadata`   | key (UTF-8)              | `bincode(..)`             |
//!
//! The global rate and the running principal total live in `metadata`, next
//! to any auxiliary records the host wants to keep (role registries, vault
//! bindings, the native bank).
//!
//! ## Atomicity
//!
//! [`LedgerDB::put_state_with`] rewrites all three trees, plus any auxiliary
//! [`MetaRecord`]s, inside one sled transaction and flushes before
//! returning. A crash leaves either the old snapshot or the new one.

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Batch, Db, Transactional, Tree};

use super::state::{GlobalRateState, HolderAccount, LedgerState};
use crate::types::{Address, Amount};

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupt record in {tree}: {reason}")]
    Corrupt { tree: &'static str, reason: String },

    #[error("key not found: {0}")]
    NotFound(String),

    #[error("transaction aborted")]
    Aborted,
}

pub type DbResult<T> = Result<T, DbError>;

// ---------------------------------------------------------------------------
// Metadata Keys
// ---------------------------------------------------------------------------

const META_GLOBAL_RATE: &str = "global_rate";
const META_TOTAL_PRINCIPAL: &str = "total_principal";

const ALLOWANCE_SEPARATOR: u8 = 0x00;

// ---------------------------------------------------------------------------
// LedgerDB
// ---------------------------------------------------------------------------

/// Persistent storage engine for one ledger.
///
/// Cheap to clone; sled handles are reference counted and thread-safe.
#[derive(Debug, Clone)]
pub struct LedgerDB {
    db: Db,
    accounts: Tree,
    allowances: Tree,
    metadata: Tree,
}

impl LedgerDB {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that is cleaned up on drop.
    ///
    /// Ideal for unit tests: no filesystem side effects, no cleanup needed.
    pub fn open_temporary() -> DbResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        let accounts = db.open_tree("accounts")?;
        let allowances = db.open_tree("allowances")?;
        let metadata = db.open_tree("metadata")?;
        Ok(Self {
            db,
            accounts,
            allowances,
            metadata,
        })
    }

    /// `true` once a ledger state has been written.
    pub fn is_initialized(&self) -> DbResult<bool> {
        Ok(self.metadata.contains_key(META_GLOBAL_RATE)?)
    }

    // -- Ledger state -------------------------------------------------------

    /// Replaces the persisted ledger state with `state`.
    pub fn put_state(&self, state: &LedgerState) -> DbResult<()> {
        self.put_state_with(state, &[])
    }

    /// Replaces the persisted ledger state with `state` and writes `records`
    /// to the metadata tree in the same transaction.
    pub fn put_state_with(&self, state: &LedgerState, records: &[MetaRecord]) -> DbResult<()> {
        let mut account_batch = Batch::default();
        for key in self.accounts.iter().keys() {
            account_batch.remove(key?);
        }
        for (holder, account) in state.accounts() {
            account_batch.insert(holder.as_str().as_bytes(), encode(account)?);
        }

        let mut allowance_batch = Batch::default();
        for key in self.allowances.iter().keys() {
            allowance_batch.remove(key?);
        }
        for (owner, spender, amount) in state.allowances() {
            allowance_batch.insert(allowance_key(owner, spender), &amount.to_be_bytes()[..]);
        }

        let mut metadata_batch = Batch::default();
        metadata_batch.insert(META_GLOBAL_RATE.as_bytes(), encode(&state.global())?);
        metadata_batch.insert(META_TOTAL_PRINCIPAL.as_bytes(), encode(&state.total_principal())?);
        for record in records {
            metadata_batch.insert(record.key.as_bytes(), record.bytes.as_slice());
        }

        (&self.accounts, &self.allowances, &self.metadata)
            .transaction(|(accounts, allowances, metadata)| {
                accounts.apply_batch(&account_batch)?;
                allowances.apply_batch(&allowance_batch)?;
                metadata.apply_batch(&metadata_batch)?;
                Ok::<(), ConflictableTransactionError<()>>(())
            })
            .map_err(|err| match err {
                TransactionError::Storage(err) => DbError::Sled(err),
                TransactionError::Abort(()) => DbError::Aborted,
            })?;

        self.flush()?;
        tracing::debug!(
            holders = state.holder_count(),
            records = records.len(),
            "ledger state persisted"
        );
        Ok(())
    }

    /// Loads the persisted ledger state.
    ///
    /// Returns [`DbError::NotFound`] if nothing was ever written.
    pub fn load_state(&self) -> DbResult<LedgerState> {
        let global: GlobalRateState = self
            .get_meta(META_GLOBAL_RATE)?
            .ok_or_else(|| DbError::NotFound(META_GLOBAL_RATE.into()))?;
        let total_principal: Amount = self.get_meta(META_TOTAL_PRINCIPAL)?.unwrap_or(0);

        let mut accounts = BTreeMap::new();
        for entry in self.accounts.iter() {
            let (key, value) = entry?;
            let holder = utf8_address(&key, "accounts")?;
            let account: HolderAccount = decode(&value)?;
            accounts.insert(holder, account);
        }

        let mut allowances: BTreeMap<Address, BTreeMap<Address, Amount>> = BTreeMap::new();
        for entry in self.allowances.iter() {
            let (key, value) = entry?;
            let split = key
                .iter()
                .position(|b| *b == ALLOWANCE_SEPARATOR)
                .ok_or_else(|| DbError::Corrupt {
                    tree: "allowances",
                    reason: "missing separator".into(),
                })?;
            let owner = utf8_address(&key[..split], "allowances")?;
            let spender = utf8_address(&key[split + 1..], "allowances")?;
            let bytes: [u8; 16] = value.as_ref().try_into().map_err(|_| DbError::Corrupt {
                tree: "allowances",
                reason: format!("amount has {} bytes, expected 16", value.len()),
            })?;
            allowances
                .entry(owner)
                .or_default()
                .insert(spender, u128::from_be_bytes(bytes));
        }

        Ok(LedgerState::from_parts(
            global,
            accounts,
            allowances,
            total_principal,
        ))
    }

    // -- Metadata -----------------------------------------------------------

    /// Stores an arbitrary record under `key` in the metadata tree.
    pub fn put_meta<T: Serialize>(&self, key: &str, value: &T) -> DbResult<()> {
        self.metadata.insert(key.as_bytes(), encode(value)?)?;
        Ok(())
    }

    /// Reads a record from the metadata tree.
    pub fn get_meta<T: DeserializeOwned>(&self, key: &str) -> DbResult<Option<T>> {
        match self.metadata.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Flushes pending writes to disk.
    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

/// A pre-encoded metadata entry for [`LedgerDB::put_state_with`].
#[derive(Debug, Clone)]
pub struct MetaRecord {
    key: String,
    bytes: Vec<u8>,
}

impl MetaRecord {
    /// Encodes `value` for storage under `key`.
    pub fn new<T: Serialize>(key: impl Into<String>, value: &T) -> DbResult<Self> {
        Ok(Self {
            key: key.into(),
            bytes: encode(value)?,
        })
    }
}

fn encode<T: Serialize>(value: &T) -> DbResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| DbError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> DbResult<T> {
    bincode::deserialize(bytes).map_err(|e| DbError::Serialization(e.to_string()))
}

fn allowance_key(owner: &Address, spender: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(owner.as_str().len() + spender.as_str().len() + 1);
    key.extend_from_slice(owner.as_str().as_bytes());
    key.push(ALLOWANCE_SEPARATOR);
    key.extend_from_slice(spender.as_str().as_bytes());
    key
}

fn utf8_address(bytes: &[u8], tree: &'static str) -> DbResult<Address> {
    std::str::from_utf8(bytes)
        .map(Address::from)
        .map_err(|e| DbError::Corrupt {
            tree,
            reason: e.to_string(),
        })
}
