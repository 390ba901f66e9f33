//! # Chain Store
//!
//! Saves and restores a [`ChainState`] in a [`LedgerDB`]. Balances and
//! allowances go to the ledger trees; the token descriptor, vault, pool and
//! native bank are metadata records written in the same transaction.

use std::path::Path;

use anyhow::{Context, Result};

use rebase_contracts::chain::ChainState;
use rebase_contracts::rebase_token::{RebaseToken, TokenDescriptor};
use rebase_contracts::token_pool::RebaseTokenPool;
use rebase_contracts::vault::Vault;
use rebase_protocol::bank::NativeBank;
use rebase_protocol::storage::{LedgerDB, MetaRecord};

const META_DESCRIPTOR: &str = "token_descriptor";
const META_VAULT: &str = "vault";
const META_POOL: &str = "pool";
const META_BANK: &str = "bank";

/// Persistent home of one chain.
pub struct ChainStore {
    db: LedgerDB,
}

impl ChainStore {
    /// Opens (or creates) the store under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let db_path = data_dir.join("db");
        std::fs::create_dir_all(&db_path)
            .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;
        let db = LedgerDB::open(&db_path)
            .with_context(|| format!("failed to open database at {}", db_path.display()))?;
        tracing::debug!(path = %db_path.display(), "database opened");
        Ok(Self { db })
    }

    #[cfg(test)]
    fn temporary() -> Result<Self> {
        Ok(Self {
            db: LedgerDB::open_temporary()?,
        })
    }

    /// `true` once `init` has deployed a chain here.
    pub fn is_initialized(&self) -> Result<bool> {
        Ok(self.db.is_initialized()? && self.db.get_meta::<TokenDescriptor>(META_DESCRIPTOR)?.is_some())
    }

    /// Writes the whole chain state atomically.
    pub fn save(&self, state: &ChainState) -> Result<()> {
        let records = [
            MetaRecord::new(META_DESCRIPTOR, state.token.descriptor())?,
            MetaRecord::new(META_VAULT, &state.vault)?,
            MetaRecord::new(META_POOL, &state.pool)?,
            MetaRecord::new(META_BANK, &state.bank)?,
        ];
        self.db
            .put_state_with(state.token.state(), &records)
            .context("failed to persist chain state")?;
        Ok(())
    }

    /// Reads the whole chain state back.
    pub fn load(&self) -> Result<ChainState> {
        let descriptor: TokenDescriptor = self
            .db
            .get_meta(META_DESCRIPTOR)?
            .context("no ledger deployed here; run `rebase-node init` first")?;
        let ledger = self.db.load_state().context("failed to load ledger state")?;
        let vault: Vault = self.db.get_meta(META_VAULT)?.context("vault record missing")?;
        let pool: RebaseTokenPool = self.db.get_meta(META_POOL)?.context("pool record missing")?;
        let bank: NativeBank = self.db.get_meta(META_BANK)?.unwrap_or_default();

        Ok(ChainState {
            token: RebaseToken::from_parts(descriptor, ledger),
            vault,
            pool,
            bank,
        })
    }
}
