pub mod disk;
pub mod memory;

use anyhow::{Context, Result};
use disk::{DiskLedgerStore, DiskWallets};
use fjall::Keyspace;
use std::path::Path;
use tracing::debug;

/// On-disk keyspace holding the ledger and the wallets it pays out to.
pub struct Storage {
    keyspace: Keyspace,
}

impl Storage {
    pub fn open(data_path: &Path) -> Result<Self> {
        let ledger_dir = data_path.join("ledger");
        std::fs::create_dir_all(&ledger_dir)
            .with_context(|| format!("Failed to create directory: {}", ledger_dir.display()))?;

        let keyspace = fjall::Config::new(&ledger_dir)
            .open()
            .with_context(|| format!("Failed to open ledger store at {}", ledger_dir.display()))?;
        debug!("Opened ledger store at {}", ledger_dir.display());
        Ok(Self { keyspace })
    }

    pub fn ledger(&self) -> Result<DiskLedgerStore> {
        DiskLedgerStore::new(self.keyspace.clone())
    }

    pub fn wallets(&self) -> Result<DiskWallets> {
        DiskWallets::new(self.keyspace.clone())
    }
}
