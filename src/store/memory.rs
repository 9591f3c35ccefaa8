use crate::core::state::{LedgerState, LedgerStore};
use crate::core::transfer::{Payout, TransferError, ValueSink};
use alloy_primitives::{Address, U256};
use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory ledger store, for tests and throwaway ledgers.
#[derive(Default)]
pub struct MemoryLedgerStore {
    owner: Mutex<Option<Address>>,
    state: Mutex<LedgerState>,
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn owner(&self) -> Result<Option<Address>> {
        Ok(*self.owner.lock().await)
    }

    async fn initialize(&self, owner: Address) -> Result<()> {
        let mut current = self.owner.lock().await;
        if let Some(existing) = *current {
            bail!("Ledger already deployed for owner {existing}");
        }
        *current = Some(owner);
        Ok(())
    }

    async fn load(&self) -> Result<LedgerState> {
        Ok(self.state.lock().await.clone())
    }

    async fn commit(&self, state: &LedgerState) -> Result<()> {
        debug!(funders = state.funders.len(), "Memory COMMIT");
        *self.state.lock().await = state.clone();
        Ok(())
    }
}

/// Wallet balances credited by outgoing transfers.
#[derive(Clone, Default)]
pub struct MemoryWallets {
    inner: Arc<Mutex<HashMap<Address, U256>>>,
}

impl MemoryWallets {
    pub async fn balance_of(&self, account: Address) -> U256 {
        self.inner
            .lock()
            .await
            .get(&account)
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ValueSink for MemoryWallets {
    async fn send_value(&self, payout: &Payout) -> Result<(), TransferError> {
        let mut wallets = self.inner.lock().await;
        let balance = wallets.entry(payout.to).or_default();
        *balance = balance.saturating_add(payout.amount);
        debug!(to = %payout.to, amount = %payout.amount, "Memory wallet CREDIT");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_initialize_once() {
        let store = MemoryLedgerStore::default();
        let owner = Address::repeat_byte(0x01);

        assert!(store.owner().await.unwrap().is_none());
        store.initialize(owner).await.unwrap();
        assert_eq!(store.owner().await.unwrap(), Some(owner));
        assert!(store.initialize(Address::repeat_byte(0x02)).await.is_err());
    }

    #[tokio::test]
    async fn test_store_commit_replaces_state() {
        let store = MemoryLedgerStore::default();
        let mut state = LedgerState::default();
        state.credit(Address::repeat_byte(0xa1), U256::from(10u64)).unwrap();

        store.commit(&state).await.unwrap();
        assert_eq!(store.load().await.unwrap(), state);

        store.commit(&LedgerState::default()).await.unwrap();
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wallets_accumulate_transfers() {
        let wallets = MemoryWallets::default();
        let owner = Address::repeat_byte(0x01);

        for (id, amount) in [(0, 5u64), (1, 7u64)] {
            let payout = Payout {
                id,
                to: owner,
                amount: U256::from(amount),
            };
            wallets.send_value(&payout).await.unwrap();
        }

        assert_eq!(wallets.balance_of(owner).await, U256::from(12u64));
        assert_eq!(wallets.balance_of(Address::ZERO).await, U256::ZERO);
    }
}
