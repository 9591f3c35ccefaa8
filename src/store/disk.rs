use crate::core::state::{LedgerState, LedgerStore};
use crate::core::transfer::{Payout, TransferError, ValueSink};
use alloy_primitives::{Address, U256};
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::collections::HashMap;
use tracing::debug;

const OWNER_KEY: &str = "owner";
const CUSTODY_KEY: &str = "custody";
const NEXT_PAYOUT_KEY: &str = "next_payout";
const PAYOUTS_PARTITION: &str = "payouts";

fn decode_address(bytes: &[u8]) -> Result<Address> {
    Address::try_from(bytes).map_err(|_| anyhow!("Stored address has {} bytes", bytes.len()))
}

fn decode_index(bytes: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = bytes
        .try_into()
        .map_err(|_| anyhow!("Stored funder index has {} bytes", bytes.len()))?;
    Ok(u64::from_be_bytes(bytes))
}

fn decode_amount(bytes: &[u8]) -> Result<U256> {
    U256::try_from_be_slice(bytes).ok_or_else(|| anyhow!("Stored amount has {} bytes", bytes.len()))
}

/// Payout values are the recipient followed by the big-endian amount.
fn encode_payout(payout: &Payout) -> Vec<u8> {
    let mut value = payout.to.to_vec();
    value.extend_from_slice(&payout.amount.to_be_bytes::<32>());
    value
}

fn decode_payout(key: &[u8], value: &[u8]) -> Result<Payout> {
    if value.len() != 20 + 32 {
        bail!("Stored payout has {} bytes", value.len());
    }
    Ok(Payout {
        id: decode_index(key)?,
        to: decode_address(&value[..20])?,
        amount: decode_amount(&value[20..])?,
    })
}

/// Ledger state in a `fjall` keyspace; every commit is a single batch.
pub struct DiskLedgerStore {
    keyspace: Keyspace,
    meta: PartitionHandle,
    funders: PartitionHandle,
    balances: PartitionHandle,
    payouts: PartitionHandle,
}

impl DiskLedgerStore {
    pub fn new(keyspace: Keyspace) -> Result<Self> {
        let meta = keyspace.open_partition("meta", PartitionCreateOptions::default())?;
        let funders = keyspace.open_partition("funders", PartitionCreateOptions::default())?;
        let balances = keyspace.open_partition("balances", PartitionCreateOptions::default())?;
        let payouts =
            keyspace.open_partition(PAYOUTS_PARTITION, PartitionCreateOptions::default())?;
        Ok(Self {
            keyspace,
            meta,
            funders,
            balances,
            payouts,
        })
    }

    fn next_payout_id(&self) -> Result<u64> {
        match self.meta.get(NEXT_PAYOUT_KEY)? {
            Some(bytes) => decode_index(&bytes),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl LedgerStore for DiskLedgerStore {
    async fn owner(&self) -> Result<Option<Address>> {
        self.meta
            .get(OWNER_KEY)?
            .map(|bytes| decode_address(&bytes))
            .transpose()
    }

    async fn initialize(&self, owner: Address) -> Result<()> {
        if let Some(existing) = self.owner().await? {
            bail!("Ledger already deployed for owner {existing}");
        }
        self.meta.insert(OWNER_KEY, owner.as_slice())?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!(%owner, "Disk INIT");
        Ok(())
    }

    async fn load(&self) -> Result<LedgerState> {
        let mut funders = Vec::new();
        for entry in self.funders.iter() {
            let (_, value) = entry?;
            funders.push(decode_address(&value)?);
        }

        let mut balances = HashMap::new();
        for entry in self.balances.iter() {
            let (key, value) = entry?;
            balances.insert(decode_address(&key)?, decode_amount(&value)?);
        }

        let custody = match self.meta.get(CUSTODY_KEY)? {
            Some(bytes) => decode_amount(&bytes)?,
            None => U256::ZERO,
        };

        let mut pending_payouts = Vec::new();
        for entry in self.payouts.iter() {
            let (key, value) = entry?;
            pending_payouts.push(decode_payout(&key, &value)?);
        }

        Ok(LedgerState {
            funders,
            balances,
            custody,
            pending_payouts,
            next_payout_id: self.next_payout_id()?,
        })
    }

    async fn commit(&self, state: &LedgerState) -> Result<()> {
        let mut batch = self.keyspace.batch();

        // Only drop keys the new state no longer has, so no key is both
        // removed and inserted within one batch.
        let funders_len = u64::try_from(state.funders.len())?;
        for key in self.funders.keys() {
            let key = key?;
            if decode_index(&key)? >= funders_len {
                batch.remove(&self.funders, key);
            }
        }
        for key in self.balances.keys() {
            let key = key?;
            if !state.balances.contains_key(&decode_address(&key)?) {
                batch.remove(&self.balances, key);
            }
        }

        for (index, funder) in state.funders.iter().enumerate() {
            let index = u64::try_from(index)?;
            batch.insert(&self.funders, index.to_be_bytes().to_vec(), funder.as_slice());
        }
        for (funder, amount) in &state.balances {
            batch.insert(
                &self.balances,
                funder.as_slice(),
                amount.to_be_bytes::<32>().to_vec(),
            );
        }
        batch.insert(
            &self.meta,
            CUSTODY_KEY,
            state.custody.to_be_bytes::<32>().to_vec(),
        );

        // Payouts are only ever written once, by the commit that opens them.
        // Older ones may already have been cleared by the wallet write.
        let persisted_next = self.next_payout_id()?;
        for key in self.payouts.keys() {
            let key = key?;
            let id = decode_index(&key)?;
            if !state.pending_payouts.iter().any(|p| p.id == id) {
                batch.remove(&self.payouts, key);
            }
        }
        for payout in state.pending_payouts.iter().filter(|p| p.id >= persisted_next) {
            batch.insert(
                &self.payouts,
                payout.id.to_be_bytes().to_vec(),
                encode_payout(payout),
            );
        }
        batch.insert(
            &self.meta,
            NEXT_PAYOUT_KEY,
            state.next_payout_id.to_be_bytes().to_vec(),
        );

        batch.commit()?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!(funders = state.funders.len(), "Disk COMMIT");
        Ok(())
    }
}

/// Wallet balances credited by withdrawals, persisted next to the ledger.
///
/// A delivery credits the wallet and clears the ledger's payout record in
/// one batch, so a crash never leaves a payout both credited and pending.
pub struct DiskWallets {
    keyspace: Keyspace,
    wallets: PartitionHandle,
    payouts: PartitionHandle,
}

impl DiskWallets {
    pub fn new(keyspace: Keyspace) -> Result<Self> {
        let wallets = keyspace.open_partition("wallets", PartitionCreateOptions::default())?;
        let payouts =
            keyspace.open_partition(PAYOUTS_PARTITION, PartitionCreateOptions::default())?;
        Ok(Self {
            keyspace,
            wallets,
            payouts,
        })
    }

    pub fn balance_of(&self, account: Address) -> Result<U256> {
        match self.wallets.get(account.as_slice())? {
            Some(bytes) => decode_amount(&bytes),
            None => Ok(U256::ZERO),
        }
    }

    fn deliver(&self, payout: &Payout) -> Result<()> {
        let balance = self.balance_of(payout.to)?.saturating_add(payout.amount);

        let mut batch = self.keyspace.batch();
        batch.insert(
            &self.wallets,
            payout.to.as_slice(),
            balance.to_be_bytes::<32>().to_vec(),
        );
        batch.remove(&self.payouts, payout.id.to_be_bytes().to_vec());
        batch.commit()?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!(payout = payout.id, to = %payout.to, amount = %payout.amount, "Disk wallet CREDIT");
        Ok(())
    }
}

#[async_trait]
impl ValueSink for DiskWallets {
    async fn send_value(&self, payout: &Payout) -> Result<(), TransferError> {
        self.deliver(payout)
            .map_err(|e| TransferError::Backend(format!("{e:#}")))
    }
}
