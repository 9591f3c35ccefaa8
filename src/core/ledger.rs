//! Funding ledger with a USD minimum on deposits and an owner-only sweep.
//!
//! State changes are staged and committed to the [`LedgerStore`] before they
//! become visible, so every operation either completes or leaves the ledger
//! as it found it. Withdrawal zeroes all balances and records a pending
//! [`Payout`] in one commit before value leaves custody. A failed transfer is
//! compensated by merging the snapshot back; a payout that was never settled
//! is delivered again the next time the ledger is opened.

use crate::core::oracle::{MINIMUM_USD, OracleError, OracleGateway, convert};
use crate::core::state::{CreditOverflow, LedgerState, LedgerStore};
use crate::core::transfer::{Payout, TransferError, ValueSink};
use crate::core::units::{Eth, Usd};
use alloy_primitives::{Address, U256};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

/// Commit attempts for the compensating restore after a failed transfer.
const RESTORE_ATTEMPTS: usize = 3;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Underfunded: contribution worth {usd_value} is below the {minimum} minimum")]
    Underfunded { usd_value: Usd, minimum: Usd },

    #[error("Not owner: {caller} is not allowed to withdraw")]
    NotOwner { caller: Address },

    #[error("Transfer of {amount} to {to} failed: {source}")]
    TransferFailed {
        to: Address,
        amount: Eth,
        #[source]
        source: TransferError,
    },

    #[error(
        "Transfer of {amount} to {to} failed ({transfer}) and balances could not be restored: {storage}. The payout stays pending"
    )]
    RestoreFailed {
        to: Address,
        amount: Eth,
        transfer: TransferError,
        storage: String,
    },

    #[error(transparent)]
    Overflow(#[from] CreditOverflow),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("Ledger storage failed: {0}")]
    Storage(String),
}

fn storage_error(e: anyhow::Error) -> LedgerError {
    LedgerError::Storage(format!("{e:#}"))
}

#[derive(Debug, Clone, Copy)]
enum Sweep {
    Standard,
    CachedFunders,
}

pub struct FundLedger {
    owner: Address,
    gateway: OracleGateway,
    sink: Arc<dyn ValueSink>,
    store: Arc<dyn LedgerStore>,
    state: Mutex<LedgerState>,
}

impl FundLedger {
    /// Opens the ledger persisted in `store`, deploying it for `owner` first
    /// if the store is empty. An already deployed owner is never replaced.
    ///
    /// Payouts left pending by an interrupted withdrawal are delivered again.
    pub async fn open(
        owner: Address,
        gateway: OracleGateway,
        sink: Arc<dyn ValueSink>,
        store: Arc<dyn LedgerStore>,
    ) -> Result<Self, LedgerError> {
        let owner = match store.owner().await.map_err(storage_error)? {
            Some(deployed) => {
                if deployed != owner {
                    warn!(
                        %deployed,
                        configured = %owner,
                        "Configured owner differs from deployed owner, keeping deployed owner"
                    );
                }
                deployed
            }
            None => {
                store.initialize(owner).await.map_err(storage_error)?;
                info!(%owner, "Deployed new ledger");
                owner
            }
        };

        let state = store.load().await.map_err(storage_error)?;
        debug!(
            funders = state.funders.len(),
            custody = %Eth(state.custody),
            pending = state.pending_payouts.len(),
            "Loaded ledger state"
        );
        let pending = state.pending_payouts.clone();

        let ledger = Self {
            owner,
            gateway,
            sink,
            store,
            state: Mutex::new(state),
        };
        for payout in pending {
            ledger.redeliver(payout).await;
        }
        Ok(ledger)
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn gateway(&self) -> &OracleGateway {
        &self.gateway
    }

    pub async fn amount_funded(&self, funder: Address) -> U256 {
        self.state.lock().await.amount_funded(&funder)
    }

    pub async fn funder(&self, index: usize) -> Option<Address> {
        self.state.lock().await.funders.get(index).copied()
    }

    pub async fn funders_len(&self) -> usize {
        self.state.lock().await.funders.len()
    }

    pub async fn funders(&self) -> Vec<Address> {
        self.state.lock().await.funders.clone()
    }

    pub async fn custodied_balance(&self) -> U256 {
        self.state.lock().await.custody
    }

    pub async fn pending_payouts(&self) -> Vec<Payout> {
        self.state.lock().await.pending_payouts.clone()
    }

    /// Consistent copy of the whole ledger state, taken under one lock.
    pub async fn snapshot(&self) -> LedgerState {
        self.state.lock().await.clone()
    }

    /// Accepts `value` wei from `caller` if it is worth at least `MINIMUM_USD`.
    #[instrument(name = "LedgerDeposit", skip_all, fields(caller = %caller, value = %Eth(value)))]
    pub async fn deposit(&self, caller: Address, value: U256) -> Result<(), LedgerError> {
        // Price is read before the state lock; the feed is external code.
        let price = self.gateway.get_price().await?;
        let usd_value = convert(value, price);
        if usd_value < MINIMUM_USD {
            info!(usd_value = %Usd(usd_value), "Rejecting underfunded deposit");
            return Err(LedgerError::Underfunded {
                usd_value: Usd(usd_value),
                minimum: Usd(MINIMUM_USD),
            });
        }

        let mut state = self.state.lock().await;
        let mut staged = state.clone();
        staged.credit(caller, value)?;
        self.store.commit(&staged).await.map_err(storage_error)?;
        *state = staged;

        info!(
            usd_value = %Usd(usd_value),
            balance = %Eth(state.amount_funded(&caller)),
            "Recorded deposit"
        );
        Ok(())
    }

    /// Plain value transfer without call data.
    pub async fn receive(&self, caller: Address, value: U256) -> Result<(), LedgerError> {
        debug!("Routing plain value transfer to deposit");
        self.deposit(caller, value).await
    }

    /// Value transfer carrying call data that names no ledger operation.
    pub async fn fallback(
        &self,
        caller: Address,
        value: U256,
        calldata: &[u8],
    ) -> Result<(), LedgerError> {
        debug!(calldata_len = calldata.len(), "Routing fallback call to deposit");
        self.deposit(caller, value).await
    }

    /// Sweeps all custodied value to the owner. Returns the amount sent.
    #[instrument(name = "LedgerWithdraw", skip_all, fields(caller = %caller))]
    pub async fn withdraw(&self, caller: Address) -> Result<U256, LedgerError> {
        self.sweep(caller, Sweep::Standard).await
    }

    /// Same as [`FundLedger::withdraw`], reading the funder list only once.
    #[instrument(name = "LedgerCheaperWithdraw", skip_all, fields(caller = %caller))]
    pub async fn cheaper_withdraw(&self, caller: Address) -> Result<U256, LedgerError> {
        self.sweep(caller, Sweep::CachedFunders).await
    }

    async fn sweep(&self, caller: Address, mode: Sweep) -> Result<U256, LedgerError> {
        // Authorization precedes any state access
        if caller != self.owner {
            warn!("Rejecting withdrawal from non-owner");
            return Err(LedgerError::NotOwner { caller });
        }

        let (snapshot, payout) = {
            let mut state = self.state.lock().await;
            let snapshot = state.clone();
            let mut staged = state.clone();

            match mode {
                Sweep::Standard => {
                    for index in 0..staged.funders.len() {
                        let funder = staged.funders[index];
                        staged.balances.remove(&funder);
                    }
                    staged.funders.clear();
                }
                Sweep::CachedFunders => {
                    let funders = std::mem::take(&mut staged.funders);
                    let funders_len = funders.len();
                    for funder in &funders[..funders_len] {
                        staged.balances.remove(funder);
                    }
                }
            }
            let amount = std::mem::take(&mut staged.custody);
            let payout = staged.open_payout(self.owner, amount);

            self.store.commit(&staged).await.map_err(storage_error)?;
            *state = staged;
            (snapshot, payout)
        };

        // The ledger is already empty here; re-entrant calls see no funds.
        info!(
            amount = %Eth(payout.amount),
            payout = payout.id,
            funders = snapshot.funders.len(),
            "Transferring custody to owner"
        );
        if let Err(source) = self.sink.send_value(&payout).await {
            error!(%source, "Transfer to owner failed, restoring balances");
            return Err(match self.restore(&snapshot, payout.id).await {
                Ok(()) => LedgerError::TransferFailed {
                    to: payout.to,
                    amount: Eth(payout.amount),
                    source,
                },
                Err(storage) => LedgerError::RestoreFailed {
                    to: payout.to,
                    amount: Eth(payout.amount),
                    transfer: source,
                    storage: format!("{storage:#}"),
                },
            });
        }

        self.settle(payout.id).await;
        info!(amount = %Eth(payout.amount), "Withdrawal complete");
        Ok(payout.amount)
    }

    /// Puts `snapshot` back in place of payout `id`, keeping anything
    /// deposited or swept while it was out. Memory only changes once the
    /// store has accepted the restored state.
    async fn restore(&self, snapshot: &LedgerState, id: u64) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        let mut restored = snapshot.clone();
        for funder in &state.funders {
            restored.credit(*funder, state.amount_funded(funder))?;
        }
        restored.pending_payouts = state.pending_payouts.clone();
        restored.next_payout_id = state.next_payout_id;
        restored.close_payout(id);

        let mut attempt = 1;
        loop {
            match self.store.commit(&restored).await {
                Ok(()) => break,
                Err(e) if attempt < RESTORE_ATTEMPTS => {
                    warn!(attempt, error = %e, "Restore commit failed, retrying");
                    attempt += 1;
                }
                Err(e) => {
                    error!(error = %e, payout = id, "Restored balances could not be persisted");
                    return Err(e);
                }
            }
        }
        *state = restored;
        Ok(())
    }

    /// Drops delivered payout `id`. The value already left custody, so a
    /// failed commit here is only logged.
    async fn settle(&self, id: u64) {
        let mut state = self.state.lock().await;
        state.close_payout(id);
        if let Err(e) = self.store.commit(&state).await {
            error!(error = %e, payout = id, "Delivered payout could not be cleared");
        }
    }

    /// Retries a payout an interrupted withdrawal left behind.
    async fn redeliver(&self, payout: Payout) {
        warn!(payout = payout.id, amount = %Eth(payout.amount), to = %payout.to, "Redelivering pending payout");
        match self.sink.send_value(&payout).await {
            Ok(()) => self.settle(payout.id).await,
            Err(e) => error!(error = %e, payout = payout.id, "Pending payout is still undelivered"),
        }
    }
}
