//! Ledger state and its persistence abstraction

use crate::core::transfer::Payout;
use alloy_primitives::{Address, U256};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Crediting {amount} wei to {funder} would overflow the ledger")]
pub struct CreditOverflow {
    pub funder: Address,
    pub amount: U256,
}

/// Mutable accounting state owned by a `FundLedger`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerState {
    /// Identities that funded since the last withdrawal, in first-funding order.
    pub funders: Vec<Address>,
    pub balances: HashMap<Address, U256>,
    /// Wei held by the ledger. Equals the sum of `balances` between withdrawals.
    pub custody: U256,
    /// Swept payouts not yet delivered or rolled back, by ascending id.
    pub pending_payouts: Vec<Payout>,
    pub next_payout_id: u64,
}

impl LedgerState {
    pub fn amount_funded(&self, funder: &Address) -> U256 {
        self.balances.get(funder).copied().unwrap_or_default()
    }

    /// Adds `amount` to `funder`, appending it to the funder list on first use.
    ///
    /// Fails without changes if the balance or custody would overflow.
    pub fn credit(&mut self, funder: Address, amount: U256) -> Result<(), CreditOverflow> {
        let overflow = || CreditOverflow { funder, amount };
        let balance = self
            .amount_funded(&funder)
            .checked_add(amount)
            .ok_or_else(overflow)?;
        let custody = self.custody.checked_add(amount).ok_or_else(overflow)?;

        // Balances are dropped on withdrawal, so a missing entry means a new funder
        if !self.balances.contains_key(&funder) {
            self.funders.push(funder);
        }
        self.balances.insert(funder, balance);
        self.custody = custody;
        Ok(())
    }

    /// Records a payout of `amount` to `to` under a fresh id.
    pub fn open_payout(&mut self, to: Address, amount: U256) -> Payout {
        let payout = Payout {
            id: self.next_payout_id,
            to,
            amount,
        };
        self.next_payout_id += 1;
        self.pending_payouts.push(payout);
        payout
    }

    pub fn close_payout(&mut self, id: u64) -> Option<Payout> {
        let index = self.pending_payouts.iter().position(|p| p.id == id)?;
        Some(self.pending_payouts.remove(index))
    }

    pub fn tracked_total(&self) -> U256 {
        self.balances
            .values()
            .fold(U256::ZERO, |acc, v| acc.saturating_add(*v))
    }

    pub fn is_empty(&self) -> bool {
        self.funders.is_empty() && self.custody.is_zero() && self.pending_payouts.is_empty()
    }
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Owner recorded at deployment, if the ledger was deployed.
    async fn owner(&self) -> Result<Option<Address>>;
    async fn initialize(&self, owner: Address) -> Result<()>;
    async fn load(&self) -> Result<LedgerState>;
    /// Replaces the stored state atomically.
    async fn commit(&self, state: &LedgerState) -> Result<()>;
}
