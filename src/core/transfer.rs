//! Outgoing value transfer abstraction

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("recipient {0} rejected the transfer")]
    Rejected(Address),

    #[error("transfer backend failed: {0}")]
    Backend(String),
}

/// Value that has left the ledger's balances but may not have reached `to`.
///
/// A payout is recorded in the committed state before the transfer starts and
/// dropped once it is delivered or rolled back. `id` is unique per ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payout {
    pub id: u64,
    pub to: Address,
    pub amount: U256,
}

/// Moves native value out of the ledger's custody.
///
/// Implementations may run arbitrary code, including calls back into the
/// ledger, before they return. A sink sharing storage with the ledger should
/// clear the payout record in the same write that credits the recipient.
#[async_trait]
pub trait ValueSink: Send + Sync {
    async fn send_value(&self, payout: &Payout) -> Result<(), TransferError>;
}
