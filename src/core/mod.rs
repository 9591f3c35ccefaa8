//! Core ledger logic and abstractions

pub mod config;
pub mod ledger;
pub mod log;
pub mod oracle;
pub mod price;
pub mod state;
pub mod transfer;
pub mod units;

// Re-export main types for cleaner imports
pub use ledger::{FundLedger, LedgerError};
pub use oracle::{MINIMUM_USD, OracleError, OracleGateway};
pub use price::{PriceFeed, RoundData};
pub use state::{CreditOverflow, LedgerState, LedgerStore};
pub use transfer::{Payout, TransferError, ValueSink};
pub use units::{Eth, Usd};
