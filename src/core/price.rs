//! Price feed abstractions and core types

use alloy_primitives::I256;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Latest round reported by an ETH/USD aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundData {
    pub round_id: u128,
    /// Price with `decimals()` fractional digits. Signed on the wire.
    pub answer: I256,
    pub started_at: u64,
    /// Unix seconds of the last update; zero marks an incomplete round.
    pub updated_at: u64,
    pub answered_in_round: u128,
}

/// Read-only view of an external ETH/USD price feed.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn decimals(&self) -> Result<u8>;
    async fn description(&self) -> Result<String>;
    async fn version(&self) -> Result<u64>;
    async fn latest_round_data(&self) -> Result<RoundData>;
}
