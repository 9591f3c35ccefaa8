use crate::core::price::{PriceFeed, RoundData};
use alloy_primitives::I256;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::RwLock;
use tracing::debug;

pub const DEFAULT_DECIMALS: u8 = 8;
/// $2000.00 with `DEFAULT_DECIMALS` digits.
pub const DEFAULT_ANSWER: i64 = 2000_0000_0000;

/// In-process aggregator reporting a settable answer, for local networks.
pub struct FixedPriceFeed {
    decimals: u8,
    round: RwLock<RoundData>,
}

fn now_secs() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}

impl FixedPriceFeed {
    pub fn new(decimals: u8, answer: i64) -> Self {
        let now = now_secs();
        Self {
            decimals,
            round: RwLock::new(RoundData {
                round_id: 1,
                answer: I256::try_from(answer).unwrap_or_default(),
                started_at: now,
                updated_at: now,
                answered_in_round: 1,
            }),
        }
    }

    /// Publishes `answer` as a new round stamped with the current time.
    pub fn update_answer(&self, answer: i64) {
        let now = now_secs();
        let mut round = self.round.write().unwrap_or_else(|e| e.into_inner());
        round.round_id += 1;
        round.answer = I256::try_from(answer).unwrap_or_default();
        round.started_at = now;
        round.updated_at = now;
        round.answered_in_round = round.round_id;
        debug!(round_id = round.round_id, answer, "Updated fixed answer");
    }

    pub fn set_updated_at(&self, updated_at: u64) {
        let mut round = self.round.write().unwrap_or_else(|e| e.into_inner());
        round.updated_at = updated_at;
    }
}

impl Default for FixedPriceFeed {
    fn default() -> Self {
        Self::new(DEFAULT_DECIMALS, DEFAULT_ANSWER)
    }
}

#[async_trait]
impl PriceFeed for FixedPriceFeed {
    async fn decimals(&self) -> Result<u8> {
        Ok(self.decimals)
    }

    async fn description(&self) -> Result<String> {
        Ok("ETH / USD (fixed)".to_string())
    }

    async fn version(&self) -> Result<u64> {
        Ok(0)
    }

    async fn latest_round_data(&self) -> Result<RoundData> {
        self.round
            .read()
            .map(|round| *round)
            .map_err(|_| anyhow!("Fixed price feed lock poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_feed_reports_two_thousand() {
        let feed = FixedPriceFeed::default();
        let round = feed.latest_round_data().await.unwrap();

        assert_eq!(feed.decimals().await.unwrap(), 8);
        assert_eq!(round.answer, I256::try_from(200_000_000_000i64).unwrap());
        assert_eq!(round.round_id, 1);
        assert!(round.updated_at > 0);
    }

    #[tokio::test]
    async fn test_update_answer_starts_new_round() {
        let feed = FixedPriceFeed::default();
        feed.update_answer(3100_0000_0000);

        let round = feed.latest_round_data().await.unwrap();
        assert_eq!(round.round_id, 2);
        assert_eq!(round.answered_in_round, 2);
        assert_eq!(round.answer, I256::try_from(310_000_000_000i64).unwrap());
    }
}
