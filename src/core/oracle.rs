//! Price conversion gate between wei amounts and USD.
//!
//! The gateway reads the latest round from a [`PriceFeed`], validates it and
//! normalizes the answer to 18 decimals. Conversion is a pure function over
//! the normalized price.

use crate::core::price::PriceFeed;
use crate::core::units::{PRECISION, PRECISION_DECIMALS};
use alloy_primitives::{I256, U256};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Minimum contribution, $5.00 in the 18-decimal USD scale.
pub const MINIMUM_USD: U256 = U256::from_limbs([5_000_000_000_000_000_000, 0, 0, 0]);

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Price feed returned a non-positive answer: {answer}")]
    NonPositivePrice { answer: I256 },

    #[error("Price feed round {round_id} is incomplete")]
    IncompleteRound { round_id: u128 },

    #[error("Price feed answer is stale: updated {age_secs}s ago, limit is {max_age_secs}s")]
    StalePrice { age_secs: u64, max_age_secs: u64 },

    #[error("Price feed query failed: {0}")]
    Feed(String),
}

pub struct OracleGateway {
    feed: Arc<dyn PriceFeed>,
    max_age_secs: Option<u64>,
}

impl OracleGateway {
    pub fn new(feed: Arc<dyn PriceFeed>) -> Self {
        Self {
            feed,
            max_age_secs: None,
        }
    }

    /// Rejects rounds whose `updated_at` is older than `max_age_secs`.
    pub fn with_max_age(mut self, max_age_secs: Option<u64>) -> Self {
        self.max_age_secs = max_age_secs;
        self
    }

    pub fn feed(&self) -> &Arc<dyn PriceFeed> {
        &self.feed
    }

    /// Returns the latest ETH/USD price scaled to 18 decimals.
    #[instrument(name = "OracleGetPrice", skip(self))]
    pub async fn get_price(&self) -> Result<U256, OracleError> {
        let (round, decimals) =
            futures::try_join!(self.feed.latest_round_data(), self.feed.decimals())
                .map_err(|e| OracleError::Feed(format!("{e:#}")))?;
        debug!(?round, decimals, "Received latest round");

        if !round.answer.is_positive() {
            warn!(answer = %round.answer, "Rejecting non-positive price");
            return Err(OracleError::NonPositivePrice {
                answer: round.answer,
            });
        }
        if round.updated_at == 0 {
            return Err(OracleError::IncompleteRound {
                round_id: round.round_id,
            });
        }
        if let Some(max_age_secs) = self.max_age_secs {
            let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
            let age_secs = now.saturating_sub(round.updated_at);
            if age_secs > max_age_secs {
                warn!(age_secs, max_age_secs, "Rejecting stale price");
                return Err(OracleError::StalePrice {
                    age_secs,
                    max_age_secs,
                });
            }
        }

        Ok(normalize(round.answer.into_raw(), decimals))
    }

    pub async fn version(&self) -> Result<u64, OracleError> {
        self.feed
            .version()
            .await
            .map_err(|e| OracleError::Feed(format!("{e:#}")))
    }

    pub async fn description(&self) -> Result<String, OracleError> {
        self.feed
            .description()
            .await
            .map_err(|e| OracleError::Feed(format!("{e:#}")))
    }
}

/// Rescales a feed answer with `decimals` fractional digits to 18 digits.
pub fn normalize(answer: U256, decimals: u8) -> U256 {
    match decimals.cmp(&PRECISION_DECIMALS) {
        std::cmp::Ordering::Less => {
            let factor = U256::from(10u64).pow(U256::from(PRECISION_DECIMALS - decimals));
            answer.saturating_mul(factor)
        }
        std::cmp::Ordering::Equal => answer,
        std::cmp::Ordering::Greater => {
            let factor = U256::from(10u64).pow(U256::from(decimals - PRECISION_DECIMALS));
            answer / factor
        }
    }
}

/// USD value (18 decimals) of `amount` wei at `price` (18 decimals).
///
/// The product is taken in 256 bits before dividing. It saturates rather
/// than wraps, which keeps the result monotone in `amount`.
pub fn convert(amount: U256, price: U256) -> U256 {
    amount.saturating_mul(price) / PRECISION
}

/// Smallest wei amount whose converted value meets `MINIMUM_USD` at `price`.
pub fn minimum_contribution(price: U256) -> U256 {
    if price.is_zero() {
        return U256::MAX;
    }
    let scaled = MINIMUM_USD.saturating_mul(PRECISION);
    let quotient = scaled / price;
    if (scaled % price).is_zero() {
        quotient
    } else {
        quotient + U256::from(1u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::fixed_feed::FixedPriceFeed;

    fn eth(milli: u64) -> U256 {
        PRECISION * U256::from(milli) / U256::from(1000u64)
    }

    #[tokio::test]
    async fn test_get_price_normalizes_eight_decimal_feed() {
        let feed = Arc::new(FixedPriceFeed::new(8, 2000_0000_0000));
        let gateway = OracleGateway::new(feed);

        let price = gateway.get_price().await.unwrap();
        assert_eq!(price, PRECISION * U256::from(2000u64));
    }

    #[tokio::test]
    async fn test_get_price_rejects_non_positive_answers() {
        let feed = Arc::new(FixedPriceFeed::new(8, 0));
        let gateway = OracleGateway::new(feed.clone());
        assert!(matches!(
            gateway.get_price().await,
            Err(OracleError::NonPositivePrice { .. })
        ));

        feed.update_answer(-1);
        assert!(matches!(
            gateway.get_price().await,
            Err(OracleError::NonPositivePrice { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_price_rejects_stale_round() {
        let feed = Arc::new(FixedPriceFeed::new(8, 2000_0000_0000));
        feed.set_updated_at(1);
        let gateway = OracleGateway::new(feed.clone()).with_max_age(Some(3600));
        assert!(matches!(
            gateway.get_price().await,
            Err(OracleError::StalePrice {
                max_age_secs: 3600,
                ..
            })
        ));

        // Without a limit the same round is accepted
        let lenient = OracleGateway::new(feed);
        assert!(lenient.get_price().await.is_ok());
    }

    #[tokio::test]
    async fn test_get_price_rejects_incomplete_round() {
        let feed = Arc::new(FixedPriceFeed::new(8, 2000_0000_0000));
        feed.set_updated_at(0);
        let gateway = OracleGateway::new(feed);
        assert!(matches!(
            gateway.get_price().await,
            Err(OracleError::IncompleteRound { .. })
        ));
    }

    #[test]
    fn test_normalize_handles_wider_precision() {
        let answer = U256::from(2000u64) * U256::from(10u64).pow(U256::from(20u64));
        assert_eq!(normalize(answer, 20), PRECISION * U256::from(2000u64));
        assert_eq!(normalize(U256::from(7u64), 18), U256::from(7u64));
    }

    #[test]
    fn test_convert_matches_reference_scenario() {
        let price = PRECISION * U256::from(2000u64);

        // 0.0001 ETH -> $0.20
        let small = PRECISION / U256::from(10_000u64);
        assert_eq!(convert(small, price), PRECISION / U256::from(5u64));
        assert!(convert(small, price) < MINIMUM_USD);

        // 0.01 ETH -> $20.00
        assert_eq!(convert(eth(10), price), PRECISION * U256::from(20u64));
    }

    #[test]
    fn test_convert_is_zero_at_zero_and_monotone() {
        let price = PRECISION * U256::from(1234u64);
        assert_eq!(convert(U256::ZERO, price), U256::ZERO);

        let mut previous = U256::ZERO;
        for step in 0..200u64 {
            let amount = U256::from(step) * U256::from(12_345_678_901u64);
            let value = convert(amount, price);
            assert!(value >= previous);
            previous = value;
        }

        // Large inputs saturate instead of wrapping
        assert!(convert(U256::MAX, price) >= convert(U256::MAX - U256::from(1u64), price));
    }

    #[test]
    fn test_convert_keeps_precision_for_wide_products() {
        // 2^96 wei at 2^64 * 1e18 would overflow 128-bit intermediates
        let amount = U256::from(1u64) << 96;
        let price = (U256::from(1u64) << 64) * PRECISION;
        assert_eq!(convert(amount, price), U256::from(1u64) << 160);
    }

    #[test]
    fn test_minimum_contribution_meets_threshold() {
        let price = PRECISION * U256::from(2000u64);
        let minimum = minimum_contribution(price);
        assert_eq!(minimum, PRECISION / U256::from(400u64));
        assert!(convert(minimum, price) >= MINIMUM_USD);
        assert!(convert(minimum - U256::from(1u64), price) < MINIMUM_USD);

        let odd_price = PRECISION * U256::from(3u64);
        let minimum = minimum_contribution(odd_price);
        assert!(convert(minimum, odd_price) >= MINIMUM_USD);
        assert!(convert(minimum - U256::from(1u64), odd_price) < MINIMUM_USD);
    }
}
