pub mod fixed_feed;
pub mod rpc_feed;

use crate::core::config::FeedConfig;
use crate::core::price::PriceFeed;
use anyhow::Result;
use fixed_feed::FixedPriceFeed;
use rpc_feed::RpcPriceFeed;
use std::sync::Arc;
use tracing::debug;

/// Builds the price feed described by `config`.
pub fn build_feed(config: &FeedConfig) -> Result<Arc<dyn PriceFeed>> {
    match config {
        FeedConfig::Rpc(rpc) => {
            debug!(rpc_url = %rpc.rpc_url, address = %rpc.address, "Using on-chain price feed");
            Ok(Arc::new(RpcPriceFeed::new(&rpc.rpc_url, rpc.address)?))
        }
        FeedConfig::Fixed(fixed) => {
            debug!(answer = fixed.answer, decimals = fixed.decimals, "Using fixed price feed");
            Ok(Arc::new(FixedPriceFeed::new(fixed.decimals, fixed.answer)))
        }
    }
}
