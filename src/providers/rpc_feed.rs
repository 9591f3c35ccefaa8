use crate::core::price::{PriceFeed, RoundData};
use alloy_primitives::{Address, Bytes, I256, U256, hex};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

const DECIMALS_SELECTOR: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];
const DESCRIPTION_SELECTOR: [u8; 4] = [0x72, 0x84, 0xe4, 0x16];
const VERSION_SELECTOR: [u8; 4] = [0x54, 0xfd, 0x4d, 0x50];
const LATEST_ROUND_DATA_SELECTOR: [u8; 4] = [0xfe, 0xaf, 0x96, 0x8c];

const WORD: usize = 32;

/// Aggregator contract read through `eth_call` on a JSON-RPC endpoint.
pub struct RpcPriceFeed {
    rpc_url: String,
    address: Address,
    client: reqwest::Client,
}

impl RpcPriceFeed {
    pub fn new(rpc_url: &str, address: Address) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("fundme/1.0")
            .build()?;
        Ok(RpcPriceFeed {
            rpc_url: rpc_url.to_string(),
            address,
            client,
        })
    }

    #[instrument(name = "RpcEthCall", skip_all, fields(to = %self.address, selector = %hex::encode(selector)))]
    async fn call(&self, selector: [u8; 4]) -> Result<Bytes> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [
                { "to": self.address, "data": hex::encode_prefixed(selector) },
                "latest"
            ]
        });
        debug!("Requesting aggregator data from {}", self.rpc_url);

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for feed: {}", e, self.address))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for feed: {}",
                response.status(),
                self.address
            ));
        }

        let text = response.text().await?;
        let data: RpcResponse = serde_json::from_str(&text).map_err(|e| {
            anyhow!(
                "Failed to parse JSON-RPC response for {}: {}",
                self.address,
                e
            )
        })?;

        if let Some(error) = data.error {
            return Err(anyhow!(
                "JSON-RPC error {}: {} for feed: {}",
                error.code,
                error.message,
                self.address
            ));
        }
        let result = data
            .result
            .ok_or_else(|| anyhow!("No result in JSON-RPC response for feed: {}", self.address))?;
        debug!(len = result.len(), "Received aggregator data");
        Ok(result)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RpcResponse {
    result: Option<Bytes>,
    error: Option<RpcError>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

fn word(data: &[u8], index: usize) -> Result<U256> {
    let end = index
        .checked_add(1)
        .and_then(|words| words.checked_mul(WORD))
        .ok_or_else(|| anyhow!("Word index {} is out of range", index))?;
    data.get(end - WORD..end)
        .map(U256::from_be_slice)
        .ok_or_else(|| anyhow!("Return data too short: {} bytes, need word {}", data.len(), index))
}

fn small_word<T: TryFrom<U256>>(data: &[u8], index: usize) -> Result<T> {
    let value = word(data, index)?;
    T::try_from(value).map_err(|_| anyhow!("Word {} out of range: {}", index, value))
}

/// Decodes a single dynamic `string` return value.
fn decode_string(data: &[u8]) -> Result<String> {
    let offset: usize = small_word(data, 0)?;
    let len_index = offset / WORD;
    let len: usize = small_word(data, len_index)?;
    let start = len_index
        .checked_add(1)
        .and_then(|words| words.checked_mul(WORD))
        .ok_or_else(|| anyhow!("String offset {} is out of range", offset))?;
    let end = start
        .checked_add(len)
        .ok_or_else(|| anyhow!("String of {} bytes exceeds return data", len))?;
    let bytes = data
        .get(start..end)
        .ok_or_else(|| anyhow!("String of {} bytes exceeds return data", len))?;
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

#[async_trait]
impl PriceFeed for RpcPriceFeed {
    async fn decimals(&self) -> Result<u8> {
        let data = self.call(DECIMALS_SELECTOR).await?;
        small_word(&data, 0)
    }

    async fn description(&self) -> Result<String> {
        let data = self.call(DESCRIPTION_SELECTOR).await?;
        decode_string(&data)
    }

    async fn version(&self) -> Result<u64> {
        let data = self.call(VERSION_SELECTOR).await?;
        small_word(&data, 0)
    }

    async fn latest_round_data(&self) -> Result<RoundData> {
        let data = self.call(LATEST_ROUND_DATA_SELECTOR).await?;
        Ok(RoundData {
            round_id: small_word(&data, 0)?,
            answer: I256::from_raw(word(&data, 1)?),
            started_at: small_word(&data, 2)?,
            updated_at: small_word(&data, 3)?,
            answered_in_round: small_word(&data, 4)?,
        })
    }
}
