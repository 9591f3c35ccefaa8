use alloy_primitives::Address;
use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fs, path::PathBuf};
use tracing::debug;

/// Aggregator contract read over Ethereum JSON-RPC.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RpcFeedConfig {
    pub rpc_url: String,
    pub address: Address,
}

/// Local aggregator with a fixed answer.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FixedFeedConfig {
    pub answer: i64,
    #[serde(default = "default_feed_decimals")]
    pub decimals: u8,
}

fn default_feed_decimals() -> u8 {
    8
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum FeedConfig {
    Rpc(RpcFeedConfig),
    Fixed(FixedFeedConfig),
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NetworkConfig {
    pub price_feed: FeedConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub owner: Address,
    pub network: String,
    pub networks: BTreeMap<String, NetworkConfig>,
    pub max_price_age_secs: Option<u64>,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "codito", "fundme")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("in", "codito", "fundme")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.active_network()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Network selected by `network`.
    pub fn active_network(&self) -> Result<&NetworkConfig> {
        self.networks.get(&self.network).ok_or_else(|| {
            anyhow!(
                "Network '{}' is not defined in networks (available: {})",
                self.network,
                self.networks.keys().cloned().collect::<Vec<_>>().join(", ")
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
owner: "0x1804c8AB1F12E6bbf3894d4083f33e07309d1f38"
network: sepolia
networks:
  sepolia:
    price_feed:
      rpc_url: "https://rpc.example.com"
      address: "0x694AA1769357215DE4FAC081bf1f309aDC325306"
  local:
    price_feed:
      answer: 200000000000
max_price_age_secs: 3600
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(
            config.owner,
            address!("0x1804c8AB1F12E6bbf3894d4083f33e07309d1f38")
        );
        assert_eq!(config.max_price_age_secs, Some(3600));
        assert!(config.data_path.is_none());

        let active = config.active_network().unwrap();
        assert_eq!(
            active.price_feed,
            FeedConfig::Rpc(RpcFeedConfig {
                rpc_url: "https://rpc.example.com".to_string(),
                address: address!("0x694AA1769357215DE4FAC081bf1f309aDC325306"),
            })
        );

        if let FeedConfig::Fixed(fixed) = &config.networks["local"].price_feed {
            assert_eq!(fixed.answer, 200_000_000_000);
            assert_eq!(fixed.decimals, 8);
        } else {
            panic!("Expected a fixed price feed");
        }
    }

    #[test]
    fn test_unknown_network_is_rejected() {
        let yaml_str = r#"
owner: "0x1804c8AB1F12E6bbf3894d4083f33e07309d1f38"
network: mainnet
networks:
  local:
    price_feed:
      answer: 200000000000
      decimals: 8
"#;
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), yaml_str).unwrap();

        let err = AppConfig::load_from_path(file.path()).unwrap_err();
        assert!(
            err.to_string()
                .contains("Network 'mainnet' is not defined in networks (available: local)")
        );
    }
}
