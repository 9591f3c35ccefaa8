pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::ledger::FundLedger;
use crate::core::oracle::OracleGateway;
use crate::core::units::Eth;
use crate::store::disk::DiskWallets;
use alloy_primitives::{Address, Bytes};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Price,
    Fund {
        from: Address,
        amount: Eth,
    },
    Send {
        from: Address,
        amount: Eth,
        data: Option<Bytes>,
    },
    Withdraw {
        caller: Address,
        cheaper: bool,
    },
    Status,
    Balance {
        account: Address,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Fund ledger starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let network = config.active_network()?;
    let feed = providers::build_feed(&network.price_feed)?;
    let gateway = OracleGateway::new(feed).with_max_age(config.max_price_age_secs);

    if let AppCommand::Price = command {
        return cli::price::run(&gateway).await;
    }

    let (ledger, wallets) = open_ledger(&config, gateway).await?;
    match command {
        AppCommand::Price => unreachable!("Price is answered without opening the ledger"),
        AppCommand::Fund { from, amount } => cli::fund::run(&ledger, from, amount).await,
        AppCommand::Send { from, amount, data } => {
            cli::fund::run_send(&ledger, from, amount, data).await
        }
        AppCommand::Withdraw { caller, cheaper } => {
            cli::withdraw::run(&ledger, &wallets, caller, cheaper).await
        }
        AppCommand::Status => cli::status::run(&ledger).await,
        AppCommand::Balance { account } => {
            cli::status::run_balance(&ledger, &wallets, account).await
        }
    }
}

/// Opens the persisted ledger and the wallets it pays out to.
pub async fn open_ledger(
    config: &AppConfig,
    gateway: OracleGateway,
) -> Result<(FundLedger, Arc<DiskWallets>)> {
    let data_path = config.default_data_path()?;
    let storage = store::Storage::open(&data_path)?;
    let wallets = Arc::new(storage.wallets()?);
    let ledger = FundLedger::open(
        config.owner,
        gateway,
        wallets.clone(),
        Arc::new(storage.ledger()?),
    )
    .await?;
    Ok((ledger, wallets))
}
