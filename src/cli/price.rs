use super::ui;
use crate::core::oracle::{MINIMUM_USD, OracleGateway, minimum_contribution};
use crate::core::price::RoundData;
use crate::core::units::{Eth, Usd};
use alloy_primitives::U256;
use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use comfy_table::Cell;
use tracing::info;

/// Feed details and the price the ledger would use right now.
pub struct PriceReport {
    pub description: String,
    pub version: u64,
    pub round: RoundData,
    pub price: U256,
}

impl PriceReport {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Field"), ui::header_cell("Value")]);

        let updated = DateTime::<Utc>::from_timestamp(
            i64::try_from(self.round.updated_at).unwrap_or_default(),
            0,
        )
        .map_or("N/A".to_string(), |dt| dt.to_rfc3339());

        table.add_row(vec![Cell::new("Feed"), Cell::new(&self.description)]);
        table.add_row(vec![Cell::new("Version"), ui::number_cell(self.version)]);
        table.add_row(vec![Cell::new("Round"), ui::number_cell(self.round.round_id)]);
        table.add_row(vec![Cell::new("Updated"), Cell::new(updated)]);
        table.add_row(vec![Cell::new("ETH / USD"), ui::number_cell(Usd(self.price))]);
        table.add_row(vec![
            Cell::new(format!("Minimum ({})", Usd(MINIMUM_USD))),
            ui::eth_cell(Eth(minimum_contribution(self.price))),
        ]);

        format!(
            "{}\n\n{}",
            ui::style_text("Price Feed", ui::StyleType::Title),
            table
        )
    }
}

pub async fn run(gateway: &OracleGateway) -> Result<()> {
    info!("Querying price feed...");
    let pb = ui::new_spinner("Querying price feed");

    let feed = gateway.feed();
    let result = futures::try_join!(
        async { gateway.description().await.map_err(anyhow::Error::from) },
        async { gateway.version().await.map_err(anyhow::Error::from) },
        feed.latest_round_data(),
        async { gateway.get_price().await.map_err(anyhow::Error::from) },
    );
    pb.finish_and_clear();

    let (description, version, round, price) =
        result.map_err(|e| anyhow!("Failed to query price feed: {e:#}"))?;
    let report = PriceReport {
        description,
        version,
        round,
        price,
    };
    println!("{}", report.display_as_table());
    Ok(())
}
