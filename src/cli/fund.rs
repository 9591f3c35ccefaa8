use super::ui;
use crate::core::ledger::FundLedger;
use crate::core::units::Eth;
use alloy_primitives::{Address, Bytes};
use anyhow::Result;
use tracing::info;

pub async fn run(ledger: &FundLedger, from: Address, amount: Eth) -> Result<()> {
    info!(%from, %amount, "Funding ledger");
    ledger.deposit(from, amount.wei()).await?;
    print_funded(ledger, from, amount).await;
    Ok(())
}

/// Direct value transfer, with optional call data.
pub async fn run_send(
    ledger: &FundLedger,
    from: Address,
    amount: Eth,
    data: Option<Bytes>,
) -> Result<()> {
    match data.filter(|d| !d.is_empty()) {
        Some(calldata) => {
            info!(%from, %amount, %calldata, "Sending value with call data");
            ledger.fallback(from, amount.wei(), &calldata).await?;
        }
        None => {
            info!(%from, %amount, "Sending value");
            ledger.receive(from, amount.wei()).await?;
        }
    }
    print_funded(ledger, from, amount).await;
    Ok(())
}

async fn print_funded(ledger: &FundLedger, from: Address, amount: Eth) {
    let total = Eth(ledger.amount_funded(from).await);
    println!(
        "Funded {} from {} (total {})",
        ui::style_text(&amount.to_string(), ui::StyleType::Amount),
        from,
        ui::style_text(&total.to_string(), ui::StyleType::Label)
    );
}
