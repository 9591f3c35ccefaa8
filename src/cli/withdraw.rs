use super::ui;
use crate::core::ledger::FundLedger;
use crate::core::units::Eth;
use crate::store::disk::DiskWallets;
use alloy_primitives::Address;
use anyhow::Result;
use tracing::info;

pub async fn run(
    ledger: &FundLedger,
    wallets: &DiskWallets,
    caller: Address,
    cheaper: bool,
) -> Result<()> {
    info!(%caller, cheaper, "Withdrawing ledger funds");
    let amount = if cheaper {
        ledger.cheaper_withdraw(caller).await?
    } else {
        ledger.withdraw(caller).await?
    };

    let owner = ledger.owner();
    println!(
        "Withdrew {} to {} (wallet balance {})",
        ui::style_text(&Eth(amount).to_string(), ui::StyleType::Amount),
        owner,
        Eth(wallets.balance_of(owner)?)
    );
    Ok(())
}
