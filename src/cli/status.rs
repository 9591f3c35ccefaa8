use super::ui;
use crate::core::ledger::FundLedger;
use crate::core::state::LedgerState;
use crate::core::units::Eth;
use crate::store::disk::DiskWallets;
use alloy_primitives::{Address, U256};
use anyhow::Result;
use comfy_table::Cell;

/// Point-in-time view of the ledger's accounting.
pub struct LedgerSummary {
    pub owner: Address,
    pub custody: U256,
    pub funders: Vec<(Address, U256)>,
    /// Swept value still waiting for delivery.
    pub pending: U256,
}

impl LedgerSummary {
    pub async fn collect(ledger: &FundLedger) -> Self {
        Self::from_state(ledger.owner(), &ledger.snapshot().await)
    }

    pub fn from_state(owner: Address, state: &LedgerState) -> Self {
        Self {
            owner,
            custody: state.custody,
            funders: state
                .funders
                .iter()
                .map(|funder| (*funder, state.amount_funded(funder)))
                .collect(),
            pending: state
                .pending_payouts
                .iter()
                .fold(U256::ZERO, |acc, p| acc.saturating_add(p.amount)),
        }
    }

    pub fn display_as_table(&self) -> String {
        let mut output = format!(
            "Owner: {}\n\n",
            ui::style_text(&self.owner.to_string(), ui::StyleType::Address)
        );

        if self.funders.is_empty() {
            output.push_str(&ui::style_text(
                "No funders since the last withdrawal.",
                ui::StyleType::Subtle,
            ));
        } else {
            let mut table = ui::new_styled_table();
            table.set_header(vec![
                ui::header_cell("#"),
                ui::header_cell("Funder"),
                ui::header_cell("Amount"),
            ]);
            for (index, (funder, amount)) in self.funders.iter().enumerate() {
                table.add_row(vec![
                    ui::number_cell(index),
                    ui::address_cell(*funder),
                    ui::eth_cell(Eth(*amount)),
                ]);
            }
            output.push_str(&table.to_string());
        }

        output.push_str(&format!(
            "\n\n{}: {}",
            ui::style_text("Custodied", ui::StyleType::Label),
            ui::style_text(&Eth(self.custody).to_string(), ui::StyleType::Amount)
        ));
        if !self.pending.is_zero() {
            output.push_str(&format!(
                "\n{}: {}",
                ui::style_text("Pending payout", ui::StyleType::Label),
                ui::style_text(&Eth(self.pending).to_string(), ui::StyleType::Subtle)
            ));
        }
        output
    }
}

pub async fn run(ledger: &FundLedger) -> Result<()> {
    let summary = LedgerSummary::collect(ledger).await;
    println!("{}", summary.display_as_table());
    Ok(())
}

pub async fn run_balance(ledger: &FundLedger, wallets: &DiskWallets, account: Address) -> Result<()> {
    let funded = Eth(ledger.amount_funded(account).await);
    let wallet = Eth(wallets.balance_of(account)?);

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Account"), ui::header_cell(&account.to_string())]);
    table.add_row(vec![Cell::new("Funded"), ui::eth_cell(funded)]);
    table.add_row(vec![Cell::new("Wallet"), ui::eth_cell(wallet)]);
    println!("{table}");
    Ok(())
}
