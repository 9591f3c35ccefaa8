use alloy_primitives::{Address, Bytes};
use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fundme::core::log::init_logging;
use fundme::core::units::Eth;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for fundme::AppCommand {
    fn from(cmd: Commands) -> fundme::AppCommand {
        match cmd {
            Commands::Price => fundme::AppCommand::Price,
            Commands::Fund { from, amount } => fundme::AppCommand::Fund { from, amount },
            Commands::Send { from, amount, data } => {
                fundme::AppCommand::Send { from, amount, data }
            }
            Commands::Withdraw { caller, cheaper } => {
                fundme::AppCommand::Withdraw { caller, cheaper }
            }
            Commands::Status => fundme::AppCommand::Status,
            Commands::Balance { account } => fundme::AppCommand::Balance { account },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Show the ETH/USD price and the minimum contribution
    Price,
    /// Fund the ledger, at least $5.00 worth of ETH
    Fund {
        /// Funding address
        #[arg(long)]
        from: Address,
        /// Amount in ETH, e.g. 0.01
        #[arg(long)]
        amount: Eth,
    },
    /// Send ETH to the ledger directly, optionally with call data
    Send {
        /// Sending address
        #[arg(long)]
        from: Address,
        /// Amount in ETH, e.g. 0.01
        #[arg(long)]
        amount: Eth,
        /// Hex encoded call data
        #[arg(long)]
        data: Option<Bytes>,
    },
    /// Withdraw all funds to the owner
    Withdraw {
        /// Calling address, must be the owner
        #[arg(long)]
        caller: Address,
        /// Read the funder list once while clearing balances
        #[arg(long)]
        cheaper: bool,
    },
    /// Display owner, funders and custodied balance
    Status,
    /// Display the funded amount and wallet balance of an address
    Balance {
        account: Address,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fundme::cli::setup::setup(),
        Some(cmd) => fundme::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
