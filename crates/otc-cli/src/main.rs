//! Crab OTC command-line tool
//!
//! Signs, verifies and submits bids for the Crab V2 OTC auction.

mod commands;

use std::path::PathBuf;

use alloy_primitives::U256;
use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use otc_core::config::Config;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "crab-otc", version, about = "Sign and submit Crab OTC bids")]
struct Cli {
    /// Configuration file (TOML, JSON or YAML). Environment variables
    /// override its values; without it only the environment is used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign a bid with the maker key and print it as JSON
    Sign(BidArgs),
    /// Recover the signer of a signed bid JSON file
    Recover {
        /// Path to the signed bid, or `-` for stdin
        path: PathBuf,
    },
    /// Check whether a nonce has been consumed on the settlement contract
    CheckNonce {
        #[arg(long, value_parser = parse_u256)]
        nonce: U256,
        /// Trader address (defaults to the maker wallet)
        #[arg(long)]
        trader: Option<String>,
    },
    /// Show a wallet's allowance for the settlement contract
    Allowance {
        #[arg(long, value_enum)]
        token: Token,
        /// Owner address (defaults to the maker wallet)
        #[arg(long)]
        owner: Option<String>,
    },
    /// Approve the settlement contract to spend `amount` base units
    Approve {
        #[arg(long, value_enum)]
        token: Token,
        #[arg(long, value_parser = parse_u256)]
        amount: U256,
    },
    /// Print the coordinator's latest auction
    LatestAuction,
    /// Sign a bid, run the nonce and allowance checks, and submit it
    Submit {
        #[command(flatten)]
        bid: BidArgs,
        /// Skip the on-chain nonce and allowance checks
        #[arg(long)]
        skip_checks: bool,
    },
}

#[derive(Debug, Args)]
struct BidArgs {
    #[arg(long, value_parser = parse_u256)]
    bid_id: U256,
    /// oSQTH quantity in base units
    #[arg(long, value_parser = parse_u256)]
    quantity: U256,
    /// Price per oSQTH in WETH base units
    #[arg(long, value_parser = parse_u256)]
    price: U256,
    /// Bid to sell oSQTH instead of buying it
    #[arg(long)]
    sell: bool,
    /// Seconds until the bid expires
    #[arg(long, default_value_t = 3600)]
    expires_in: u64,
    #[arg(long, value_parser = parse_u256)]
    nonce: U256,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Token {
    Osqth,
    Weth,
}

fn parse_u256(s: &str) -> std::result::Result<U256, String> {
    U256::from_str_radix(s, 10).map_err(|e| format!("invalid integer {s:?}: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output on stdout stays machine-readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crab_otc=info,otc_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    debug!(?config, "Loaded configuration");

    match cli.command {
        Command::Sign(args) => commands::sign(&config, &args),
        Command::Recover { path } => commands::recover(&config, &path),
        Command::CheckNonce { nonce, trader } => {
            commands::check_nonce(&config, nonce, trader.as_deref()).await
        }
        Command::Allowance { token, owner } => {
            commands::allowance(&config, token, owner.as_deref()).await
        }
        Command::Approve { token, amount } => commands::approve(&config, token, amount).await,
        Command::LatestAuction => commands::latest_auction(&config).await,
        Command::Submit { bid, skip_checks } => commands::submit(&config, &bid, skip_checks).await,
    }
}
