//! Subcommand implementations.

use std::io::Read;
use std::path::Path;

use alloy_primitives::{Address, U256};
use anyhow::{bail, Context, Result};
use otc_core::api::AuctionClient;
use otc_core::config::Config;
use otc_core::contracts::{
    AllowanceManager, AllowancePolicy, Erc20Contract, NonceOracle, RpcClient, SettlementContract,
};
use otc_core::signing::{normalize_address, BidBuilder, BidSigner, SignedBid, Wallet};
use otc_core::SubmissionGate;
use tracing::info;

use crate::{BidArgs, Token};

fn rpc_client(config: &Config) -> RpcClient {
    RpcClient::from_contract(&config.crab_contract_config())
}

fn token_address(config: &Config, token: Token) -> Result<Address> {
    match token {
        Token::Osqth => Ok(config.osqth_token),
        Token::Weth => config
            .weth_token
            .context("WETH_TOKEN_ADDRESS is not configured"),
    }
}

fn allowance_manager(config: &Config, token: Address) -> AllowanceManager<Erc20Contract<RpcClient>> {
    AllowanceManager::new(
        Erc20Contract::new(token, rpc_client(config)),
        config.crab_contract,
        AllowancePolicy::default(),
    )
}

/// Address argument, or the maker wallet's address when absent.
fn address_or_maker(config: &Config, address: Option<&str>) -> Result<Address> {
    match address {
        Some(address) => Ok(normalize_address(address)?),
        None => Ok(config.maker_wallet()?.address()),
    }
}

fn build_and_sign(config: &Config, wallet: &Wallet, args: &BidArgs) -> Result<SignedBid> {
    let bid = BidBuilder::new()
        .bid_id(args.bid_id)
        .trader_address(wallet.address())
        .quantity(args.quantity)
        .price(args.price)
        .buying(!args.sell)
        .expires_in(args.expires_in)
        .nonce(args.nonce)
        .build()?;

    Ok(wallet.sign_bid(&config.domain(), &bid)?)
}

pub fn sign(config: &Config, args: &BidArgs) -> Result<()> {
    let wallet = config.maker_wallet()?;
    let signed = build_and_sign(config, &wallet, args)?;

    info!(trader = signed.trader(), nonce = %signed.nonce(), "Bid signed");
    println!("{}", serde_json::to_string_pretty(&signed)?);
    Ok(())
}

pub fn recover(config: &Config, path: &Path) -> Result<()> {
    let mut raw = String::new();
    if path == Path::new("-") {
        std::io::stdin().read_to_string(&mut raw)?;
    } else {
        raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
    }

    let signed: SignedBid = serde_json::from_str(&raw).context("invalid signed bid JSON")?;
    let bid = signed.bid().normalized()?;
    let signer = BidSigner::default().recover_signer(
        &config.domain(),
        &bid,
        signed.signature(),
    )?;

    let valid = signer == bid.trader_address()?;
    println!(
        "{}",
        serde_json::json!({
            "signer": signer.to_checksum(None),
            "trader": bid.trader,
            "valid": valid,
        })
    );

    if !valid {
        bail!("signature was not produced by {}", bid.trader);
    }
    Ok(())
}

pub async fn check_nonce(config: &Config, nonce: U256, trader: Option<&str>) -> Result<()> {
    let trader = address_or_maker(config, trader)?;
    let settlement = SettlementContract::from_config(&config.crab_contract_config(), rpc_client(config));

    let used = settlement.is_nonce_used(trader, nonce).await?;
    println!(
        "{}",
        serde_json::json!({
            "trader": trader.to_checksum(None),
            "nonce": nonce.to_string(),
            "used": used,
        })
    );
    Ok(())
}

pub async fn allowance(config: &Config, token: Token, owner: Option<&str>) -> Result<()> {
    let owner = address_or_maker(config, owner)?;
    let manager = allowance_manager(config, token_address(config, token)?);

    let (allowance, sufficient) = manager.check(owner).await?;
    println!(
        "{}",
        serde_json::json!({
            "owner": owner.to_checksum(None),
            "spender": manager.spender().to_checksum(None),
            "allowance": allowance.to_string(),
            "sufficient": sufficient,
        })
    );
    Ok(())
}

pub async fn approve(config: &Config, token: Token, amount: U256) -> Result<()> {
    let wallet = config.maker_wallet()?;
    let manager = allowance_manager(config, token_address(config, token)?);

    let receipt = manager.allow_more(&wallet, amount).await?;
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(())
}

pub async fn latest_auction(config: &Config) -> Result<()> {
    let client = AuctionClient::new(config.auction_api_url()?)?;
    let auction = client.latest_auction().await?;
    println!("{}", serde_json::to_string_pretty(&auction)?);
    Ok(())
}

pub async fn submit(config: &Config, args: &BidArgs, skip_checks: bool) -> Result<()> {
    let wallet = config.maker_wallet()?;
    let client = AuctionClient::new(config.auction_api_url()?)?;
    let signed = build_and_sign(config, &wallet, args)?;

    if skip_checks {
        client.submit_bid(&signed).await?;
    } else {
        // A buyer pays WETH, a seller delivers oSQTH
        let funding_token = if args.sell {
            Some(config.osqth_token)
        } else {
            config.weth_token
        };

        let settlement =
            SettlementContract::from_config(&config.crab_contract_config(), rpc_client(config));
        let gate = SubmissionGate::new(
            settlement,
            funding_token.map(|token| allowance_manager(config, token)),
        );
        gate.submit(&client, &signed).await?;
    }

    println!("{}", serde_json::to_string_pretty(&signed)?);
    Ok(())
}
