//! Configuration management for the Crab OTC SDK.
//!
//! Values are resolved once at process start, either from the environment
//! (with `.env` support) or from a configuration file overlaid by the
//! environment. The signing core only ever receives the resolved
//! [`ContractConfig`], [`Domain`] and [`Wallet`] values.

use alloy_primitives::Address;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::signing::{normalize_address, Domain, Wallet};
use crate::{Error, Result};

/// Chain the contracts are deployed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Chain {
    #[default]
    Ethereum,
    Ropsten,
    Goerli,
    Sepolia,
    Other(u64),
}

impl Chain {
    pub fn id(&self) -> u64 {
        match self {
            Chain::Ethereum => 1,
            Chain::Ropsten => 3,
            Chain::Goerli => 5,
            Chain::Sepolia => 11_155_111,
            Chain::Other(id) => *id,
        }
    }

    pub fn from_id(id: u64) -> Self {
        match id {
            1 => Chain::Ethereum,
            3 => Chain::Ropsten,
            5 => Chain::Goerli,
            11_155_111 => Chain::Sepolia,
            other => Chain::Other(other),
        }
    }
}

impl FromStr for Chain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim().to_lowercase();
        match value.as_str() {
            "ethereum" | "mainnet" => Ok(Chain::Ethereum),
            "ropsten" => Ok(Chain::Ropsten),
            "goerli" => Ok(Chain::Goerli),
            "sepolia" => Ok(Chain::Sepolia),
            _ => value.parse::<u64>().map(Chain::from_id).map_err(|_| Error::Config {
                message: format!("unknown chain: {}", s),
            }),
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chain::Ethereum => write!(f, "ethereum"),
            Chain::Ropsten => write!(f, "ropsten"),
            Chain::Goerli => write!(f, "goerli"),
            Chain::Sepolia => write!(f, "sepolia"),
            Chain::Other(id) => write!(f, "{}", id),
        }
    }
}

/// Connection details for one deployed contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractConfig {
    address: Address,
    rpc_uri: String,
    chain: Chain,
}

impl ContractConfig {
    pub fn new(address: &str, rpc_uri: impl Into<String>, chain: Chain) -> Result<Self> {
        Ok(Self {
            address: normalize_address(address)?,
            rpc_uri: rpc_uri.into(),
            chain,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn rpc_uri(&self) -> &str {
        &self.rpc_uri
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn chain_id(&self) -> u64 {
        self.chain.id()
    }
}

/// Raw key/value view shared by the environment and file loaders.
///
/// Field names are the lowercased environment variable names.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    rpc_url: Option<String>,
    rpc_token: Option<String>,
    chain: Option<String>,
    crab_contract_address: Option<String>,
    osqth_token_address: Option<String>,
    weth_token_address: Option<String>,
    auction_api_url: Option<String>,
    maker_pubkey: Option<String>,
    maker_privkey: Option<String>,
}

impl RawConfig {
    fn from_process_env() -> Self {
        let var = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            rpc_url: var("RPC_URL"),
            rpc_token: var("RPC_TOKEN"),
            chain: var("CHAIN"),
            crab_contract_address: var("CRAB_CONTRACT_ADDRESS"),
            osqth_token_address: var("OSQTH_TOKEN_ADDRESS"),
            weth_token_address: var("WETH_TOKEN_ADDRESS"),
            auction_api_url: var("AUCTION_API_URL"),
            maker_pubkey: var("MAKER_PUBKEY"),
            maker_privkey: var("MAKER_PRIVKEY"),
        }
    }

    fn resolve(self) -> Result<Config> {
        let rpc_url = required(self.rpc_url, "RPC_URL")?;
        let rpc_uri = format!("{}{}", rpc_url, self.rpc_token.unwrap_or_default());

        let chain = match self.chain {
            Some(chain) => chain.parse()?,
            None => Chain::default(),
        };

        let crab_contract = normalize_address(&required(
            self.crab_contract_address,
            "CRAB_CONTRACT_ADDRESS",
        )?)?;
        let osqth_token =
            normalize_address(&required(self.osqth_token_address, "OSQTH_TOKEN_ADDRESS")?)?;
        let weth_token = self
            .weth_token_address
            .as_deref()
            .map(normalize_address)
            .transpose()?;

        Ok(Config {
            rpc_uri,
            chain,
            crab_contract,
            osqth_token,
            weth_token,
            auction_api_url: self.auction_api_url,
            maker_public: self.maker_pubkey,
            maker_private: self.maker_privkey,
        })
    }
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    value.ok_or_else(|| Error::Config {
        message: format!("{} not set", name),
    })
}

/// Application configuration.
#[derive(Clone)]
pub struct Config {
    /// Full RPC endpoint (`RPC_URL` followed by `RPC_TOKEN`).
    pub rpc_uri: String,
    pub chain: Chain,
    /// Crab V2 settlement contract.
    pub crab_contract: Address,
    pub osqth_token: Address,
    pub weth_token: Option<Address>,
    pub auction_api_url: Option<String>,
    maker_public: Option<String>,
    maker_private: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    #[allow(clippy::result_large_err)]
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        RawConfig::from_process_env().resolve()
    }

    /// Load configuration from a TOML, JSON or YAML file.
    ///
    /// Environment variables with the same (uppercase) names take
    /// precedence over values from the file.
    #[allow(clippy::result_large_err)]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let raw: RawConfig = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::default())
            .build()?
            .try_deserialize()?;

        raw.resolve()
    }

    /// Settlement contract binding.
    pub fn crab_contract_config(&self) -> ContractConfig {
        self.contract_config(self.crab_contract)
    }

    pub fn osqth_contract_config(&self) -> ContractConfig {
        self.contract_config(self.osqth_token)
    }

    pub fn weth_contract_config(&self) -> Option<ContractConfig> {
        self.weth_token.map(|address| self.contract_config(address))
    }

    pub fn contract_config(&self, address: Address) -> ContractConfig {
        ContractConfig {
            address,
            rpc_uri: self.rpc_uri.clone(),
            chain: self.chain,
        }
    }

    /// Signing domain bound to the configured settlement contract.
    pub fn domain(&self) -> Domain {
        Domain::crab_otc(&self.crab_contract_config())
    }

    /// Wallet built from `MAKER_PUBKEY` / `MAKER_PRIVKEY`.
    pub fn maker_wallet(&self) -> Result<Wallet> {
        Wallet::new(self.maker_public.as_deref(), self.maker_private.as_deref())
    }

    pub fn auction_api_url(&self) -> Result<&str> {
        self.auction_api_url.as_deref().ok_or_else(|| Error::Config {
            message: "AUCTION_API_URL not set".to_string(),
        })
    }

    /// Load configuration for testing (with defaults).
    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            rpc_uri: "http://localhost:8545".to_string(),
            chain: Chain::Ropsten,
            crab_contract: "0x3B960E47784150F5a63777201ee2B15253D713e8"
                .parse()
                .unwrap(),
            osqth_token: "0xa4222f78d23593e82Aa74742d25D06720DCa4ab7"
                .parse()
                .unwrap(),
            weth_token: None,
            auction_api_url: Some("http://localhost:3000/api".to_string()),
            maker_public: None,
            maker_private: Some(
                "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".to_string(),
            ),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The RPC token and private key never appear in debug output
        f.debug_struct("Config")
            .field("chain", &self.chain)
            .field("crab_contract", &self.crab_contract.to_checksum(None))
            .field("osqth_token", &self.osqth_token.to_checksum(None))
            .field("weth_token", &self.weth_token)
            .field("auction_api_url", &self.auction_api_url)
            .field("maker_public", &self.maker_public)
            .field("maker_private", &self.maker_private.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
