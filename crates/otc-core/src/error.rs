//! Error types for the Crab OTC SDK.

use alloy_primitives::{Address, U256};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid address: {input}")]
    InvalidAddress { input: String },

    #[error("Invalid key: {message}")]
    InvalidKey { message: String },

    #[error("Wallet {address} holds no private key and cannot sign")]
    NotSignable { address: Address },

    #[error("Bid trader {trader} does not match signer {signer}")]
    TraderMismatch { trader: Address, signer: Address },

    #[error("Type mismatch for field `{field}`: expected {expected}")]
    TypeMismatch { field: String, expected: String },

    #[error("Signature error: {message}")]
    Signature { message: String },

    #[error("RPC error: {message}")]
    Rpc { message: String },

    #[error("Nonce {nonce} already used by {trader}")]
    NonceAlreadyUsed { trader: Address, nonce: U256 },

    #[error("Insufficient allowance for {owner} on spender {spender}: {allowance}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        allowance: U256,
    },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration file error: {0}")]
    ConfigFile(#[from] config::ConfigError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("API error: {message}")]
    Api { message: String, status: Option<u16> },
}

impl Error {
    pub(crate) fn invalid_address(input: impl Into<String>) -> Self {
        Error::InvalidAddress {
            input: input.into(),
        }
    }

    pub(crate) fn rpc(message: impl Into<String>) -> Self {
        Error::Rpc {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
