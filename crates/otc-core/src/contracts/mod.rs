//! On-chain collaborators: the JSON-RPC transport and contract bindings.
//!
//! Contract bindings never talk to the network directly. They are generic
//! over two capabilities, [`ReadonlyCaller`] for `eth_call` and
//! [`MutatingCaller`] for signed transactions, both implemented by
//! [`RpcClient`]. Tests substitute mocks of the same traits.

pub mod abi;
pub mod allowance;
pub mod erc20;
pub mod rpc;
pub mod settlement;

use alloy_primitives::{Address, Bytes, B256, U64};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::signing::Wallet;
use crate::Result;

pub use allowance::{AllowanceManager, AllowancePolicy, DEFAULT_MIN_ALLOWANCE};
pub use erc20::{Erc20Contract, TokenAllowance, TokenApproval};
pub use rpc::RpcClient;
pub use settlement::{NonceOracle, SettlementContract};

/// Read-only contract calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReadonlyCaller: Send + Sync {
    /// Execute `eth_call` against `to` at the latest block and return the
    /// raw return data.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes>;
}

/// State-changing contract calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MutatingCaller: Send + Sync {
    /// Sign a transaction calling `to` with `data` from `from`, broadcast it
    /// and wait for its receipt.
    async fn send_transaction(
        &self,
        from: &Wallet,
        to: Address,
        data: Bytes,
    ) -> Result<TransactionReceipt>;
}

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    pub block_number: Option<U64>,
    /// `1` on success, `0` on revert.
    pub status: Option<U64>,
    pub gas_used: U64,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status == Some(U64::from(1))
    }
}
