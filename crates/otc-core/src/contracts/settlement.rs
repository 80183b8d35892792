//! Crab V2 settlement contract binding.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use tracing::debug;

use super::abi::ICrabOtc;
use super::ReadonlyCaller;
use crate::config::ContractConfig;
use crate::{Error, Result};

/// Replay-protection oracle.
///
/// The settlement contract is authoritative; implementations must query it
/// on every call and never cache the answer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NonceOracle: Send + Sync {
    /// Whether `trader` has already consumed `nonce`.
    async fn is_nonce_used(&self, trader: Address, nonce: U256) -> Result<bool>;
}

/// Read-only binding to a deployed settlement contract.
#[derive(Debug, Clone)]
pub struct SettlementContract<C> {
    address: Address,
    caller: C,
}

impl<C: ReadonlyCaller> SettlementContract<C> {
    pub fn new(address: Address, caller: C) -> Self {
        Self { address, caller }
    }

    pub fn from_config(contract: &ContractConfig, caller: C) -> Self {
        Self::new(contract.address(), caller)
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

#[async_trait]
impl<C: ReadonlyCaller> NonceOracle for SettlementContract<C> {
    async fn is_nonce_used(&self, trader: Address, nonce: U256) -> Result<bool> {
        let call = ICrabOtc::noncesCall {
            owner: trader,
            nonce,
        };

        let data = self
            .caller
            .call(self.address, Bytes::from(call.abi_encode()))
            .await?;

        let used = ICrabOtc::noncesCall::abi_decode_returns(&data)
            .map_err(|e| Error::rpc(format!("failed to decode nonces(): {}", e)))?;

        debug!(trader = %trader, nonce = %nonce, used = used, "Checked nonce");
        Ok(used)
    }
}
