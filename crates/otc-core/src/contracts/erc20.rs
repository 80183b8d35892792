//! ERC-20 token binding for allowance queries and approvals.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use tracing::{debug, info};

use super::abi::IERC20;
use super::{MutatingCaller, ReadonlyCaller, TransactionReceipt};
use crate::config::ContractConfig;
use crate::signing::Wallet;
use crate::{Error, Result};

/// Read access to a token's allowances.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenAllowance: Send + Sync {
    /// Amount `spender` may transfer from `owner`, in base units.
    async fn allowance(&self, owner: Address, spender: Address) -> Result<U256>;

    /// Number of decimals of the token.
    async fn decimals(&self) -> Result<u8>;
}

/// State-changing token approvals.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenApproval: Send + Sync {
    /// Set the allowance of `spender` over `owner`'s tokens to `amount`.
    async fn approve(
        &self,
        owner: &Wallet,
        spender: Address,
        amount: U256,
    ) -> Result<TransactionReceipt>;
}

/// Binding to a deployed ERC-20 token.
#[derive(Debug, Clone)]
pub struct Erc20Contract<C> {
    address: Address,
    caller: C,
}

impl<C> Erc20Contract<C> {
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
impl<C: ReadonlyCaller> TokenAllowance for Erc20Contract<C> {
    async fn allowance(&self, owner: Address, spender: Address) -> Result<U256> {
        let call = IERC20::allowanceCall { owner, spender };
        let data = self
            .caller
            .call(self.address, Bytes::from(call.abi_encode()))
            .await?;

        let allowance = IERC20::allowanceCall::abi_decode_returns(&data)
            .map_err(|e| Error::rpc(format!("failed to decode allowance(): {}", e)))?;

        debug!(token = %self.address, owner = %owner, spender = %spender, allowance = %allowance, "Fetched allowance");
        Ok(allowance)
    }

    async fn decimals(&self) -> Result<u8> {
        let data = self
            .caller
            .call(self.address, Bytes::from(IERC20::decimalsCall {}.abi_encode()))
            .await?;

        IERC20::decimalsCall::abi_decode_returns(&data)
            .map_err(|e| Error::rpc(format!("failed to decode decimals(): {}", e)))
    }
}

#[async_trait]
impl<C: MutatingCaller> TokenApproval for Erc20Contract<C> {
    async fn approve(
        &self,
        owner: &Wallet,
        spender: Address,
        amount: U256,
    ) -> Result<TransactionReceipt> {
        // Fail before touching the network for watch-only wallets
        owner.signing_key()?;

        info!(
            token = %self.address,
            owner = %owner.address(),
            spender = %spender,
            amount = %amount,
            "Sending approve transaction"
        );

        let call = IERC20::approveCall { spender, amount };
        self.caller
            .send_transaction(owner, self.address, Bytes::from(call.abi_encode()))
            .await
    }
}
