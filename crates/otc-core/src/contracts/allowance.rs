//! Allowance gate for the settlement contract.
//!
//! Before a bid can settle, the settlement contract must be allowed to
//! draw the trader's tokens. [`AllowanceManager`] checks that allowance
//! against a threshold and, only when asked, raises it.

use alloy_primitives::{Address, U256};
use tracing::info;

use super::erc20::{TokenAllowance, TokenApproval};
use super::TransactionReceipt;
use crate::signing::Wallet;
use crate::Result;

/// Minimum allowance, in whole tokens, for a wallet to be eligible.
pub const DEFAULT_MIN_ALLOWANCE: u64 = 1;

/// Threshold policy for allowance checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowancePolicy {
    /// Whole tokens the allowance must strictly exceed.
    pub min_allowance: U256,
}

impl AllowancePolicy {
    pub fn new(min_allowance: U256) -> Self {
        Self { min_allowance }
    }

    /// Threshold in base units: `min_allowance * 10^decimals`, saturating.
    pub fn threshold(&self, decimals: u8) -> U256 {
        let scale = U256::from(10u64).saturating_pow(U256::from(decimals));
        self.min_allowance.saturating_mul(scale)
    }

    /// Whether `allowance` (base units) strictly exceeds the threshold.
    pub fn is_sufficient(&self, allowance: U256, decimals: u8) -> bool {
        allowance > self.threshold(decimals)
    }
}

impl Default for AllowancePolicy {
    fn default() -> Self {
        Self::new(U256::from(DEFAULT_MIN_ALLOWANCE))
    }
}

/// Checks and raises one token's allowance for one spender.
#[derive(Debug, Clone)]
pub struct AllowanceManager<T> {
    token: T,
    spender: Address,
    policy: AllowancePolicy,
}

impl<T> AllowanceManager<T> {
    pub fn new(token: T, spender: Address, policy: AllowancePolicy) -> Self {
        Self {
            token,
            spender,
            policy,
        }
    }

    /// Manager using [`AllowancePolicy::default`].
    pub fn with_default_policy(token: T, spender: Address) -> Self {
        Self::new(token, spender, AllowancePolicy::default())
    }

    pub fn spender(&self) -> Address {
        self.spender
    }

    pub fn policy(&self) -> &AllowancePolicy {
        &self.policy
    }
}

impl<T: TokenAllowance> AllowanceManager<T> {
    /// Current allowance of `owner` for the spender, in base units.
    pub async fn allowance(&self, owner: Address) -> Result<U256> {
        self.token.allowance(owner, self.spender).await
    }

    /// Whether `owner`'s allowance clears the policy threshold.
    pub async fn verify_allowance(&self, owner: Address) -> Result<bool> {
        Ok(self.check(owner).await?.1)
    }

    /// Allowance together with the policy verdict, from one query of each.
    pub async fn check(&self, owner: Address) -> Result<(U256, bool)> {
        let allowance = self.allowance(owner).await?;
        let decimals = self.token.decimals().await?;
        Ok((allowance, self.policy.is_sufficient(allowance, decimals)))
    }
}

impl<T: TokenApproval> AllowanceManager<T> {
    /// Set the spender's allowance over `wallet`'s tokens to `amount`.
    ///
    /// Costs gas; never called implicitly by the SDK.
    pub async fn allow_more(&self, wallet: &Wallet, amount: U256) -> Result<TransactionReceipt> {
        let receipt = self.token.approve(wallet, self.spender, amount).await?;
        info!(
            owner = %wallet.address(),
            spender = %self.spender,
            amount = %amount,
            tx_hash = ?receipt.transaction_hash,
            "Allowance raised"
        );
        Ok(receipt)
    }
}
