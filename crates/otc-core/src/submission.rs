//! Live pre-submission checks for signed bids.
//!
//! A bid whose nonce is already consumed, or whose trader has not allowed
//! the settlement contract to draw funds, is guaranteed to fail settlement.
//! [`SubmissionGate`] rejects such bids before they reach the coordinator.
//! Every check is a fresh on-chain query.

use tracing::{info, warn};

use crate::api::AuctionClient;
use crate::contracts::{AllowanceManager, NonceOracle, TokenAllowance};
use crate::signing::SignedBid;
use crate::{Error, Result};

/// Nonce and allowance gate in front of the auction coordinator.
#[derive(Debug, Clone)]
pub struct SubmissionGate<N, A> {
    nonces: N,
    allowance: Option<AllowanceManager<A>>,
}

impl<N: NonceOracle, A: TokenAllowance> SubmissionGate<N, A> {
    /// Gate on the nonce oracle and, if given, the allowance manager.
    pub fn new(nonces: N, allowance: Option<AllowanceManager<A>>) -> Self {
        Self { nonces, allowance }
    }

    /// Check `bid` against current on-chain state.
    ///
    /// Fails with `NonceAlreadyUsed` or `InsufficientAllowance`; collaborator
    /// errors are returned unchanged.
    pub async fn check(&self, bid: &SignedBid) -> Result<()> {
        let trader = bid.bid().trader_address()?;
        let nonce = bid.nonce();

        if self.nonces.is_nonce_used(trader, nonce).await? {
            warn!(trader = %trader, nonce = %nonce, "Rejecting bid: nonce already used");
            return Err(Error::NonceAlreadyUsed { trader, nonce });
        }

        if let Some(manager) = &self.allowance {
            let (allowance, sufficient) = manager.check(trader).await?;
            if !sufficient {
                warn!(
                    trader = %trader,
                    spender = %manager.spender(),
                    allowance = %allowance,
                    "Rejecting bid: insufficient allowance"
                );
                return Err(Error::InsufficientAllowance {
                    owner: trader,
                    spender: manager.spender(),
                    allowance,
                });
            }
        }

        info!(trader = %trader, nonce = %nonce, "Bid passed pre-submission checks");
        Ok(())
    }

    /// Run [`SubmissionGate::check`] and submit the bid if it passes.
    pub async fn submit(&self, client: &AuctionClient, bid: &SignedBid) -> Result<()> {
        self.check(bid).await?;
        client.submit_bid(bid).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::erc20::MockTokenAllowance;
    use crate::contracts::settlement::MockNonceOracle;
    use crate::contracts::AllowancePolicy;
    use crate::signing::{BidSigner, Domain, UnsignedBid, Wallet};
    use alloy_primitives::{Address, U256};

    const TEST_PRIVATE_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const SETTLEMENT: &str = "0x3B960E47784150F5a63777201ee2B15253D713e8";

    fn signed_bid(nonce: u64) -> SignedBid {
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY).unwrap();
        let domain = Domain::new("CrabOTC", "2", 1, SETTLEMENT).unwrap();
        let bid = UnsignedBid {
            bid_id: U256::from(1u64),
            trader: TEST_ADDRESS.to_string(),
            quantity: U256::from(10u64).pow(U256::from(18u64)),
            price: U256::from(500_000_000_000_000_000u64),
            is_buying: true,
            expiry: 1_700_003_600,
            nonce: U256::from(nonce),
        };
        BidSigner::default().sign(&wallet, &domain, &bid).unwrap()
    }

    fn nonce_oracle(used: bool) -> MockNonceOracle {
        let mut oracle = MockNonceOracle::new();
        oracle.expect_is_nonce_used().returning(move |_, _| Ok(used));
        oracle
    }

    fn allowance_manager(allowance: U256) -> AllowanceManager<MockTokenAllowance> {
        let mut token = MockTokenAllowance::new();
        token.expect_allowance().returning(move |_, _| Ok(allowance));
        token.expect_decimals().returning(|| Ok(18));
        AllowanceManager::new(token, SETTLEMENT.parse().unwrap(), AllowancePolicy::default())
    }

    #[tokio::test]
    async fn test_fresh_nonce_passes() {
        let trader: Address = TEST_ADDRESS.parse().unwrap();
        let mut oracle = MockNonceOracle::new();
        oracle
            .expect_is_nonce_used()
            .withf(move |t, n| *t == trader && *n == U256::from(5u64))
            .times(1)
            .returning(|_, _| Ok(false));

        let gate: SubmissionGate<_, MockTokenAllowance> = SubmissionGate::new(oracle, None);
        gate.check(&signed_bid(5)).await.unwrap();
    }

    #[tokio::test]
    async fn test_used_nonce_rejected() {
        let gate: SubmissionGate<_, MockTokenAllowance> =
            SubmissionGate::new(nonce_oracle(true), None);

        let err = gate.check(&signed_bid(1)).await.unwrap_err();
        match err {
            Error::NonceAlreadyUsed { trader, nonce } => {
                assert_eq!(trader.to_checksum(None), TEST_ADDRESS);
                assert_eq!(nonce, U256::from(1u64));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_insufficient_allowance_rejected() {
        let one_token = U256::from(10u64).pow(U256::from(18u64));
        let gate = SubmissionGate::new(nonce_oracle(false), Some(allowance_manager(one_token)));

        let err = gate.check(&signed_bid(1)).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientAllowance { allowance, .. } if allowance == one_token
        ));
    }

    #[tokio::test]
    async fn test_sufficient_allowance_passes() {
        let plenty = U256::from(10u64).pow(U256::from(20u64));
        let gate = SubmissionGate::new(nonce_oracle(false), Some(allowance_manager(plenty)));
        gate.check(&signed_bid(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_nonce_checked_on_every_call() {
        let mut oracle = MockNonceOracle::new();
        let mut seq = mockall::Sequence::new();
        oracle
            .expect_is_nonce_used()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(false));
        oracle
            .expect_is_nonce_used()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(true));

        let gate: SubmissionGate<_, MockTokenAllowance> = SubmissionGate::new(oracle, None);
        let bid = signed_bid(1);
        assert!(gate.check(&bid).await.is_ok());
        assert!(matches!(
            gate.check(&bid).await,
            Err(Error::NonceAlreadyUsed { .. })
        ));
    }

    #[tokio::test]
    async fn test_oracle_error_propagates() {
        let mut oracle = MockNonceOracle::new();
        oracle
            .expect_is_nonce_used()
            .returning(|_, _| Err(Error::rpc("timeout")));

        let gate: SubmissionGate<_, MockTokenAllowance> = SubmissionGate::new(oracle, None);
        assert!(matches!(
            gate.check(&signed_bid(1)).await,
            Err(Error::Rpc { .. })
        ));
    }
}
