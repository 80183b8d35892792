//! Bid signing and signer recovery.
//!
//! Signing is a pure computation over the canonical EIP-712 digest: no
//! network access and no shared state. Recovery runs the same
//! canonicalization so a signature only verifies under the exact domain
//! and field values it was produced for.

use alloy_primitives::Address;
use alloy_signer::SignerSync;

use super::canonical::MessageCanonicalizer;
use super::domain::Domain;
use super::order_types::{BidSignature, SignedBid, UnsignedBid};
use super::wallet::Wallet;
use crate::{Error, Result};

/// Signs bids and recovers their signers under a bound canonicalizer.
#[derive(Debug, Clone, Default)]
pub struct BidSigner {
    canonicalizer: MessageCanonicalizer,
}

impl BidSigner {
    pub fn new(canonicalizer: MessageCanonicalizer) -> Self {
        Self { canonicalizer }
    }

    pub fn canonicalizer(&self) -> &MessageCanonicalizer {
        &self.canonicalizer
    }

    /// Sign `bid` with `wallet` under `domain`.
    ///
    /// The returned bid carries the checksummed trader; the caller's bid is
    /// not modified. Fails with `NotSignable` for watch-only wallets and
    /// `TraderMismatch` when the trader is not the wallet's address.
    pub fn sign(&self, wallet: &Wallet, domain: &Domain, bid: &UnsignedBid) -> Result<SignedBid> {
        let key = wallet.signing_key()?;

        let bid = bid.normalized()?;
        let trader = bid.trader_address()?;
        if trader != wallet.address() {
            return Err(Error::TraderMismatch {
                trader,
                signer: wallet.address(),
            });
        }

        let digest = self.canonicalizer.signing_hash(domain, &bid)?;
        let signature = key.sign_hash_sync(&digest).map_err(|e| Error::Signature {
            message: e.to_string(),
        })?;

        Ok(SignedBid::new(bid, BidSignature::from_primitive(&signature)))
    }

    /// Recover the address that produced `signature` over `bid` in `domain`.
    ///
    /// `bid.trader` must be checksummed, as it is on any bid returned by
    /// [`BidSigner::sign`].
    pub fn recover_signer(
        &self,
        domain: &Domain,
        bid: &UnsignedBid,
        signature: &BidSignature,
    ) -> Result<Address> {
        let digest = self.canonicalizer.signing_hash(domain, bid)?;
        signature
            .to_primitive()?
            .recover_address_from_prehash(&digest)
            .map_err(|e| Error::Signature {
                message: e.to_string(),
            })
    }

    /// Whether `signed` was signed by its own trader under `domain`.
    pub fn verify(&self, domain: &Domain, signed: &SignedBid) -> Result<bool> {
        let recovered = self.recover_signer(domain, signed.bid(), signed.signature())?;
        Ok(recovered == signed.bid().trader_address()?)
    }
}

impl SignedBid {
    /// Check the signature against the bid's trader under `domain`.
    pub fn verify(&self, domain: &Domain) -> Result<bool> {
        BidSigner::default().verify(domain, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{B256, U256};

    // Well-known development key (DO NOT USE IN PRODUCTION)
    const TEST_PRIVATE_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const SETTLEMENT: &str = "0x3B960E47784150F5a63777201ee2B15253D713e8";

    fn wallet() -> Wallet {
        Wallet::from_private_key(TEST_PRIVATE_KEY).unwrap()
    }

    fn domain(chain_id: u64) -> Domain {
        Domain::new("CrabOTC", "2", chain_id, SETTLEMENT).unwrap()
    }

    fn bid(trader: &str) -> UnsignedBid {
        UnsignedBid {
            bid_id: U256::from(1u64),
            trader: trader.to_string(),
            quantity: U256::from(10u64).pow(U256::from(18u64)),
            price: U256::from(500_000_000_000_000_000u64),
            is_buying: true,
            expiry: 1_700_003_600,
            nonce: U256::from(1u64),
        }
    }

    #[test]
    fn test_sign_then_recover() {
        let signer = BidSigner::default();
        let signed = signer.sign(&wallet(), &domain(1), &bid(TEST_ADDRESS)).unwrap();

        let recovered = signer
            .recover_signer(&domain(1), signed.bid(), signed.signature())
            .unwrap();
        assert_eq!(recovered, wallet().address());
        assert!(signer.verify(&domain(1), &signed).unwrap());
        assert!(signed.verify(&domain(1)).unwrap());
    }

    #[test]
    fn test_signature_uses_legacy_recovery_byte() {
        let signed = BidSigner::default()
            .sign(&wallet(), &domain(1), &bid(TEST_ADDRESS))
            .unwrap();
        assert!(matches!(signed.signature().v, 27 | 28));
    }

    #[test]
    fn test_sign_normalizes_trader_without_mutating_input() {
        let input = bid(&TEST_ADDRESS.to_lowercase());
        let signed = BidSigner::default().sign(&wallet(), &domain(1), &input).unwrap();

        assert_eq!(signed.trader(), TEST_ADDRESS);
        assert_eq!(input.trader, TEST_ADDRESS.to_lowercase());
    }

    #[test]
    fn test_signatures_are_deterministic() {
        let signer = BidSigner::default();
        let a = signer.sign(&wallet(), &domain(1), &bid(TEST_ADDRESS)).unwrap();
        let b = signer.sign(&wallet(), &domain(1), &bid(TEST_ADDRESS)).unwrap();
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn test_domain_separation() {
        let signer = BidSigner::default();
        let signed = signer.sign(&wallet(), &domain(1), &bid(TEST_ADDRESS)).unwrap();

        let recovered = signer
            .recover_signer(&domain(3), signed.bid(), signed.signature())
            .unwrap();
        assert_ne!(recovered, wallet().address());
        assert!(!signed.verify(&domain(3)).unwrap());
    }

    #[test]
    fn test_tampered_field_recovers_other_address() {
        let signer = BidSigner::default();
        let signed = signer.sign(&wallet(), &domain(1), &bid(TEST_ADDRESS)).unwrap();

        let mut tampered = signed.bid().clone();
        tampered.price += U256::from(1u64);
        let recovered = signer
            .recover_signer(&domain(1), &tampered, signed.signature())
            .unwrap();
        assert_ne!(recovered, wallet().address());
    }

    #[test]
    fn test_trader_mismatch() {
        let other = "0x1234567890123456789012345678901234567890";
        let err = BidSigner::default()
            .sign(&wallet(), &domain(1), &bid(other))
            .unwrap_err();

        match err {
            Error::TraderMismatch { trader, signer } => {
                assert_eq!(trader.to_checksum(None), other);
                assert_eq!(signer, wallet().address());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_watch_only_cannot_sign() {
        let watch = Wallet::watch_only(TEST_ADDRESS).unwrap();
        let err = BidSigner::default()
            .sign(&watch, &domain(1), &bid(TEST_ADDRESS))
            .unwrap_err();
        assert!(matches!(err, Error::NotSignable { .. }));
    }

    #[test]
    fn test_invalid_trader_rejected() {
        let err = BidSigner::default()
            .sign(&wallet(), &domain(1), &bid("0xnot-an-address"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAddress { .. }));
    }

    #[test]
    fn test_recover_rejects_bad_recovery_id() {
        let signature = BidSignature {
            v: 9,
            r: B256::repeat_byte(0x01),
            s: B256::repeat_byte(0x02),
        };
        let result = BidSigner::default().recover_signer(&domain(1), &bid(TEST_ADDRESS), &signature);
        assert!(matches!(result, Err(Error::Signature { .. })));
    }

    #[test]
    fn test_wallet_sign_bid_matches_signer() {
        let via_wallet = wallet().sign_bid(&domain(1), &bid(TEST_ADDRESS)).unwrap();
        let via_signer = BidSigner::default()
            .sign(&wallet(), &domain(1), &bid(TEST_ADDRESS))
            .unwrap();
        assert_eq!(via_wallet, via_signer);
    }
}
