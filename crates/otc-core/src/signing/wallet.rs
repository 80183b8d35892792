//! Trader wallet: an address with optional signing key.
//!
//! A wallet built from a private key can sign bids. A wallet built from
//! an address alone is watch-only; it can be used for nonce and
//! allowance lookups but every signing attempt fails with `NotSignable`.

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use std::str::FromStr;

use super::domain::{normalize_address, Domain};
use super::order_types::{SignedBid, UnsignedBid};
use super::signer::BidSigner;
use crate::{Error, Result};

#[derive(Clone)]
pub struct Wallet {
    address: Address,
    signer: Option<PrivateKeySigner>,
}

impl Wallet {
    /// Create a signing wallet from a hex-encoded private key.
    ///
    /// The key is a 64-character hex string, optionally prefixed with "0x".
    pub fn from_private_key(key: &str) -> Result<Self> {
        let key_clean = key.trim().trim_start_matches("0x");

        let signer = PrivateKeySigner::from_str(key_clean).map_err(|_| Error::InvalidKey {
            message: "expected 64 hex characters".to_string(),
        })?;

        Ok(Self {
            address: signer.address(),
            signer: Some(signer),
        })
    }

    /// Create a watch-only wallet from an address.
    pub fn watch_only(address: &str) -> Result<Self> {
        Ok(Self {
            address: normalize_address(address)?,
            signer: None,
        })
    }

    /// Create a wallet from an address, a private key, or both.
    ///
    /// When both are given the key must control the address.
    pub fn new(public_key: Option<&str>, private_key: Option<&str>) -> Result<Self> {
        match (public_key, private_key) {
            (None, None) => Err(Error::InvalidKey {
                message: "a wallet needs an address or a private key".to_string(),
            }),
            (Some(address), None) => Self::watch_only(address),
            (None, Some(key)) => Self::from_private_key(key),
            (Some(address), Some(key)) => {
                let expected = normalize_address(address)?;
                let wallet = Self::from_private_key(key)?;
                if wallet.address != expected {
                    return Err(Error::InvalidKey {
                        message: format!("private key does not control {}", expected),
                    });
                }
                Ok(wallet)
            }
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Checksummed address string.
    pub fn address_string(&self) -> String {
        self.address.to_checksum(None)
    }

    /// Whether the wallet holds a private key.
    pub fn can_sign(&self) -> bool {
        self.signer.is_some()
    }

    pub(crate) fn signing_key(&self) -> Result<&PrivateKeySigner> {
        self.signer.as_ref().ok_or(Error::NotSignable {
            address: self.address,
        })
    }

    /// Sign a bid under `domain` with the Crab V2 schema.
    pub fn sign_bid(&self, domain: &Domain, bid: &UnsignedBid) -> Result<SignedBid> {
        BidSigner::default().sign(self, domain, bid)
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose the private key in debug output
        f.debug_struct("Wallet")
            .field("address", &self.address_string())
            .field("watch_only", &!self.can_sign())
            .finish()
    }
}
