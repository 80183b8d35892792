//! Bid types for Crab OTC signing.
//!
//! Defines the unsigned bid message, the signature tuple and the signed
//! bid submitted to the auction coordinator.

use alloy_primitives::{Address, Signature, B256, U256};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::domain::{normalize_address, require_checksummed};
use super::schema::{FieldValue, TypedStruct};
use crate::{Error, Result};

/// Bid message to sign off-chain.
///
/// Matches the `Order` struct hashed by the settlement contract. `trader`
/// is kept as supplied; it must be in EIP-55 form before the bid can be
/// hashed (see [`UnsignedBid::normalized`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedBid {
    /// Auction-scoped bid identifier.
    #[serde(with = "crate::serde_helpers::u256_decimal")]
    pub bid_id: U256,
    /// Trader address as a hex string.
    pub trader: String,
    /// oSQTH quantity in base units.
    #[serde(with = "crate::serde_helpers::u256_decimal")]
    pub quantity: U256,
    /// Price per oSQTH in WETH base units.
    #[serde(with = "crate::serde_helpers::u256_decimal")]
    pub price: U256,
    /// Whether the trader is buying oSQTH.
    pub is_buying: bool,
    /// Expiration timestamp (unix seconds).
    pub expiry: u64,
    /// Replay-protection nonce, consumed on settlement.
    #[serde(with = "crate::serde_helpers::u256_decimal")]
    pub nonce: U256,
}

impl UnsignedBid {
    /// Return a copy of this bid with `trader` in EIP-55 form.
    pub fn normalized(&self) -> Result<Self> {
        let trader = normalize_address(&self.trader)?;
        Ok(Self {
            trader: trader.to_checksum(None),
            ..self.clone()
        })
    }

    /// Parse the trader address, accepting any valid casing.
    pub fn trader_address(&self) -> Result<Address> {
        normalize_address(&self.trader)
    }

    /// Whether the bid has expired relative to `now` (unix seconds).
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expiry <= now
    }
}

impl TypedStruct for UnsignedBid {
    fn field(&self, name: &str) -> Result<Option<FieldValue>> {
        Ok(match name {
            "bidId" => Some(FieldValue::Uint(self.bid_id)),
            "trader" => Some(FieldValue::Address(require_checksummed(&self.trader)?)),
            "quantity" => Some(FieldValue::Uint(self.quantity)),
            "price" => Some(FieldValue::Uint(self.price)),
            "isBuying" => Some(FieldValue::Bool(self.is_buying)),
            "expiry" => Some(FieldValue::Uint(U256::from(self.expiry))),
            "nonce" => Some(FieldValue::Uint(self.nonce)),
            _ => None,
        })
    }
}

/// ECDSA signature over a bid digest.
///
/// `r` and `s` are 32-byte big-endian values; `v` is the recovery byte as
/// serialized by the signing primitive (27 or 28).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BidSignature {
    pub v: u8,
    pub r: B256,
    pub s: B256,
}

impl BidSignature {
    /// Split a primitive signature into its wire components.
    pub fn from_primitive(signature: &Signature) -> Self {
        let bytes = signature.as_bytes();
        Self {
            v: bytes[64],
            r: B256::from_slice(&bytes[..32]),
            s: B256::from_slice(&bytes[32..64]),
        }
    }

    /// Rebuild the primitive signature for recovery.
    ///
    /// Accepts `v` as a raw parity (0/1), legacy (27/28) or EIP-155 value.
    pub fn to_primitive(&self) -> Result<Signature> {
        let parity = match self.v {
            0 | 27 => false,
            1 | 28 => true,
            v if v >= 35 => (v - 35) % 2 == 1,
            v => {
                return Err(Error::Signature {
                    message: format!("invalid recovery id {}", v),
                })
            }
        };

        Ok(Signature::new(
            U256::from_be_slice(self.r.as_slice()),
            U256::from_be_slice(self.s.as_slice()),
            parity,
        ))
    }

    /// 65-byte `r ‖ s ‖ v` encoding.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[..32].copy_from_slice(self.r.as_slice());
        bytes[32..64].copy_from_slice(self.s.as_slice());
        bytes[64] = self.v;
        bytes
    }

    /// Signature as a `0x`-prefixed hex string.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }
}

/// A signed bid ready for submission.
///
/// Serializes to the flat record the coordinator expects: the bid fields
/// followed by `v`, `r` and `s`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBid {
    #[serde(flatten)]
    bid: UnsignedBid,
    #[serde(flatten)]
    signature: BidSignature,
}

impl SignedBid {
    pub(crate) fn new(bid: UnsignedBid, signature: BidSignature) -> Self {
        Self { bid, signature }
    }

    pub fn bid(&self) -> &UnsignedBid {
        &self.bid
    }

    pub fn signature(&self) -> &BidSignature {
        &self.signature
    }

    pub fn trader(&self) -> &str {
        &self.bid.trader
    }

    pub fn nonce(&self) -> U256 {
        self.bid.nonce
    }

    pub fn into_parts(self) -> (UnsignedBid, BidSignature) {
        (self.bid, self.signature)
    }
}

/// Bid builder with a fluent API.
#[derive(Debug, Clone, Default)]
pub struct BidBuilder {
    bid_id: Option<U256>,
    trader: Option<String>,
    quantity: Option<U256>,
    price: Option<U256>,
    is_buying: bool,
    expiry: Option<u64>,
    expiry_overflow: bool,
    nonce: Option<U256>,
}

impl BidBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bid_id(mut self, bid_id: U256) -> Self {
        self.bid_id = Some(bid_id);
        self
    }

    /// Set the trader address (any casing; normalized when built).
    pub fn trader(mut self, trader: impl Into<String>) -> Self {
        self.trader = Some(trader.into());
        self
    }

    pub fn trader_address(mut self, trader: Address) -> Self {
        self.trader = Some(trader.to_checksum(None));
        self
    }

    /// Set the quantity in base units.
    pub fn quantity(mut self, quantity: U256) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Set the price in base units.
    pub fn price(mut self, price: U256) -> Self {
        self.price = Some(price);
        self
    }

    pub fn buying(mut self, is_buying: bool) -> Self {
        self.is_buying = is_buying;
        self
    }

    /// Set expiry in seconds from now.
    ///
    /// A duration that overflows the timestamp is reported by `build`.
    pub fn expires_in(mut self, seconds: u64) -> Self {
        let now = Utc::now().timestamp().max(0) as u64;
        self.expiry = now.checked_add(seconds);
        self.expiry_overflow = self.expiry.is_none();
        self
    }

    /// Set absolute expiry timestamp.
    pub fn expires_at(mut self, timestamp: u64) -> Self {
        self.expiry = Some(timestamp);
        self.expiry_overflow = false;
        self
    }

    pub fn nonce(mut self, nonce: U256) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Build the bid, normalizing the trader address.
    ///
    /// Fails with `TypeMismatch` naming the first missing or out-of-range
    /// field, or `InvalidAddress` if the trader does not parse.
    pub fn build(self) -> Result<UnsignedBid> {
        if self.expiry_overflow {
            return Err(Error::TypeMismatch {
                field: "expiry".to_string(),
                expected: "unix timestamp (now + expires_in overflows u64)".to_string(),
            });
        }

        fn required<T>(value: Option<T>, field: &str, kind: &str) -> Result<T> {
            value.ok_or_else(|| Error::TypeMismatch {
                field: field.to_string(),
                expected: format!("{} (field missing)", kind),
            })
        }

        let bid = UnsignedBid {
            bid_id: required(self.bid_id, "bidId", "uint256")?,
            trader: required(self.trader, "trader", "address")?,
            quantity: required(self.quantity, "quantity", "uint256")?,
            price: required(self.price, "price", "uint256")?,
            is_buying: self.is_buying,
            expiry: required(self.expiry, "expiry", "uint256")?,
            nonce: required(self.nonce, "nonce", "uint256")?,
        };

        bid.normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRADER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn sample_bid() -> UnsignedBid {
        UnsignedBid {
            bid_id: U256::from(1u64),
            trader: TRADER.to_lowercase(),
            quantity: U256::from(10u64).pow(U256::from(18u64)),
            price: U256::from(500_000_000_000_000_000u64),
            is_buying: true,
            expiry: 1_700_003_600,
            nonce: U256::from(1u64),
        }
    }

    #[test]
    fn test_normalized_returns_new_value() {
        let bid = sample_bid();
        let normalized = bid.normalized().unwrap();

        assert_eq!(normalized.trader, TRADER);
        // The caller's value is left untouched
        assert_eq!(bid.trader, TRADER.to_lowercase());
        assert_eq!(normalized.bid_id, bid.bid_id);
    }

    #[test]
    fn test_normalized_rejects_bad_trader() {
        let mut bid = sample_bid();
        bid.trader = "0x1234".to_string();
        assert!(matches!(bid.normalized(), Err(Error::InvalidAddress { .. })));
    }

    #[test]
    fn test_trader_field_requires_checksum() {
        let bid = sample_bid();
        assert!(matches!(
            bid.field("trader"),
            Err(Error::InvalidAddress { .. })
        ));
        let normalized = bid.normalized().unwrap();
        assert!(matches!(
            normalized.field("trader"),
            Ok(Some(FieldValue::Address(_)))
        ));
    }

    #[test]
    fn test_expiry() {
        let bid = sample_bid();
        assert!(!bid.is_expired_at(1_700_000_000));
        assert!(bid.is_expired_at(1_700_003_600));
    }

    #[test]
    fn test_bid_builder() {
        let bid = BidBuilder::new()
            .bid_id(U256::from(7u64))
            .trader(TRADER.to_lowercase())
            .quantity(U256::from(100u64))
            .price(U256::from(5u64))
            .buying(true)
            .expires_at(1_700_000_000)
            .nonce(U256::from(3u64))
            .build()
            .unwrap();

        assert_eq!(bid.bid_id, U256::from(7u64));
        assert_eq!(bid.trader, TRADER);
        assert!(bid.is_buying);
        assert_eq!(bid.nonce, U256::from(3u64));
    }

    #[test]
    fn test_bid_builder_missing_field() {
        let err = BidBuilder::new()
            .bid_id(U256::from(7u64))
            .trader(TRADER)
            .quantity(U256::from(100u64))
            .expires_in(3600)
            .nonce(U256::from(3u64))
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::TypeMismatch { ref field, .. } if field == "price"));
    }

    fn builder_without_expiry() -> BidBuilder {
        BidBuilder::new()
            .bid_id(U256::from(7u64))
            .trader(TRADER)
            .quantity(U256::from(100u64))
            .price(U256::from(50u64))
            .nonce(U256::from(3u64))
    }

    #[test]
    fn test_expires_in_overflow_is_reported() {
        let err = builder_without_expiry()
            .expires_in(u64::MAX)
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::TypeMismatch { ref field, .. } if field == "expiry"));
    }

    #[test]
    fn test_expires_at_clears_overflow() {
        let bid = builder_without_expiry()
            .expires_in(u64::MAX)
            .expires_at(u64::MAX)
            .build()
            .unwrap();

        assert_eq!(bid.expiry, u64::MAX);
    }

    #[test]
    fn test_bid_id_accepts_full_uint256() {
        let bid = builder_without_expiry()
            .bid_id(U256::MAX)
            .expires_at(1_700_003_600)
            .build()
            .unwrap();

        assert_eq!(bid.bid_id, U256::MAX);
    }

    #[test]
    fn test_signature_components_round_trip() {
        let signature = BidSignature {
            v: 28,
            r: B256::repeat_byte(0x11),
            s: B256::repeat_byte(0x22),
        };

        let primitive = signature.to_primitive().unwrap();
        assert_eq!(BidSignature::from_primitive(&primitive), signature);
        assert_eq!(signature.to_hex().len(), 132);
    }

    #[test]
    fn test_signature_rejects_bad_recovery_id() {
        let signature = BidSignature {
            v: 5,
            r: B256::repeat_byte(0x11),
            s: B256::repeat_byte(0x22),
        };
        assert!(matches!(
            signature.to_primitive(),
            Err(Error::Signature { .. })
        ));
    }

    #[test]
    fn test_signed_bid_wire_format() {
        let bid = sample_bid().normalized().unwrap();
        let signed = SignedBid::new(
            bid,
            BidSignature {
                v: 27,
                r: B256::repeat_byte(0xab),
                s: B256::repeat_byte(0xcd),
            },
        );

        let json = serde_json::to_value(&signed).unwrap();
        assert_eq!(json["bidId"], "1");
        assert_eq!(json["trader"], TRADER);
        assert_eq!(json["quantity"], "1000000000000000000");
        assert_eq!(json["price"], "500000000000000000");
        assert_eq!(json["isBuying"], true);
        assert_eq!(json["expiry"], 1_700_003_600u64);
        assert_eq!(json["nonce"], "1");
        assert_eq!(json["v"], 27);
        assert_eq!(json["r"], format!("0x{}", "ab".repeat(32)));
        assert_eq!(json["s"], format!("0x{}", "cd".repeat(32)));

        let decoded: SignedBid = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, signed);
    }
}
