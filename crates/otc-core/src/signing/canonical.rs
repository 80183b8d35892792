//! Canonical EIP-712 encoding of bids.
//!
//! The signed payload is `0x19 ‖ 0x01 ‖ domainSeparator ‖ hashStruct(bid)`;
//! its keccak256 is the digest the settlement contract recovers the trader
//! from. The encoding must match the contract bit for bit.

use std::fmt;

use alloy_primitives::{keccak256, B256};

use super::domain::Domain;
use super::order_types::UnsignedBid;
use super::schema::{StructSchema, TypedStruct};
use crate::Result;

/// EIP-191 version byte prefix for structured data.
pub const EIP712_PREFIX: [u8; 2] = [0x19, 0x01];

/// The exact 66-byte input of the EIP-712 signing hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanonicalBytes([u8; 66]);

impl CanonicalBytes {
    fn new(domain_separator: B256, struct_hash: B256) -> Self {
        let mut bytes = [0u8; 66];
        bytes[..2].copy_from_slice(&EIP712_PREFIX);
        bytes[2..34].copy_from_slice(domain_separator.as_slice());
        bytes[34..].copy_from_slice(struct_hash.as_slice());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 66] {
        &self.0
    }

    pub fn domain_separator(&self) -> B256 {
        B256::from_slice(&self.0[2..34])
    }

    pub fn struct_hash(&self) -> B256 {
        B256::from_slice(&self.0[34..])
    }

    /// keccak256 of the canonical bytes; the value that gets signed.
    pub fn digest(&self) -> B256 {
        keccak256(self.0)
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for CanonicalBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CanonicalBytes(0x{})", hex::encode(self.0))
    }
}

/// Hashes domains and bids under a fixed pair of schemas.
///
/// Schemas are bound at construction; [`MessageCanonicalizer::crab_v2`]
/// is the layout the Crab V2 settlement contract verifies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageCanonicalizer {
    domain_schema: StructSchema,
    message_schema: StructSchema,
}

impl MessageCanonicalizer {
    pub fn new(domain_schema: StructSchema, message_schema: StructSchema) -> Self {
        Self {
            domain_schema,
            message_schema,
        }
    }

    /// Standard EIP-712 domain with the Crab V2 `Order` struct.
    pub fn crab_v2() -> Self {
        Self::new(StructSchema::eip712_domain(), StructSchema::crab_order())
    }

    pub fn domain_schema(&self) -> &StructSchema {
        &self.domain_schema
    }

    pub fn message_schema(&self) -> &StructSchema {
        &self.message_schema
    }

    pub fn domain_separator(&self, domain: &Domain) -> Result<B256> {
        self.domain_schema.hash_struct(domain)
    }

    /// Struct hash of a message, independent of the domain.
    pub fn struct_hash<M: TypedStruct + ?Sized>(&self, message: &M) -> Result<B256> {
        self.message_schema.hash_struct(message)
    }

    /// Build the canonical signing input for `bid` under `domain`.
    ///
    /// `bid.trader` must already be checksummed; a non-normalized address
    /// fails with `InvalidAddress` rather than being fixed up.
    pub fn canonicalize(&self, domain: &Domain, bid: &UnsignedBid) -> Result<CanonicalBytes> {
        let domain_separator = self.domain_separator(domain)?;
        let struct_hash = self.struct_hash(bid)?;
        Ok(CanonicalBytes::new(domain_separator, struct_hash))
    }

    /// Digest to sign for `bid` under `domain`.
    pub fn signing_hash(&self, domain: &Domain, bid: &UnsignedBid) -> Result<B256> {
        Ok(self.canonicalize(domain, bid)?.digest())
    }
}

impl Default for MessageCanonicalizer {
    fn default() -> Self {
        Self::crab_v2()
    }
}
