//! Signing module for Crab OTC bids.
//!
//! This module provides EIP-712 typed data signing for bids settled by the
//! Crab V2 OTC contract, and recovery of the signer from a submitted bid.
//!
//! # Architecture
//!
//! ```text
//!   Domain ──────────┐
//!                    ▼
//! UnsignedBid ──► MessageCanonicalizer ──► CanonicalBytes ──► digest
//!                                                              │
//! Wallet ──────────────────► BidSigner ◄───────────────────────┘
//!                               │
//!                               ▼
//!                           SignedBid ──► AuctionClient
//! ```
//!
//! # Example
//!
//! ```ignore
//! use otc_core::signing::{BidBuilder, Domain, Wallet};
//!
//! let wallet = Wallet::from_private_key("0x...")?;
//! let domain = Domain::new("CrabOTC", "2", 1, "0x...")?;
//!
//! let bid = BidBuilder::new()
//!     .bid_id(U256::from(1))
//!     .trader_address(wallet.address())
//!     .quantity(U256::from(10).pow(U256::from(18)))
//!     .price(U256::from(5) * U256::from(10).pow(U256::from(17)))
//!     .buying(true)
//!     .expires_in(3600)
//!     .nonce(U256::from(1))
//!     .build()?;
//!
//! let signed = wallet.sign_bid(&domain, &bid)?;
//! assert!(signed.verify(&domain)?);
//! ```

pub mod canonical;
pub mod domain;
pub mod order_types;
pub mod schema;
pub mod signer;
pub mod wallet;

pub use canonical::{CanonicalBytes, MessageCanonicalizer, EIP712_PREFIX};

pub use domain::{
    normalize_address, require_checksummed, Domain, CRAB_OTC_DOMAIN_NAME,
    CRAB_OTC_DOMAIN_VERSION,
};

pub use order_types::{BidBuilder, BidSignature, SignedBid, UnsignedBid};

pub use schema::{Field, FieldType, FieldValue, StructSchema, TypedStruct};

pub use signer::BidSigner;

pub use wallet::Wallet;
