//! Crab OTC Core Library
//!
//! Bid signing, contract bindings and the auction coordinator client for
//! the Crab V2 OTC auction.

pub mod api;
pub mod config;
pub mod contracts;
pub mod error;
mod serde_helpers;
pub mod signing;
pub mod submission;

pub use error::{Error, Result};
pub use submission::SubmissionGate;
