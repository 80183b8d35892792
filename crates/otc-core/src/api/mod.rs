//! API clients for external services.

pub mod auction;

pub use auction::{Auction, AuctionClient};
