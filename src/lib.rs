//! Crab OTC: signing and bid-submission toolkit for the Crab V2 OTC auction.
//!
//! This is the root crate that provides benchmark and integration-test
//! access to the workspace. For actual functionality, use the individual
//! crates directly:
//!
//! - `otc-core`: bid signing, contract bindings, coordinator client
//! - `otc-cli`: the `crab-otc` command-line tool

// Re-export for benchmarks and integration tests
pub use otc_core as core;
