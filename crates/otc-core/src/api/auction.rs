//! Auction coordinator HTTP client.
//!
//! Reads are retried with exponential backoff on 5xx and 429 responses.
//! Writes (auction updates and bid submission) are sent exactly once; a
//! failed submission is reported to the caller, who decides whether to
//! re-sign with a fresh nonce.

use std::collections::HashMap;
use std::time::Duration;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::signing::SignedBid;
use crate::{Error, Result};

/// Auction record published by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Auction {
    pub current_auction_id: u64,
    /// Whether the Crab strategy sells oSQTH in this auction.
    pub is_selling: bool,
    #[serde(with = "crate::serde_helpers::u256_decimal")]
    pub o_sqth_amount: U256,
    #[serde(with = "crate::serde_helpers::u256_decimal")]
    pub min_size: U256,
    #[serde(with = "crate::serde_helpers::u256_decimal")]
    pub min_price: U256,
    #[serde(with = "crate::serde_helpers::u256_decimal")]
    pub max_price: U256,
    /// Auction end (unix milliseconds).
    pub end_time: u64,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::serde_helpers::u256_decimal_opt"
    )]
    pub clearing_price: Option<U256>,
    /// Bids received so far, keyed by coordinator bid id.
    #[serde(default)]
    pub bids: HashMap<String, SignedBid>,
}

/// Client for the auction coordinator API.
#[derive(Debug, Clone)]
pub struct AuctionClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl AuctionClient {
    /// Maximum attempts for idempotent reads.
    const MAX_RETRIES: u32 = 3;

    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create or edit an auction (`POST /auction`).
    pub async fn create_or_edit_auction(&self, auction: &Auction) -> Result<()> {
        let url = format!("{}/auction", self.base_url);
        self.post_json(&url, auction).await?;
        info!(auction_id = auction.current_auction_id, "Auction updated");
        Ok(())
    }

    /// Fetch the latest auction (`GET /auction/latest`).
    pub async fn latest_auction(&self) -> Result<Auction> {
        let url = format!("{}/auction/latest", self.base_url);
        let response = self.get_with_retry(&url).await?;
        let auction: Auction = response.json().await?;
        debug!(auction_id = auction.current_auction_id, "Fetched latest auction");
        Ok(auction)
    }

    /// Submit a signed bid (`POST /bid`). Never retried.
    pub async fn submit_bid(&self, bid: &SignedBid) -> Result<()> {
        let url = format!("{}/bid", self.base_url);
        self.post_json(&url, bid).await?;
        info!(trader = bid.trader(), nonce = %bid.nonce(), "Bid submitted");
        Ok(())
    }

    /// Poll the latest auction until its id differs from `previous_id`.
    ///
    /// Checks up to `max_polls` times, sleeping `interval` between checks.
    pub async fn wait_for_new_auction(
        &self,
        previous_id: u64,
        interval: Duration,
        max_polls: u32,
    ) -> Result<Auction> {
        for poll in 0..max_polls {
            let auction = self.latest_auction().await?;
            if auction.current_auction_id != previous_id {
                info!(
                    previous_id,
                    auction_id = auction.current_auction_id,
                    "New auction available"
                );
                return Ok(auction);
            }

            debug!(poll = poll + 1, previous_id, "No new auction yet");
            if poll + 1 < max_polls {
                tokio::time::sleep(interval).await;
            }
        }

        Err(Error::Api {
            message: format!(
                "auction {} still current after {} polls",
                previous_id, max_polls
            ),
            status: None,
        })
    }

    async fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<()> {
        let payload = serde_json::to_string(body)?;
        debug!(url = url, payload = %payload, "POST request body");

        let response = self
            .http_client
            .post(url)
            .header("Content-Type", "application/json")
            .body(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                message: format!("POST {} failed: {} - {}", url, status, text),
                status: Some(status),
            });
        }

        Ok(())
    }

    /// Execute an HTTP GET with retry and exponential backoff.
    ///
    /// Retries on 5xx server errors and 429 rate-limit responses (with a longer
    /// backoff for 429). All other 4xx errors fail immediately.
    async fn get_with_retry(&self, url: &str) -> Result<reqwest::Response> {
        let mut last_error = None;

        for attempt in 0..Self::MAX_RETRIES {
            match self.http_client.get(url).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response)
                    if response.status().as_u16() == 429 || response.status().is_server_error() =>
                {
                    let status = response.status();
                    let is_rate_limited = status.as_u16() == 429;
                    warn!(
                        attempt = attempt + 1,
                        status = %status,
                        url = url,
                        rate_limited = is_rate_limited,
                        "Retryable API error, backing off"
                    );
                    last_error = Some(Error::Api {
                        message: format!(
                            "{}: {}",
                            if is_rate_limited {
                                "Rate limited"
                            } else {
                                "Server error"
                            },
                            status
                        ),
                        status: Some(status.as_u16()),
                    });

                    if attempt + 1 < Self::MAX_RETRIES {
                        let backoff = if is_rate_limited {
                            Duration::from_millis(2000 * 2u64.pow(attempt))
                        } else {
                            Duration::from_millis(500 * 2u64.pow(attempt))
                        };
                        tokio::time::sleep(backoff).await;
                    }
                    continue;
                }
                Ok(response) => {
                    return Err(Error::Api {
                        message: format!("GET {} failed: {}", url, response.status()),
                        status: Some(response.status().as_u16()),
                    });
                }
                Err(e) => {
                    warn!(
                        attempt = attempt + 1,
                        error = %e,
                        url = url,
                        "HTTP request failed, backing off"
                    );
                    last_error = Some(Error::Http(e));
                }
            }

            if attempt + 1 < Self::MAX_RETRIES {
                let backoff = Duration::from_millis(500 * 2u64.pow(attempt));
                tokio::time::sleep(backoff).await;
            }
        }

        Err(last_error.unwrap_or(Error::Api {
            message: "Max retries exceeded".to_string(),
            status: None,
        }))
    }
}
