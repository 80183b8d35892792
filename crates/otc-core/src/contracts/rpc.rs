//! Ethereum JSON-RPC client.
//!
//! Every request is a single attempt; failures are reported to the caller
//! as [`Error::Rpc`] and never retried here.

use std::time::Duration;

use alloy_consensus::transaction::RlpEcdsaEncodableTx;
use alloy_consensus::TxLegacy;
use alloy_network::TxSignerSync;
use alloy_primitives::bytes::BytesMut;
use alloy_primitives::{Address, Bytes, TxKind, B256, U256, U64};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{MutatingCaller, ReadonlyCaller, TransactionReceipt};
use crate::config::ContractConfig;
use crate::signing::Wallet;
use crate::{Error, Result};

/// Gas limit for contract calls sent by the SDK (ERC-20 approve uses ~50k).
const DEFAULT_GAS_LIMIT: u64 = 100_000;

/// JSON-RPC client bound to one endpoint and chain.
#[derive(Clone)]
pub struct RpcClient {
    rpc_url: String,
    chain_id: u64,
    http_client: reqwest::Client,
    gas_limit: u64,
    receipt_poll_interval: Duration,
    receipt_poll_attempts: u32,
}

impl RpcClient {
    /// Create a new client for `rpc_url` on `chain_id`.
    pub fn new(rpc_url: impl Into<String>, chain_id: u64) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            chain_id,
            http_client: reqwest::Client::new(),
            gas_limit: DEFAULT_GAS_LIMIT,
            receipt_poll_interval: Duration::from_secs(2),
            receipt_poll_attempts: 60,
        }
    }

    /// Create a client for the endpoint and chain of `contract`.
    pub fn from_contract(contract: &ContractConfig) -> Self {
        Self::new(contract.rpc_uri(), contract.chain_id())
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Configure how long [`RpcClient::wait_for_receipt`] polls.
    pub fn with_receipt_polling(mut self, interval: Duration, attempts: u32) -> Self {
        self.receipt_poll_interval = interval;
        self.receipt_poll_attempts = attempts;
        self
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// `eth_call` at the latest block.
    pub async fn eth_call(&self, to: Address, data: &[u8]) -> Result<Bytes> {
        let params = serde_json::json!([
            { "to": format!("{:?}", to), "data": format!("0x{}", hex::encode(data)) },
            "latest"
        ]);
        self.rpc_call("eth_call", params).await
    }

    /// Get the current block number.
    pub async fn block_number(&self) -> Result<u64> {
        let block: U64 = self.rpc_call("eth_blockNumber", serde_json::json!([])).await?;
        Ok(block.to())
    }

    /// Pending-inclusive transaction count of `address`.
    pub async fn transaction_count(&self, address: Address) -> Result<u64> {
        let nonce: U64 = self
            .rpc_call(
                "eth_getTransactionCount",
                serde_json::json!([format!("{:?}", address), "pending"]),
            )
            .await?;
        Ok(nonce.to())
    }

    /// Current gas price in wei.
    pub async fn gas_price(&self) -> Result<u128> {
        let price: U256 = self.rpc_call("eth_gasPrice", serde_json::json!([])).await?;
        u128::try_from(price).map_err(|_| Error::rpc("gas price out of range"))
    }

    /// Broadcast a signed, RLP-encoded transaction and return its hash.
    pub async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256> {
        self.rpc_call(
            "eth_sendRawTransaction",
            serde_json::json!([format!("0x{}", hex::encode(raw))]),
        )
        .await
    }

    /// Receipt of `tx_hash`, or `None` while it is pending.
    pub async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TransactionReceipt>> {
        self.request(
            "eth_getTransactionReceipt",
            serde_json::json!([format!("{:?}", tx_hash)]),
        )
        .await
    }

    /// Poll until `tx_hash` is mined.
    ///
    /// Fails if the transaction reverts or is not mined within the
    /// configured polling window.
    pub async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TransactionReceipt> {
        for _ in 0..self.receipt_poll_attempts {
            if let Some(receipt) = self.transaction_receipt(tx_hash).await? {
                if !receipt.succeeded() {
                    return Err(Error::rpc(format!("transaction {:?} reverted", tx_hash)));
                }
                return Ok(receipt);
            }
            tokio::time::sleep(self.receipt_poll_interval).await;
        }

        Err(Error::rpc(format!(
            "transaction {:?} not mined after {:?}",
            tx_hash,
            self.receipt_poll_interval * self.receipt_poll_attempts
        )))
    }

    /// Sign a legacy (EIP-155) transaction calling `to` with `data`.
    async fn build_signed_call(&self, from: &Wallet, to: Address, data: Bytes) -> Result<Vec<u8>> {
        let signer = from.signing_key()?;

        let nonce = self.transaction_count(from.address()).await?;
        let gas_price = self.gas_price().await?;
        // 1.2x gas price for faster inclusion
        let gas_price = gas_price + gas_price / 5;

        let mut tx = TxLegacy {
            chain_id: Some(self.chain_id),
            nonce,
            gas_price,
            gas_limit: self.gas_limit,
            to: TxKind::Call(to),
            value: U256::ZERO,
            input: data,
        };

        let signature = signer
            .sign_transaction_sync(&mut tx)
            .map_err(|e| Error::Signature {
                message: format!("failed to sign transaction: {}", e),
            })?;

        let mut encoded = BytesMut::new();
        tx.rlp_encode_signed(&signature, &mut encoded);
        Ok(encoded.to_vec())
    }

    /// Send a request whose result must be present.
    async fn rpc_call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        self.request(method, params)
            .await?
            .ok_or_else(|| Error::rpc(format!("{}: empty result", method)))
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Option<T>> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        debug!(method = method, "Sending RPC request");

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::rpc(format!("{}: {}", method, e)))?;

        if !response.status().is_success() {
            warn!(method = method, status = %response.status(), "RPC request failed");
            return Err(Error::rpc(format!(
                "{}: HTTP {}",
                method,
                response.status()
            )));
        }

        let body: JsonRpcResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::rpc(format!("{}: invalid response: {}", method, e)))?;

        if let Some(error) = body.error {
            warn!(method = method, code = error.code, error = %error.message, "RPC error");
            return Err(Error::rpc(format!("{}: {}", method, error.message)));
        }

        Ok(body.result)
    }
}

#[async_trait]
impl ReadonlyCaller for RpcClient {
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        self.eth_call(to, &data).await
    }
}

#[async_trait]
impl MutatingCaller for RpcClient {
    async fn send_transaction(
        &self,
        from: &Wallet,
        to: Address,
        data: Bytes,
    ) -> Result<TransactionReceipt> {
        let raw = self.build_signed_call(from, to, data).await?;
        let tx_hash = self.send_raw_transaction(&raw).await?;
        info!(tx_hash = ?tx_hash, from = %from.address(), to = %to, "Transaction sent");

        let receipt = self.wait_for_receipt(tx_hash).await?;
        info!(
            tx_hash = ?tx_hash,
            block = ?receipt.block_number,
            gas_used = %receipt.gas_used,
            "Transaction mined"
        );
        Ok(receipt)
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The endpoint usually embeds an access token; show the host only
        let host = url::Url::parse(&self.rpc_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "<invalid>".to_string());

        f.debug_struct("RpcClient")
            .field("host", &host)
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'a str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}
