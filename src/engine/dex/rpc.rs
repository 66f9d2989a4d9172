// Paw Swap Engine — DEX JSON-RPC Provider
// `ChainProvider` over a node's JSON-RPC endpoint. Signing is delegated to
// the node's unlocked account (`eth_sendTransaction`).

use super::primitives::{hex_decode, hex_encode, parse_hash, parse_quantity, parse_quantity_u64};
use crate::atoms::constants::{DEFAULT_RECEIPT_POLL_MS, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::atoms::error::{SwapError, SwapResult};
use crate::atoms::traits::ChainProvider;
use crate::atoms::types::{Address, Amount, LogEntry, TxHash, TxReceipt};
use async_trait::async_trait;
use log::{debug, warn};
use std::time::Duration;

/// JSON-RPC error code geth / anvil use for `execution reverted`.
const EXECUTION_REVERTED_CODE: i64 = 3;

pub struct JsonRpcProvider {
    rpc_url: String,
    client: reqwest::Client,
    timeout: Duration,
    receipt_poll: Duration,
}

impl JsonRpcProvider {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        JsonRpcProvider {
            rpc_url: rpc_url.into(),
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            receipt_poll: Duration::from_millis(DEFAULT_RECEIPT_POLL_MS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_receipt_poll(mut self, interval: Duration) -> Self {
        self.receipt_poll = interval;
        self
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Low-level JSON-RPC call
    pub async fn rpc_call(&self, method: &str, params: serde_json::Value) -> SwapResult<serde_json::Value> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        debug!("[rpc] {} → {}", method, self.rpc_url);
        let resp = self.client.post(&self.rpc_url).json(&body).timeout(self.timeout).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SwapError::call("rpc", format!("{} returned HTTP {}", method, status)));
        }

        let result: serde_json::Value = resp.json().await?;

        if let Some(error) = result.get("error") {
            return Err(classify_rpc_error(method, error));
        }

        result
            .get("result")
            .cloned()
            .ok_or_else(|| SwapError::call("rpc", format!("{} response missing 'result' field", method)))
    }

    /// Get transaction receipt (to check if tx was mined)
    async fn get_transaction_receipt(&self, tx: &TxHash) -> SwapResult<Option<TxReceipt>> {
        let result = self.rpc_call("eth_getTransactionReceipt", serde_json::json!([tx.to_string()])).await?;
        if result.is_null() {
            Ok(None)
        } else {
            parse_receipt(*tx, &result).map(Some)
        }
    }

    /// Re-run a failed transaction as `eth_call` against its parent block to
    /// recover the revert reason. Receipts from standard nodes carry none.
    async fn replay_revert_reason(&self, tx: &TxHash, block_number: Option<u64>) -> Option<String> {
        let raw = match self.rpc_call("eth_getTransactionByHash", serde_json::json!([tx.to_string()])).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!("[rpc] Could not fetch {} for replay: {}", tx, e);
                return None;
            }
        };
        let params = replay_call_params(&raw, block_number)?;
        revert_reason_of(self.rpc_call("eth_call", params).await)
    }
}

/// `eth_call` params replaying transaction `raw` at the block before
/// `block_number` (or `latest` when unknown).
fn replay_call_params(raw: &serde_json::Value, block_number: Option<u64>) -> Option<serde_json::Value> {
    let from = raw.get("from")?.as_str()?;
    let to = raw.get("to")?.as_str()?;
    let input = raw.get("input").or_else(|| raw.get("data"))?.as_str()?;
    let block = match block_number {
        Some(n) if n > 0 => format!("0x{:x}", n - 1),
        _ => "latest".to_string(),
    };
    Some(serde_json::json!([{ "from": from, "to": to, "data": input }, block]))
}

/// The reason carried by a replayed call's revert, if it reverted.
fn revert_reason_of(replayed: SwapResult<serde_json::Value>) -> Option<String> {
    match replayed {
        Err(SwapError::ContractRevert { reason, .. }) | Err(SwapError::InsufficientAllowance { reason, .. }) => {
            Some(reason)
        }
        _ => None,
    }
}

/// A node error is a revert when the node says so (code 3, or a message
/// mentioning a revert). Everything else is a transient read failure.
fn classify_rpc_error(method: &str, error: &serde_json::Value) -> SwapError {
    let code = error.get("code").and_then(|c| c.as_i64());
    let message = error.get("message").and_then(|m| m.as_str()).unwrap_or("unknown RPC error");
    let lower = message.to_lowercase();

    if code == Some(EXECUTION_REVERTED_CODE) || lower.contains("revert") {
        let reason = match error.get("data").and_then(|d| d.as_str()) {
            Some(data) if !lower.contains(':') => format!("{} ({})", message, data),
            _ => message.to_string(),
        };
        return SwapError::revert(None, reason);
    }
    SwapError::call("rpc", format!("{} failed: {}", method, error))
}

fn str_field<'a>(value: &'a serde_json::Value, key: &str) -> SwapResult<&'a str> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| SwapError::call("rpc", format!("receipt missing '{}'", key)))
}

fn parse_receipt(tx_hash: TxHash, receipt: &serde_json::Value) -> SwapResult<TxReceipt> {
    let status = receipt.get("status").and_then(|v| v.as_str()).unwrap_or("0x0");
    let block_number = receipt.get("blockNumber").and_then(|v| v.as_str()).and_then(|h| parse_quantity_u64(h).ok());

    let mut logs = Vec::new();
    if let Some(raw_logs) = receipt.get("logs").and_then(|v| v.as_array()) {
        for raw in raw_logs {
            let address: Address = str_field(raw, "address")?.parse()?;
            let topics = raw
                .get("topics")
                .and_then(|t| t.as_array())
                .map(|arr| {
                    arr.iter()
                        .filter_map(|t| t.as_str())
                        .map(|t| parse_hash(t).map_err(|e| SwapError::call("rpc", e)))
                        .collect::<SwapResult<Vec<_>>>()
                })
                .transpose()?
                .unwrap_or_default();
            let data = hex_decode(str_field(raw, "data")?).map_err(|e| SwapError::call("rpc", e))?;
            logs.push(LogEntry { address, topics, data });
        }
    }

    Ok(TxReceipt {
        tx_hash,
        success: status == "0x1",
        block_number,
        revert_reason: receipt.get("revertReason").and_then(|v| v.as_str()).map(String::from),
        logs,
    })
}

#[async_trait]
impl ChainProvider for JsonRpcProvider {
    /// Call a contract (read-only)
    async fn call(&self, to: &Address, data: &[u8]) -> SwapResult<Vec<u8>> {
        let result = self
            .rpc_call("eth_call", serde_json::json!([{ "to": to.to_hex(), "data": hex_encode(data) }, "latest"]))
            .await?;
        let hex = result.as_str().ok_or_else(|| SwapError::call(to, "Invalid eth_call result"))?;
        hex_decode(hex).map_err(|e| SwapError::call(to, e))
    }

    async fn native_balance(&self, address: &Address) -> SwapResult<Amount> {
        let result = self.rpc_call("eth_getBalance", serde_json::json!([address.to_hex(), "latest"])).await?;
        let hex = result.as_str().ok_or_else(|| SwapError::call("rpc", "Invalid balance result"))?;
        parse_quantity(hex).map_err(|e| SwapError::call("rpc", e))
    }

    async fn send_transaction(&self, from: &Address, to: &Address, data: &[u8]) -> SwapResult<TxHash> {
        let result = self
            .rpc_call(
                "eth_sendTransaction",
                serde_json::json!([{ "from": from.to_hex(), "to": to.to_hex(), "data": hex_encode(data) }]),
            )
            .await?;
        let hex = result.as_str().ok_or_else(|| SwapError::call("rpc", "Invalid tx hash result"))?;
        hex.parse()
    }

    async fn wait_for_receipt(&self, tx: &TxHash) -> SwapResult<TxReceipt> {
        loop {
            match self.get_transaction_receipt(tx).await {
                Ok(Some(mut receipt)) => {
                    if !receipt.success && receipt.revert_reason.is_none() {
                        receipt.revert_reason = self.replay_revert_reason(tx, receipt.block_number).await;
                    }
                    return Ok(receipt);
                }
                Ok(None) => {}
                Err(e) if e.is_retryable() => warn!("[rpc] Receipt poll for {} failed, retrying: {}", tx, e),
                Err(e) => return Err(e),
            }
            tokio::time::sleep(self.receipt_poll).await;
        }
    }

    async fn accounts(&self) -> SwapResult<Vec<Address>> {
        let result = self.rpc_call("eth_accounts", serde_json::json!([])).await?;
        let list = result.as_array().ok_or_else(|| SwapError::call("rpc", "Invalid eth_accounts result"))?;
        list.iter()
            .map(|v| v.as_str().ok_or_else(|| SwapError::call("rpc", "non-string account")).and_then(|s| s.parse()))
            .collect()
    }

    /// Get chain ID
    async fn chain_id(&self) -> SwapResult<u64> {
        let result = self.rpc_call("eth_chainId", serde_json::json!([])).await?;
        let hex = result.as_str().ok_or_else(|| SwapError::call("rpc", "Invalid chain ID"))?;
        parse_quantity_u64(hex).map_err(|e| SwapError::call("rpc", format!("Parse chain ID: {}", e)))
    }
}
