use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, error};

// ERC-20 function selectors: first four bytes of the keccak-256 of the
// canonical signature.
const TRANSFER_SELECTOR: &str = "a9059cbb";
const BALANCE_OF_SELECTOR: &str = "70a08231";

/// Minimal EVM JSON-RPC client built on reqwest. Talks to a node that holds
/// the submitting account, so transfers go out as `eth_sendTransaction`.
pub struct EvmRpcClient {
    http: reqwest::Client,
    rpc_url: String,
    token_address: String,
    receipt_poll_interval: Duration,
    receipt_poll_timeout: Duration,
    request_id: AtomicU64,
}

#[derive(Debug, Clone)]
pub struct TxReceipt {
    pub transaction_hash: String,
    pub succeeded: bool,
}

#[derive(Debug, Deserialize)]
struct RpcErrorDetails {
    code: Option<i64>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    result: Option<Value>,
    error: Option<RpcErrorDetails>,
}

impl EvmRpcClient {
    pub fn new(
        rpc_url: String,
        token_address: String,
        receipt_poll_interval: Duration,
        receipt_poll_timeout: Duration,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            rpc_url,
            token_address,
            receipt_poll_interval,
            receipt_poll_timeout,
            request_id: AtomicU64::new(1),
        }
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let resp = self.http.post(&self.rpc_url).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            error!(
                %status,
                method,
                "evm rpc http request failed"
            );
            anyhow::bail!("RPC request failed: {} (status {})", method, status);
        }

        let envelope: RpcEnvelope = resp.json().await?;

        if let Some(err) = envelope.error {
            let message = err.message.unwrap_or_else(|| "unknown RPC error".to_string());
            error!(
                method,
                rpc_error_code = ?err.code,
                rpc_error_message = %message,
                "evm rpc call returned an error"
            );
            // The raw node message is preserved so the payment flow can
            // classify it for payer guidance.
            anyhow::bail!("{}", message);
        }

        envelope
            .result
            .ok_or_else(|| anyhow::anyhow!("RPC response missing result for {}", method))
    }

    pub async fn chain_id(&self) -> Result<u64> {
        let result = self.rpc("eth_chainId", json!([])).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("eth_chainId returned a non-string result"))?;
        Ok(u64::from_str_radix(raw.trim_start_matches("0x"), 16)?)
    }

    /// Submits an ERC-20 `transfer(to, amount)` of the configured token and
    /// returns the transaction hash.
    pub async fn submit_transfer(
        &self,
        from: &str,
        to: &str,
        amount_base_units: u128,
    ) -> Result<String> {
        let data = encode_transfer_calldata(to, amount_base_units)?;
        let from = normalize_address(from)?;

        debug!(
            from = %from,
            token = %self.token_address,
            amount_base_units,
            "submitting token transfer"
        );

        let result = self
            .rpc(
                "eth_sendTransaction",
                json!([{
                    "from": format!("0x{from}"),
                    "to": self.token_address,
                    "data": data,
                }]),
            )
            .await?;

        result
            .as_str()
            .map(|hash| hash.to_string())
            .ok_or_else(|| anyhow::anyhow!("eth_sendTransaction returned a non-string result"))
    }

    /// Polls for the transaction receipt until it lands or the configured
    /// timeout elapses. A mined-but-reverted transaction yields a receipt
    /// with `succeeded == false`, not an error.
    pub async fn await_receipt(&self, transaction_hash: &str) -> Result<TxReceipt> {
        let started = tokio::time::Instant::now();

        loop {
            let result = self
                .rpc("eth_getTransactionReceipt", json!([transaction_hash]))
                .await?;

            if !result.is_null() {
                let status = result
                    .get("status")
                    .and_then(Value::as_str)
                    .unwrap_or("0x0");
                return Ok(TxReceipt {
                    transaction_hash: transaction_hash.to_string(),
                    succeeded: status == "0x1",
                });
            }

            if started.elapsed() >= self.receipt_poll_timeout {
                anyhow::bail!(
                    "timed out waiting for transaction receipt: {}",
                    transaction_hash
                );
            }

            tokio::time::sleep(self.receipt_poll_interval).await;
        }
    }

    /// Reads the token balance of an account via `balanceOf`, scaled from
    /// base units to a whole-token amount.
    pub async fn token_balance(&self, account: &str) -> Result<f64> {
        let data = encode_balance_of_calldata(account)?;
        let result = self
            .rpc(
                "eth_call",
                json!([{ "to": self.token_address, "data": data }, "latest"]),
            )
            .await?;

        let word = result
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("eth_call returned a non-string result"))?;
        let base_units = decode_u256_word(word)?;

        Ok(base_units as f64 / 1_000_000.0)
    }
}

/// Validates a 0x-prefixed EVM address and returns its bare lowercase hex.
pub fn normalize_address(address: &str) -> Result<String> {
    let stripped = address
        .strip_prefix("0x")
        .ok_or_else(|| anyhow::anyhow!("address is missing the 0x prefix: {}", address))?;

    if stripped.len() != 40 {
        anyhow::bail!("address must be 20 bytes of hex: {}", address);
    }
    hex::decode(stripped)?;

    Ok(stripped.to_ascii_lowercase())
}

pub fn encode_transfer_calldata(to: &str, amount_base_units: u128) -> Result<String> {
    let to = normalize_address(to)?;
    Ok(format!(
        "0x{TRANSFER_SELECTOR}{:0>64}{:064x}",
        to, amount_base_units
    ))
}

pub fn encode_balance_of_calldata(account: &str) -> Result<String> {
    let account = normalize_address(account)?;
    Ok(format!("0x{BALANCE_OF_SELECTOR}{:0>64}", account))
}

/// Decodes a single 0x-prefixed 32-byte ABI word into an integer.
pub fn decode_u256_word(word: &str) -> Result<u128> {
    let stripped = word.trim_start_matches("0x");
    if stripped.is_empty() {
        anyhow::bail!("empty ABI word");
    }
    Ok(u128::from_str_radix(stripped, 16)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MERCHANT: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

    #[test]
    fn encodes_transfer_calldata_with_padded_args() {
        let data = encode_transfer_calldata(MERCHANT, 12_340_000).unwrap();

        assert_eq!(data.len(), 2 + 8 + 64 + 64);
        assert!(data.starts_with("0xa9059cbb"));
        assert!(data.contains("00000000000000000000000052908400098527886e0f7030069857d2e4169ee7"));
        assert!(data.ends_with("0000000000000000000000000000000000000000000000000000000000bc4b20"));
    }

    #[test]
    fn encodes_balance_of_calldata() {
        let data = encode_balance_of_calldata(MERCHANT).unwrap();

        assert_eq!(data.len(), 2 + 8 + 64);
        assert!(data.starts_with("0x70a08231"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(encode_transfer_calldata("52908400098527886E0F7030069857D2E4169EE7", 1).is_err());
        assert!(encode_transfer_calldata("0x1234", 1).is_err());
        assert!(encode_transfer_calldata("0xzz908400098527886E0F7030069857D2E4169EE7", 1).is_err());
    }

    #[test]
    fn decodes_abi_words() {
        assert_eq!(
            decode_u256_word("0x0000000000000000000000000000000000000000000000000000000000bc4b20")
                .unwrap(),
            12_340_000
        );
        assert_eq!(decode_u256_word("0x0").unwrap(), 0);
        assert!(decode_u256_word("0x").is_err());
    }
}
