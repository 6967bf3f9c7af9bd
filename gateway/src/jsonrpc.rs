//! [`LedgerGateway`] over an EVM JSON-RPC endpoint.

use async_trait::async_trait;
use pollchain_types::{Address, PrivateKey, TxHash};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use crate::{
    LedgerError, LedgerGateway, ReadCall, ReadOutput, Receipt, ReceiptStatus, TransactionRequest,
    TransactionSigner, UnsignedTransaction,
};

/// HTTP client for the ledger node.
///
/// Wraps `reqwest::Client` with the node URL, the poll contract address and
/// a signer. Receipts are polled at `receipt_poll_interval` until mined.
#[derive(Clone)]
pub struct JsonRpcGateway {
    http: reqwest::Client,
    rpc_url: String,
    contract: Address,
    signer: Arc<dyn TransactionSigner>,
    receipt_poll_interval: Duration,
    next_id: Arc<AtomicU64>,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    status: Option<String>,
    block_number: Option<String>,
    gas_used: Option<String>,
}

impl JsonRpcGateway {
    pub fn new(
        rpc_url: impl Into<String>,
        contract: Address,
        signer: Arc<dyn TransactionSigner>,
        request_timeout: Duration,
        receipt_poll_interval: Duration,
    ) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LedgerError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            rpc_url: rpc_url.into(),
            contract,
            signer,
            receipt_poll_interval,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    pub fn contract(&self) -> &Address {
        &self.contract
    }

    /// Send a JSON-RPC request and return the `result` field (possibly `null`).
    async fn rpc_call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        trace!(method, id, "ledger rpc request");

        let response = self.http.post(&self.rpc_url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(LedgerError::Transport(format!(
                "ledger node returned HTTP {}",
                response.status()
            )));
        }

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::UnexpectedResponse(format!("invalid JSON-RPC body: {e}")))?;
        if let Some(err) = parsed.error {
            return Err(LedgerError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(parsed.result.unwrap_or(serde_json::Value::Null))
    }

    async fn rpc_string(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<String, LedgerError> {
        match self.rpc_call(method, params).await? {
            serde_json::Value::String(s) => Ok(s),
            other => Err(LedgerError::UnexpectedResponse(format!(
                "{method} returned {other}"
            ))),
        }
    }
}

#[async_trait]
impl LedgerGateway for JsonRpcGateway {
    async fn get_nonce(&self, account: &Address) -> Result<u64, LedgerError> {
        let nonce = self
            .rpc_string(
                "eth_getTransactionCount",
                serde_json::json!([account.to_hex(), "pending"]),
            )
            .await?;
        parse_quantity(&nonce)
    }

    async fn call_read_only(&self, call: &ReadCall) -> Result<ReadOutput, LedgerError> {
        debug!(method = call.method(), "ledger read-only call");
        let data = self
            .rpc_string(
                "eth_call",
                serde_json::json!([
                    {
                        "to": self.contract.to_hex(),
                        "data": format!("0x{}", hex::encode(call.calldata())),
                    },
                    "latest"
                ]),
            )
            .await?;
        call.decode_output(&parse_bytes(&data)?)
    }

    async fn submit_transaction(
        &self,
        request: &TransactionRequest,
        key: &PrivateKey,
    ) -> Result<TxHash, LedgerError> {
        let unsigned = UnsignedTransaction {
            from: request.from,
            chain_id: request.chain_id,
            nonce: request.nonce,
            gas_limit: request.gas.gas_limit,
            gas_price: request.gas.gas_price_wei,
            to: self.contract,
            value: 0,
            data: request.call.calldata(),
        };
        let signed = self.signer.sign(&unsigned, key).await?;
        let hash = self
            .rpc_string(
                "eth_sendRawTransaction",
                serde_json::json!([format!("0x{}", hex::encode(&signed.raw))]),
            )
            .await?;
        debug!(method = request.call.method(), nonce = request.nonce, %hash, "transaction broadcast");
        hash.parse()
            .map_err(|e| LedgerError::UnexpectedResponse(format!("bad transaction hash: {e}")))
    }

    async fn await_confirmation(&self, tx_hash: &TxHash) -> Result<Receipt, LedgerError> {
        loop {
            let value = self
                .rpc_call(
                    "eth_getTransactionReceipt",
                    serde_json::json!([tx_hash.to_string()]),
                )
                .await?;
            if value.is_null() {
                tokio::time::sleep(self.receipt_poll_interval).await;
                continue;
            }
            let raw: RawReceipt = serde_json::from_value(value)
                .map_err(|e| LedgerError::UnexpectedResponse(format!("invalid receipt: {e}")))?;
            return receipt_from_raw(*tx_hash, raw);
        }
    }
}

fn receipt_from_raw(tx_hash: TxHash, raw: RawReceipt) -> Result<Receipt, LedgerError> {
    let status = match raw.status.as_deref().map(parse_quantity).transpose()? {
        Some(1) => ReceiptStatus::Success,
        Some(0) => ReceiptStatus::Reverted,
        other => {
            return Err(LedgerError::UnexpectedResponse(format!(
                "receipt status {other:?}"
            )))
        }
    };
    Ok(Receipt {
        tx_hash,
        status,
        block_number: raw.block_number.as_deref().map(parse_quantity).transpose()?,
        gas_used: raw.gas_used.as_deref().map(parse_quantity).transpose()?,
    })
}

/// Parse a JSON-RPC hex quantity such as `"0x1a"`.
pub fn parse_quantity(s: &str) -> Result<u64, LedgerError> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| LedgerError::UnexpectedResponse(format!("quantity without 0x: {s}")))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| LedgerError::UnexpectedResponse(format!("bad quantity {s}: {e}")))
}

fn parse_bytes(s: &str) -> Result<Vec<u8>, LedgerError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|e| LedgerError::UnexpectedResponse(format!("bad hex data: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(status: Option<&str>) -> RawReceipt {
        RawReceipt {
            status: status.map(String::from),
            block_number: Some("0x10".into()),
            gas_used: Some("0x5208".into()),
        }
    }

    #[test]
    fn quantities() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x1a").unwrap(), 26);
        assert!(parse_quantity("1a").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn receipt_status_mapping() {
        let ok = receipt_from_raw(TxHash::ZERO, raw(Some("0x1"))).unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.block_number, Some(16));
        assert_eq!(ok.gas_used, Some(21_000));

        let reverted = receipt_from_raw(TxHash::ZERO, raw(Some("0x0"))).unwrap();
        assert_eq!(reverted.status, ReceiptStatus::Reverted);

        assert!(receipt_from_raw(TxHash::ZERO, raw(None)).is_err());
    }
}
