//! Signing seam: unsigned transactions go out to key management, raw signed
//! transactions come back.

use async_trait::async_trait;
use pollchain_types::{Address, PrivateKey};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::LedgerError;

/// A legacy (EIP-155) transaction ready to be signed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedTransaction {
    pub from: Address,
    #[serde(serialize_with = "quantity")]
    pub chain_id: u64,
    #[serde(serialize_with = "quantity")]
    pub nonce: u64,
    #[serde(rename = "gas", serialize_with = "quantity")]
    pub gas_limit: u64,
    #[serde(serialize_with = "quantity_u128")]
    pub gas_price: u128,
    pub to: Address,
    #[serde(serialize_with = "quantity_u128")]
    pub value: u128,
    #[serde(serialize_with = "bytes_hex")]
    pub data: Vec<u8>,
}

/// RLP-encoded signed transaction, ready for `eth_sendRawTransaction`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Vec<u8>,
}

#[async_trait]
pub trait TransactionSigner: Send + Sync {
    async fn sign(
        &self,
        tx: &UnsignedTransaction,
        key: &PrivateKey,
    ) -> Result<SignedTransaction, LedgerError>;
}

/// Signer backed by a key-management HTTP endpoint.
///
/// Posts `{"transaction": {...}, "private_key": "0x..."}` and expects
/// `{"raw_transaction": "0x..."}` back.
#[derive(Clone)]
pub struct RemoteSigner {
    http: reqwest::Client,
    url: String,
}

impl RemoteSigner {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::Signing(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[derive(Deserialize)]
struct SignResponse {
    raw_transaction: String,
}

#[async_trait]
impl TransactionSigner for RemoteSigner {
    async fn sign(
        &self,
        tx: &UnsignedTransaction,
        key: &PrivateKey,
    ) -> Result<SignedTransaction, LedgerError> {
        let body = serde_json::json!({
            "transaction": tx,
            "private_key": key.expose_hex(),
        });
        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Signing(format!("signer unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(LedgerError::Signing(format!(
                "signer returned HTTP {}",
                response.status()
            )));
        }

        let signed: SignResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Signing(format!("invalid signer response: {e}")))?;
        let digits = signed
            .raw_transaction
            .strip_prefix("0x")
            .unwrap_or(&signed.raw_transaction);
        let raw = hex::decode(digits)
            .map_err(|e| LedgerError::Signing(format!("signer returned bad hex: {e}")))?;
        Ok(SignedTransaction { raw })
    }
}

fn quantity<S: serde::Serializer>(v: &u64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("0x{v:x}"))
}

fn quantity_u128<S: serde::Serializer>(v: &u128, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("0x{v:x}"))
}

fn bytes_hex<S: serde::Serializer>(v: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("0x{}", hex::encode(v)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_transaction_uses_json_rpc_quantities() {
        let tx = UnsignedTransaction {
            from: Address::new([0x22; 20]),
            chain_id: 11_155_111,
            nonce: 0,
            gas_limit: 200_000,
            gas_price: 20_000_000_000,
            to: Address::new([0x11; 20]),
            value: 0,
            data: vec![0xde, 0xad],
        };
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["chainId"], "0xaa36a7");
        assert_eq!(json["nonce"], "0x0");
        assert_eq!(json["gas"], "0x30d40");
        assert_eq!(json["gasPrice"], "0x4a817c800");
        assert_eq!(json["data"], "0xdead");
    }
}
