//! Private key type for signing ledger transactions.

use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::TypesError;

/// A 32-byte secp256k1 private key supplied by the caller.
///
/// This type intentionally does not implement `Serialize` or `Clone`
/// to prevent accidental exposure. `Debug` is redacted and key bytes are
/// zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; 32]);

impl PrivateKey {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex encoding for handing the key to the key-management component.
    pub fn expose_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

/// Whitespace around the key and letter case are ignored; the `0x` prefix is
/// optional; exactly 64 hex digits must remain.
impl FromStr for PrivateKey {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.len() != 64 {
            return Err(TypesError::InvalidPrivateKey);
        }
        let mut arr = [0u8; 32];
        hex::decode_to_slice(digits, &mut arr).map_err(|_| TypesError::InvalidPrivateKey)?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}
