//! Solidity ABI encoding and decoding for the subset of types the poll
//! contract uses: `uint256`, `string` and dynamic arrays of those.
//!
//! Every supported type occupies exactly one 32-byte head slot. Dynamic values
//! (`string`, arrays) store an offset in the head and their body in the tail.

use pollchain_types::keccak256;

use crate::LedgerError;

const WORD: usize = 32;

/// A decoded or to-be-encoded ABI value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// `uint256`, restricted to values that fit in a `u64`.
    Uint(u64),
    String(String),
    Array(Vec<Token>),
}

/// Type descriptor used to drive decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamType {
    Uint,
    String,
    Array(Box<ParamType>),
}

impl ParamType {
    pub fn array(inner: ParamType) -> Self {
        ParamType::Array(Box::new(inner))
    }

    fn is_dynamic(&self) -> bool {
        !matches!(self, ParamType::Uint)
    }
}

impl Token {
    fn is_dynamic(&self) -> bool {
        !matches!(self, Token::Uint(_))
    }

    pub fn into_uint(self) -> Result<u64, LedgerError> {
        match self {
            Token::Uint(v) => Ok(v),
            other => Err(LedgerError::Decode(format!("expected uint, got {other:?}"))),
        }
    }

    pub fn into_string(self) -> Result<String, LedgerError> {
        match self {
            Token::String(s) => Ok(s),
            other => Err(LedgerError::Decode(format!("expected string, got {other:?}"))),
        }
    }

    pub fn into_array(self) -> Result<Vec<Token>, LedgerError> {
        match self {
            Token::Array(items) => Ok(items),
            other => Err(LedgerError::Decode(format!("expected array, got {other:?}"))),
        }
    }
}

/// First four bytes of the Keccak-256 hash of a canonical function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = keccak256(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Calldata for a function call: selector followed by the encoded arguments.
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut out = selector(signature).to_vec();
    out.extend(encode(args));
    out
}

/// Encode a list of values as an ABI tuple.
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = WORD * tokens.len();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();
    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&word((head_len + tail.len()) as u64));
            tail.extend(encode_token(token));
        } else {
            head.extend(encode_token(token));
        }
    }
    head.extend(tail);
    head
}

fn encode_token(token: &Token) -> Vec<u8> {
    match token {
        Token::Uint(v) => word(*v).to_vec(),
        Token::String(s) => {
            let bytes = s.as_bytes();
            let mut out = word(bytes.len() as u64).to_vec();
            out.extend_from_slice(bytes);
            out.resize(WORD + padded_len(bytes.len()), 0);
            out
        }
        Token::Array(items) => {
            let mut out = word(items.len() as u64).to_vec();
            out.extend(encode(items));
            out
        }
    }
}

/// Decode an ABI tuple of the given types.
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, LedgerError> {
    let mut tokens = Vec::with_capacity(types.len());
    for (i, ty) in types.iter().enumerate() {
        let slot = read_word(data, i * WORD)?;
        let token = if ty.is_dynamic() {
            let offset = word_to_usize(&slot)?;
            let body = data
                .get(offset..)
                .ok_or_else(|| LedgerError::Decode(format!("offset {offset} out of bounds")))?;
            decode_token(ty, body)?
        } else {
            Token::Uint(word_to_u64(&slot)?)
        };
        tokens.push(token);
    }
    Ok(tokens)
}

fn decode_token(ty: &ParamType, data: &[u8]) -> Result<Token, LedgerError> {
    match ty {
        ParamType::Uint => Ok(Token::Uint(word_to_u64(&read_word(data, 0)?)?)),
        ParamType::String => {
            let len = word_to_usize(&read_word(data, 0)?)?;
            let bytes = WORD
                .checked_add(len)
                .and_then(|end| data.get(WORD..end))
                .ok_or_else(|| LedgerError::Decode(format!("string of {len} bytes truncated")))?;
            let s = std::str::from_utf8(bytes)
                .map_err(|e| LedgerError::Decode(format!("string is not utf-8: {e}")))?;
            Ok(Token::String(s.to_string()))
        }
        ParamType::Array(inner) => {
            let len = word_to_usize(&read_word(data, 0)?)?;
            let body = &data[WORD..];
            // Every element takes at least one head slot.
            if len > body.len() / WORD {
                return Err(LedgerError::Decode(format!(
                    "array length {len} exceeds available data"
                )));
            }
            let types = vec![(**inner).clone(); len];
            Ok(Token::Array(decode(&types, body)?))
        }
    }
}

fn word(v: u64) -> [u8; WORD] {
    let mut out = [0u8; WORD];
    out[WORD - 8..].copy_from_slice(&v.to_be_bytes());
    out
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD) * WORD
}

fn read_word(data: &[u8], at: usize) -> Result<[u8; WORD], LedgerError> {
    data.get(at..at + WORD)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| LedgerError::Decode(format!("missing word at offset {at}")))
}

fn word_to_u64(w: &[u8; WORD]) -> Result<u64, LedgerError> {
    if w[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(LedgerError::Decode("uint256 value exceeds u64".into()));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&w[WORD - 8..]);
    Ok(u64::from_be_bytes(buf))
}

fn word_to_usize(w: &[u8; WORD]) -> Result<usize, LedgerError> {
    let v = word_to_u64(w)?;
    usize::try_from(v).map_err(|_| LedgerError::Decode(format!("length {v} exceeds usize")))
}
