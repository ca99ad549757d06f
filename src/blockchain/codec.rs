use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors that can occur while producing canonical bytes
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Value cannot be canonically encoded: {0}")]
    Unencodable(#[from] serde_json::Error),

    #[error("Non-finite number at {0}")]
    NonFiniteNumber(String),
}

/// Converts a value into its canonical tree form.
///
/// `serde_json::Value` keeps object members in a `BTreeMap`, so every map in the
/// returned tree is ordered lexicographically by key no matter how the source
/// value inserted them.
pub fn to_canonical_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, CodecError> {
    Ok(serde_json::to_value(value)?)
}

/// Writes an already-canonical tree as compact JSON bytes
pub fn encode_value(value: &Value) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(value)?)
}

/// Deterministically encodes a structured value.
///
/// Semantically equal values always produce identical bytes, which is what the
/// block hash and every transaction signature are computed over.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    encode_value(&to_canonical_value(value)?)
}

/// Hex encoded SHA-256 digest of `bytes`
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Rejects floats that serde_json would silently collapse to `null`, which would
/// let two different numbers share one encoding.
pub fn ensure_finite(field: &str, number: f64) -> Result<(), CodecError> {
    if number.is_finite() {
        Ok(())
    } else {
        Err(CodecError::NonFiniteNumber(field.to_string()))
    }
}
