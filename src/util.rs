//! Size-limited codec helpers shared across the crate.

use crate::config::{MAX_ENVELOPE_SIZE, MAX_RECORD_SIZE};
use crate::error::{TradeError, TradeResult};
use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Deserialize CBOR data with a size limit to prevent oversized payloads.
pub fn cbor_from_limited_reader<T: DeserializeOwned>(
    data: &[u8],
    max_bytes: usize,
) -> TradeResult<T> {
    if data.len() > max_bytes {
        return Err(TradeError::Validation(format!(
            "CBOR payload too large: {} bytes (max {})",
            data.len(),
            max_bytes
        )));
    }
    ciborium::from_reader(data)
        .map_err(|e| TradeError::Serialization(format!("CBOR deserialization failed: {e}")))
}

/// Serialize a record snapshot to CBOR.
pub fn cbor_to_vec<T: Serialize>(value: &T) -> TradeResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)
        .map_err(|e| TradeError::Serialization(format!("CBOR serialization failed: {e}")))?;
    if buf.len() > MAX_RECORD_SIZE {
        return Err(TradeError::Validation(format!(
            "CBOR payload too large: {} bytes (max {MAX_RECORD_SIZE})",
            buf.len()
        )));
    }
    Ok(buf)
}

/// Deserialize bincode with a size limit to prevent OOM from crafted payloads.
pub fn bincode_deserialize_limited<T: DeserializeOwned>(data: &[u8]) -> TradeResult<T> {
    bincode::options()
        .with_limit(MAX_ENVELOPE_SIZE as u64)
        .deserialize(data)
        .map_err(|e| TradeError::Serialization(format!("bincode deserialization failed: {e}")))
}

/// Serialize to bincode with the same size limit applied on encode.
pub fn bincode_serialize_limited<T: Serialize>(value: &T) -> TradeResult<Vec<u8>> {
    bincode::options()
        .with_limit(MAX_ENVELOPE_SIZE as u64)
        .serialize(value)
        .map_err(|e| TradeError::Serialization(format!("bincode serialization failed: {e}")))
}
