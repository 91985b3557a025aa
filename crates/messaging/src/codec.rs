//! JSON encoding for event payloads.

use serde::{Serialize, de::DeserializeOwned};

use crate::Result;

/// Encodes an event as a JSON payload.
pub fn encode<T: Serialize>(event: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(event)?)
}

/// Decodes a JSON payload into an event.
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(payload)?)
}
