use serde::de::DeserializeOwned;

use crate::{Result, codec};

/// A record delivered from a topic to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    /// Partitioning key; order messages are keyed by order id.
    pub key: String,
    pub payload: Vec<u8>,
    /// Position of the record in its topic log.
    pub offset: u64,
    /// 1 on first delivery, incremented on every redelivery.
    pub delivery_attempt: u32,
}

impl Message {
    /// Decodes the JSON payload.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        codec::decode(&self.payload)
    }

    pub(crate) fn redelivery(mut self) -> Self {
        self.delivery_attempt += 1;
        self
    }
}
