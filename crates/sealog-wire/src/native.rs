//! The native stream encoding.
//!
//! A compact binary serialization of the serde derives on the message and
//! record types. This is the default wire format — anything that is not
//! explicitly protobuf on the wire is this.

use serde::de::DeserializeOwned;
use serde::Serialize;

use sealog_types::{Error, Result};

/// File extension used for natively encoded messages in the folder
/// transport layout.
pub const NATIVE_EXT: &str = "bin";

/// Encode a message in the native stream encoding.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| Error::Decode {
        reason: format!("native encode: {e}"),
    })
}

/// Decode a message from the native stream encoding.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| Error::Decode {
        reason: format!("native decode: {e}"),
    })
}
