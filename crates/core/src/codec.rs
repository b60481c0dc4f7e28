//! JSON codec for documents
//!
//! The same encoding is used for the file on disk and for in-memory copies,
//! so a value that can be persisted can always be copied and vice versa.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

/// Serialize a document to JSON bytes.
pub fn encode<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<Vec<u8>> {
    if pretty {
        serde_json::to_vec_pretty(value).map_err(Error::Encode)
    } else {
        serde_json::to_vec(value).map_err(Error::Encode)
    }
}

/// Deserialize a document from JSON bytes.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(Error::Decode)
}

/// Produce a structurally independent copy of `value`.
///
/// The value is encoded and decoded into a freshly allocated `T`, so no
/// container (list, map, nested record) is shared between the input and
/// the output. Types that do not survive the round trip fail here.
pub fn deep_copy<T>(value: &T) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let bytes = encode(value, false)?;
    decode(&bytes)
}
