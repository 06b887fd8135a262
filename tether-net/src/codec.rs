//! JSON codec for wire messages
//!
//! Encodes call envelopes, replies and update batches as JSON byte frames.
//! Reply frames use the tagged `{status: ok|error}` envelope; an error-tagged
//! reply decodes into a failure carrying the remote description, never into
//! a value.

use crate::error::NetError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tether_model::Reply;

/// Encode a wire message to a JSON byte frame.
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, NetError> {
    Ok(serde_json::to_vec(msg)?)
}

/// Decode a JSON byte frame into a wire message.
pub fn decode<T: DeserializeOwned>(frame: &[u8]) -> Result<T, NetError> {
    Ok(serde_json::from_slice(frame)?)
}

/// Decode a reply frame, surfacing error-tagged replies as `NetError::Remote`.
pub fn decode_reply(frame: &[u8]) -> Result<Value, NetError> {
    match decode::<Reply>(frame)? {
        Reply::Ok { value } => Ok(value),
        Reply::Error { error } => Err(NetError::Remote(error)),
    }
}
