//! Message parsing for the transport boundary.
//!
//! The transport hands the engine raw JSON text; these helpers parse it
//! into wire types. Decoding errors cover whole malformed messages only;
//! malformed individual leaves are skipped inside the decoders without
//! failing the message.

use crate::messages::DeltaMessage;
use thiserror::Error;

/// Errors that can occur when parsing an inbound message.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// JSON deserialization failed.
    #[error("Failed to parse message: {0}")]
    ParseError(#[from] serde_json::Error),

    /// A full snapshot must be a JSON object.
    #[error("Expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Parse a delta message from JSON text.
pub fn parse_delta(text: &str) -> Result<DeltaMessage, DecodeError> {
    serde_json::from_str(text).map_err(DecodeError::from)
}

/// Parse a full-tree snapshot from JSON text.
pub fn parse_full(text: &str) -> Result<serde_json::Value, DecodeError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(DecodeError::NotAnObject(json_kind(&value)));
    }
    Ok(value)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Quick check whether a message looks like a delta (has updates).
///
/// Useful for message routing without full parsing.
pub fn is_delta_message(text: &str) -> bool {
    text.contains("\"updates\"")
}

/// Quick check whether a message looks like a server hello.
pub fn is_hello_message(text: &str) -> bool {
    text.contains("\"self\"") && !text.contains("\"updates\"")
}
