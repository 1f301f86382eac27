//! Wire message types for the delta stream.
//!
//! The server pushes incremental "delta" messages: a context plus a list
//! of updates, each carrying a source descriptor, a timestamp, and
//! path/value pairs. A message carrying only a `self` identifier is a
//! server hello, not a data update.
//!
//! Messages are JSON over the transport collaborator; field names follow
//! the protocol's casing (`$source`, `requestId`).

use pelorus_core::Metadata;
use serde::{Deserialize, Serialize};

/// A delta message as received from the transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeltaMessage {
    /// The context path (e.g. "vessels.urn:mrn:signalk:uuid:...").
    /// Absent means the local vessel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Self identifier, present on the server hello.
    #[serde(rename = "self", skip_serializing_if = "Option::is_none")]
    pub self_id: Option<String>,

    /// The updates in this delta. Absent on a hello.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updates: Option<Vec<DeltaUpdate>>,

    /// Correlation id for request/response exchanges; ignored by the
    /// data path.
    #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl DeltaMessage {
    /// A hello/self-announcement carries a self id and no updates.
    pub fn is_hello(&self) -> bool {
        self.self_id.is_some() && self.updates.as_ref().map_or(true, |u| u.is_empty())
    }
}

/// A single update within a delta: values from one source at one time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeltaUpdate {
    /// Reference to a registered source (e.g. "nmea0183.GP").
    #[serde(rename = "$source", skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,

    /// Embedded source descriptor (alternative to `$source`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<WireSource>,

    /// ISO 8601 timestamp (UTC).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// The path/value pairs in this update.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<WirePathValue>,

    /// Metadata updates, separate from values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Vec<WirePathMeta>>,
}

/// Source descriptor on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireSource {
    /// Label identifying the source bus (e.g. "N2K-1", "serial-COM1").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Bus type (e.g. "NMEA2000", "NMEA0183").
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,

    /// NMEA 2000 source address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,

    /// NMEA 0183 talker ID (e.g. "GP", "II").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub talker: Option<String>,
}

/// A single path/value pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirePathValue {
    pub path: String,
    pub value: serde_json::Value,
}

/// A single path/meta pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirePathMeta {
    pub path: String,
    pub value: Metadata,
}
