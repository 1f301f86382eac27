//! Instrument data model types.
//!
//! These types form the canonical representation the rest of the engine
//! works with:
//! - Primitive values and their inferred types
//! - Per-path records with multi-source tracking
//! - Zone configuration and alarm severities
//! - Normalized update messages produced by the wire decoders

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Zone classification severities, in order of increasing urgency.
///
/// The derived `Ord` drives "highest severity wins" when a value sits in
/// several zones at once.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Normal,
    Alert,
    Warn,
    Alarm,
    Emergency,
}

impl Severity {
    /// Notification method hints for an alarm at this severity.
    ///
    /// Alert and warn are visual only; alarm and emergency also sound.
    pub fn methods(self) -> Vec<AlertMethod> {
        match self {
            Severity::Normal => Vec::new(),
            Severity::Alert | Severity::Warn => vec![AlertMethod::Visual],
            Severity::Alarm | Severity::Emergency => {
                vec![AlertMethod::Visual, AlertMethod::Sound]
            }
        }
    }
}

/// How an alarm should be presented to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertMethod {
    Visual,
    Sound,
}

/// The value type of a path, inferred from its first non-null value and
/// frozen thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Number,
    #[serde(rename = "string")]
    Text,
    #[serde(rename = "boolean")]
    Bool,
    Date,
}

/// A single decoded leaf value.
///
/// Compound JSON objects are decomposed into one `PrimitiveValue` per
/// leaf at the decoder boundary; nothing downstream of the decoders ever
/// sees a nested value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimitiveValue {
    Number(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl PrimitiveValue {
    /// Convert a JSON value into a primitive, if it is one.
    ///
    /// Objects and arrays are not primitives and yield `None`; the caller
    /// decides whether to decompose (objects) or skip (arrays).
    pub fn from_json(value: &serde_json::Value) -> Option<PrimitiveValue> {
        match value {
            serde_json::Value::Number(n) => n.as_f64().map(PrimitiveValue::Number),
            serde_json::Value::String(s) => Some(PrimitiveValue::Text(s.clone())),
            serde_json::Value::Bool(b) => Some(PrimitiveValue::Bool(*b)),
            serde_json::Value::Null => Some(PrimitiveValue::Null),
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => None,
        }
    }

    /// Numeric view of the value, for zone evaluation.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PrimitiveValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Infer the value type carried by this primitive.
    ///
    /// Null carries no type information. A string in strict RFC3339 form
    /// types as `date` rather than `string`.
    pub fn inferred_type(&self) -> Option<ValueType> {
        match self {
            PrimitiveValue::Number(_) => Some(ValueType::Number),
            PrimitiveValue::Bool(_) => Some(ValueType::Bool),
            PrimitiveValue::Text(s) => {
                if DateTime::parse_from_rfc3339(s).is_ok() {
                    Some(ValueType::Date)
                } else {
                    Some(ValueType::Text)
                }
            }
            PrimitiveValue::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PrimitiveValue::Null)
    }
}

/// The latest reading reported by one physical source for one path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReading {
    /// When the source reported this value.
    pub timestamp: DateTime<Utc>,

    /// The reported value.
    pub value: PrimitiveValue,
}

/// Everything currently known about one canonical path.
///
/// Records are created lazily on the first value or meta update and
/// mutated in place for the life of the process; they are only cleared
/// wholesale on a full connection reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathRecord {
    /// Canonical path, context-prefixed (e.g. `self.navigation.speedOverGround`).
    pub path: String,

    /// The value consumers see for `source = 'default'`.
    ///
    /// Last-write-wins across all sources; `default_source` names the
    /// source that supplied it.
    pub current_value: Option<PrimitiveValue>,

    /// The source that last wrote `current_value`.
    pub default_source: Option<String>,

    /// Latest reading per source id.
    pub sources: HashMap<String, SourceReading>,

    /// Inferred from the first non-null value; immutable once set.
    pub value_type: Option<ValueType>,

    /// Descriptive metadata, which may arrive before or after values.
    pub meta: Option<Metadata>,

    /// Current zone classification.
    pub state: Severity,
}

impl PathRecord {
    /// Create an empty record for a path that has just been seen.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            current_value: None,
            default_source: None,
            sources: HashMap::new(),
            value_type: None,
            meta: None,
            state: Severity::Normal,
        }
    }
}

/// Descriptive metadata for a path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Display name for gauges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Short name for compact displays.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,

    /// SI unit string (e.g. "m/s", "rad", "K").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,

    /// Seconds after which data on this path is considered stale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
}

impl Metadata {
    /// Merge another metadata update into this one, field by field.
    ///
    /// Fields present in `other` win; absent fields keep their value.
    pub fn merge(&mut self, other: Metadata) {
        if other.description.is_some() {
            self.description = other.description;
        }
        if other.display_name.is_some() {
            self.display_name = other.display_name;
        }
        if other.short_name.is_some() {
            self.short_name = other.short_name;
        }
        if other.units.is_some() {
            self.units = other.units;
        }
        if other.timeout.is_some() {
            self.timeout = other.timeout;
        }
    }
}

/// A configured alarm zone for one path.
///
/// Zones are externally supplied configuration and read-only to the
/// engine. Absent bounds are unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    /// The canonical path this zone applies to (no wildcards).
    pub path: String,

    /// The unit the bounds are declared in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Lower bound, inclusive. Absent means unbounded below.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower: Option<f64>,

    /// Upper bound, inclusive. Absent means unbounded above.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,

    /// Severity while the value sits in this zone.
    pub severity: Severity,

    /// Message attached to alarms raised by this zone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Zone {
    /// Whether a converted value falls inside this zone's bounds.
    pub fn contains(&self, value: f64) -> bool {
        self.lower.map_or(true, |lo| value >= lo) && self.upper.map_or(true, |hi| value <= hi)
    }
}

/// A normalized value update, produced by both wire decoders.
#[derive(Debug, Clone, PartialEq)]
pub struct PathValueUpdate {
    /// Path relative to its context (e.g. `navigation.speedOverGround`).
    pub path: String,

    /// Vessel/entity context; `None` means the local vessel.
    pub context: Option<String>,

    /// Resolved source identifier.
    pub source: String,

    /// When the value was measured.
    pub timestamp: DateTime<Utc>,

    /// The decoded leaf value.
    pub value: PrimitiveValue,
}

/// A normalized metadata update.
#[derive(Debug, Clone, PartialEq)]
pub struct PathMetaUpdate {
    pub path: String,
    pub context: Option<String>,
    pub meta: Metadata,
}

/// Alarm lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmAction {
    /// A path left the normal state.
    Raised,
    /// An active alarm changed severity without clearing.
    Updated,
    /// A path returned to the normal state.
    Cleared,
}

/// An edge-triggered alarm event, consumed by a notification collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmEvent {
    pub path: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub action: AlarmAction,
    pub methods: Vec<AlertMethod>,
}
