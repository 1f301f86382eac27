//! Delta stream decoder.
//!
//! Turns a wire [`DeltaMessage`] into normalized [`PathValueUpdate`]s and
//! [`PathMetaUpdate`]s. The decoder is stateless: the self identifier it
//! may extract from a hello is returned to the caller, never stored.
//!
//! Compound values (nested JSON objects) are decomposed here into one
//! update per leaf; nothing downstream sees a nested value.

use crate::messages::{DeltaMessage, DeltaUpdate};
use chrono::{DateTime, Utc};
use pelorus_core::{PathMetaUpdate, PathValueUpdate, PrimitiveValue};
use tracing::debug;

/// Fallback source identifier when an update names no source at all.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// The normalized output of either wire decoder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedBatch {
    /// Self identifier announced by the message, if any.
    pub self_id: Option<String>,

    /// Normalized leaf value updates, in wire order.
    pub values: Vec<PathValueUpdate>,

    /// Normalized metadata updates, in wire order.
    pub metas: Vec<PathMetaUpdate>,
}

impl DecodedBatch {
    pub fn is_empty(&self) -> bool {
        self.self_id.is_none() && self.values.is_empty() && self.metas.is_empty()
    }
}

/// Decode a delta message.
///
/// A hello (self id, no updates) yields only `self_id` and no path
/// updates. Malformed leaves are skipped without aborting their
/// siblings.
pub fn decode_delta(msg: &DeltaMessage) -> DecodedBatch {
    let mut batch = DecodedBatch {
        self_id: msg.self_id.clone(),
        ..Default::default()
    };

    let Some(updates) = &msg.updates else {
        return batch;
    };

    for update in updates {
        let source = source_id(update);
        let timestamp = parse_timestamp(update.timestamp.as_deref());

        for pv in &update.values {
            flatten_value(
                &pv.path,
                msg.context.as_deref(),
                &source,
                timestamp,
                &pv.value,
                &mut batch.values,
            );
        }

        if let Some(metas) = &update.meta {
            for pm in metas {
                batch.metas.push(PathMetaUpdate {
                    path: pm.path.clone(),
                    context: msg.context.clone(),
                    meta: pm.value.clone(),
                });
            }
        }
    }

    batch
}

/// Resolve a human-readable source identifier for one update.
///
/// Precedence: NMEA2000 `label.src`, NMEA0183 `label.talker`, the raw
/// `$source` tag, the label alone, then the literal `"unknown"`.
pub fn source_id(update: &DeltaUpdate) -> String {
    if let Some(source) = &update.source {
        if let Some(label) = source.label.as_deref() {
            match source.source_type.as_deref() {
                Some("NMEA2000") => {
                    if let Some(src) = source.src.as_deref() {
                        return format!("{label}.{src}");
                    }
                }
                Some("NMEA0183") => {
                    if let Some(talker) = source.talker.as_deref() {
                        return format!("{label}.{talker}");
                    }
                }
                _ => {}
            }
        }
    }

    if let Some(source_ref) = update.source_ref.as_deref() {
        return source_ref.to_string();
    }

    if let Some(label) = update.source.as_ref().and_then(|s| s.label.as_deref()) {
        return label.to_string();
    }

    UNKNOWN_SOURCE.to_string()
}

/// Decompose a wire value into normalized leaf updates.
///
/// Objects recurse with `parent.key` paths; primitives emit a single
/// update; anything else (arrays) is skipped for that leaf only.
pub(crate) fn flatten_value(
    path: &str,
    context: Option<&str>,
    source: &str,
    timestamp: DateTime<Utc>,
    value: &serde_json::Value,
    out: &mut Vec<PathValueUpdate>,
) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                flatten_value(
                    &format!("{path}.{key}"),
                    context,
                    source,
                    timestamp,
                    child,
                    out,
                );
            }
        }
        _ => match PrimitiveValue::from_json(value) {
            Some(primitive) => out.push(PathValueUpdate {
                path: path.to_string(),
                context: context.map(str::to_string),
                source: source.to_string(),
                timestamp,
                value: primitive,
            }),
            None => debug!(path, "skipping non-primitive leaf value"),
        },
    }
}

/// Parse a wire timestamp, falling back to now.
pub(crate) fn parse_timestamp(timestamp: Option<&str>) -> DateTime<Utc> {
    timestamp
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}
