//! Full-tree snapshot decoder.
//!
//! The server periodically publishes one large nested object holding the
//! entire known state. This decoder walks it recursively and emits the
//! same normalized updates as the delta decoder:
//!
//! - a node containing a `timestamp` key is a value node: its `value` is
//!   decomposed exactly like a delta value, and an attached `meta`
//!   object is propagated to each resulting leaf;
//! - a bare primitive is a valueless/sourceless leaf, timestamped "now"
//!   with the `"noSource"` sentinel;
//! - anything else is a branch to recurse into, except a child literally
//!   named `sources`, which is internal bookkeeping and never data.
//!
//! The snapshot's top-level `self` field resets the self identifier.

use crate::delta::{flatten_value, parse_timestamp, DecodedBatch};
use chrono::{DateTime, Utc};
use pelorus_core::{Metadata, PathMetaUpdate, PathValueUpdate, PrimitiveValue};
use serde_json::Value;
use tracing::debug;

/// Sentinel source for leaves that carry no source information.
pub const NO_SOURCE: &str = "noSource";

/// Top-level snapshot keys that are not entity groups.
const ROOT_BOOKKEEPING: &[&str] = &["self", "version", "sources"];

/// Decode a full-tree snapshot.
pub fn decode_full(root: &Value) -> DecodedBatch {
    let mut batch = DecodedBatch::default();

    let Some(map) = root.as_object() else {
        debug!("full snapshot root is not an object");
        return batch;
    };

    batch.self_id = map.get("self").and_then(Value::as_str).map(str::to_string);

    let now = Utc::now();
    for (group, entities) in map {
        if ROOT_BOOKKEEPING.contains(&group.as_str()) {
            continue;
        }
        let Some(entities) = entities.as_object() else {
            continue;
        };
        // e.g. vessels.urn:mrn:signalk:uuid:... becomes the context
        for (entity, node) in entities {
            let context = format!("{group}.{entity}");
            walk(node, "", &context, now, &mut batch);
        }
    }

    batch
}

fn walk(node: &Value, path: &str, context: &str, now: DateTime<Utc>, batch: &mut DecodedBatch) {
    match node {
        Value::Object(map) => {
            if map.contains_key("timestamp") {
                decode_value_node(map, path, context, batch);
                return;
            }
            for (key, child) in map {
                // Internal bookkeeping subtree, never data
                if key == "sources" {
                    continue;
                }
                walk(child, &join(path, key), context, now, batch);
            }
        }
        Value::Array(_) => debug!(path, "skipping array node in snapshot"),
        _ => {
            if path.is_empty() {
                return;
            }
            if let Some(primitive) = PrimitiveValue::from_json(node) {
                batch.values.push(PathValueUpdate {
                    path: path.to_string(),
                    context: Some(context.to_string()),
                    source: NO_SOURCE.to_string(),
                    timestamp: now,
                    value: primitive,
                });
            }
        }
    }
}

/// Decode a `{timestamp, value, $source?, meta?}` node.
fn decode_value_node(
    map: &serde_json::Map<String, Value>,
    path: &str,
    context: &str,
    batch: &mut DecodedBatch,
) {
    let timestamp = parse_timestamp(map.get("timestamp").and_then(Value::as_str));
    let source = node_source(map);
    let meta = map.get("meta");

    match map.get("value") {
        Some(Value::Object(children)) => {
            // Compound value: one leaf per key, each with matching meta.
            for (key, child) in children {
                let leaf = join(path, key);
                flatten_value(
                    &leaf,
                    Some(context),
                    &source,
                    timestamp,
                    child,
                    &mut batch.values,
                );
                if let Some(meta) = meta.and_then(|m| leaf_meta(m, key)) {
                    batch.metas.push(PathMetaUpdate {
                        path: leaf,
                        context: Some(context.to_string()),
                        meta,
                    });
                }
            }
        }
        Some(value) => {
            flatten_value(
                path,
                Some(context),
                &source,
                timestamp,
                value,
                &mut batch.values,
            );
            if let Some(meta) = meta.and_then(parse_meta) {
                batch.metas.push(PathMetaUpdate {
                    path: path.to_string(),
                    context: Some(context.to_string()),
                    meta,
                });
            }
        }
        None => {
            // Meta-only node; the record will exist without a value.
            if let Some(meta) = meta.and_then(parse_meta) {
                batch.metas.push(PathMetaUpdate {
                    path: path.to_string(),
                    context: Some(context.to_string()),
                    meta,
                });
            }
        }
    }
}

/// Source for a value node: `$source` tag, `source` string or
/// descriptor label, else the sentinel.
fn node_source(map: &serde_json::Map<String, Value>) -> String {
    if let Some(tag) = map.get("$source").and_then(Value::as_str) {
        return tag.to_string();
    }
    match map.get("source") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(src)) => src
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or(NO_SOURCE)
            .to_string(),
        _ => NO_SOURCE.to_string(),
    }
}

/// Meta for one leaf of a compound value.
///
/// If the meta object is itself keyed per sub-property, the leaf gets
/// its own matching entry, or nothing when it has no entry; otherwise
/// all leaves share the parent meta.
fn leaf_meta(meta: &Value, key: &str) -> Option<Metadata> {
    let map = meta.as_object()?;
    if let Some(sub) = map.get(key) {
        if sub.is_object() {
            return parse_meta(sub);
        }
    }
    if map.values().any(Value::is_object) {
        // Keyed form without an entry for this leaf
        return None;
    }
    parse_meta(meta)
}

fn parse_meta(meta: &Value) -> Option<Metadata> {
    if !meta.is_object() {
        return None;
    }
    serde_json::from_value(meta.clone()).ok()
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}
