//! The canonical path store.
//!
//! One mutable record per canonical path string; the single source of
//! truth for "what do we currently know about this path". Records are
//! created lazily on the first value or meta update, mutated in place,
//! and only cleared wholesale on a full connection reset.

use crate::model::{Metadata, PathMetaUpdate, PathRecord, PathValueUpdate, Severity, ValueType};
use crate::path::{canonical_path, is_self_path, SelfContext};
use std::collections::HashMap;

/// In-memory store of per-path records keyed by canonical path.
#[derive(Debug, Clone, Default)]
pub struct PathStore {
    records: HashMap<String, PathRecord>,
}

impl PathStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a normalized value update, creating the record if absent.
    ///
    /// The most recently processed update for any source becomes the new
    /// current value; there is no source-priority arbitration. Returns
    /// the canonical path the update landed on.
    pub fn apply_value_update(
        &mut self,
        update: &PathValueUpdate,
        self_ctx: &SelfContext,
    ) -> String {
        let key = canonical_path(update.context.as_deref(), &update.path, self_ctx);

        let record = self
            .records
            .entry(key.clone())
            .or_insert_with(|| PathRecord::new(key.clone()));

        // First non-null value fixes the type for the life of the record.
        if record.value_type.is_none() {
            record.value_type = update.value.inferred_type();
        }

        record.current_value = Some(update.value.clone());
        record.default_source = Some(update.source.clone());
        record.sources.insert(
            update.source.clone(),
            crate::model::SourceReading {
                timestamp: update.timestamp,
                value: update.value.clone(),
            },
        );

        key
    }

    /// Apply a metadata update, creating an empty record if needed.
    ///
    /// Meta may arrive before any value; the record then exists with a
    /// null current value and no sources.
    pub fn apply_meta_update(&mut self, update: &PathMetaUpdate, self_ctx: &SelfContext) -> String {
        let key = canonical_path(update.context.as_deref(), &update.path, self_ctx);

        let record = self
            .records
            .entry(key.clone())
            .or_insert_with(|| PathRecord::new(key.clone()));

        match &mut record.meta {
            Some(existing) => existing.merge(update.meta.clone()),
            None => record.meta = Some(update.meta.clone()),
        }

        key
    }

    /// Deep copy of a record; callers cannot mutate the store through it.
    pub fn get_path(&self, path: &str) -> Option<PathRecord> {
        self.records.get(path).cloned()
    }

    /// Borrow a record, for the engine's own hot path.
    pub fn record(&self, path: &str) -> Option<&PathRecord> {
        self.records.get(path)
    }

    /// Overwrite a record's zone classification.
    ///
    /// No-op for unknown paths.
    pub fn set_state(&mut self, path: &str, state: Severity) {
        if let Some(record) = self.records.get_mut(path) {
            record.state = state;
        }
    }

    /// Paths whose inferred type matches, optionally restricted to the
    /// local vessel.
    pub fn get_paths_by_type(&self, value_type: ValueType, self_only: bool) -> Vec<String> {
        let mut paths: Vec<String> = self
            .records
            .values()
            .filter(|r| r.value_type == Some(value_type))
            .filter(|r| !self_only || is_self_path(&r.path))
            .map(|r| r.path.clone())
            .collect();
        paths.sort();
        paths
    }

    /// Like [`get_paths_by_type`](Self::get_paths_by_type) but paired
    /// with each path's metadata.
    pub fn get_paths_and_meta(
        &self,
        value_type: ValueType,
        self_only: bool,
    ) -> Vec<(String, Option<Metadata>)> {
        let mut entries: Vec<(String, Option<Metadata>)> = self
            .records
            .values()
            .filter(|r| r.value_type == Some(value_type))
            .filter(|r| !self_only || is_self_path(&r.path))
            .map(|r| (r.path.clone(), r.meta.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Full snapshot of every record, sorted by path, for bulk consumers
    /// such as a path-browser UI.
    pub fn records(&self) -> Vec<PathRecord> {
        let mut all: Vec<PathRecord> = self.records.values().cloned().collect();
        all.sort_by(|a, b| a.path.cmp(&b.path));
        all
    }

    /// Paths whose state is currently not normal.
    pub fn active_alarm_paths(&self) -> Vec<String> {
        self.records
            .values()
            .filter(|r| r.state != Severity::Normal)
            .map(|r| r.path.clone())
            .collect()
    }

    /// Drop every record, as part of a full connection reset.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PrimitiveValue;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn update(path: &str, source: &str, value: PrimitiveValue) -> PathValueUpdate {
        PathValueUpdate {
            path: path.to_string(),
            context: None,
            source: source.to_string(),
            timestamp: Utc::now(),
            value,
        }
    }

    #[test]
    fn test_create_on_first_value() {
        let mut store = PathStore::new();
        let ctx = SelfContext::new();

        let key = store.apply_value_update(
            &update(
                "navigation.speedOverGround",
                "gps1",
                PrimitiveValue::Number(3.85),
            ),
            &ctx,
        );

        assert_eq!(key, "self.navigation.speedOverGround");
        let record = store.get_path(&key).unwrap();
        assert_eq!(record.current_value, Some(PrimitiveValue::Number(3.85)));
        assert_eq!(record.default_source.as_deref(), Some("gps1"));
        assert_eq!(record.value_type, Some(ValueType::Number));
        assert_eq!(record.sources.len(), 1);
    }

    #[test]
    fn test_last_write_wins_across_sources() {
        let mut store = PathStore::new();
        let ctx = SelfContext::new();

        store.apply_value_update(
            &update(
                "navigation.speedOverGround",
                "gps1",
                PrimitiveValue::Number(10.0),
            ),
            &ctx,
        );
        store.apply_value_update(
            &update(
                "navigation.speedOverGround",
                "gps2",
                PrimitiveValue::Number(12.0),
            ),
            &ctx,
        );

        let record = store.get_path("self.navigation.speedOverGround").unwrap();
        assert_eq!(record.current_value, Some(PrimitiveValue::Number(12.0)));
        assert_eq!(record.default_source.as_deref(), Some("gps2"));
        // Both sources are retained independently
        assert_eq!(
            record.sources.get("gps1").unwrap().value,
            PrimitiveValue::Number(10.0)
        );
        assert_eq!(
            record.sources.get("gps2").unwrap().value,
            PrimitiveValue::Number(12.0)
        );
    }

    #[test]
    fn test_meta_before_value() {
        let mut store = PathStore::new();
        let ctx = SelfContext::new();

        let key = store.apply_meta_update(
            &PathMetaUpdate {
                path: "environment.wind.speedApparent".to_string(),
                context: None,
                meta: Metadata {
                    units: Some("m/s".to_string()),
                    ..Default::default()
                },
            },
            &ctx,
        );

        let record = store.get_path(&key).unwrap();
        assert_eq!(record.current_value, None);
        assert!(record.sources.is_empty());
        assert_eq!(record.value_type, None);
        assert_eq!(
            record.meta.as_ref().unwrap().units.as_deref(),
            Some("m/s")
        );
    }

    #[test]
    fn test_meta_merges_into_existing() {
        let mut store = PathStore::new();
        let ctx = SelfContext::new();

        store.apply_meta_update(
            &PathMetaUpdate {
                path: "p".to_string(),
                context: None,
                meta: Metadata {
                    units: Some("K".to_string()),
                    description: Some("Temperature".to_string()),
                    ..Default::default()
                },
            },
            &ctx,
        );
        store.apply_meta_update(
            &PathMetaUpdate {
                path: "p".to_string(),
                context: None,
                meta: Metadata {
                    display_name: Some("Temp".to_string()),
                    ..Default::default()
                },
            },
            &ctx,
        );

        let meta = store.get_path("self.p").unwrap().meta.unwrap();
        assert_eq!(meta.units.as_deref(), Some("K"));
        assert_eq!(meta.description.as_deref(), Some("Temperature"));
        assert_eq!(meta.display_name.as_deref(), Some("Temp"));
    }

    #[test]
    fn test_value_type_frozen_after_first_value() {
        let mut store = PathStore::new();
        let ctx = SelfContext::new();

        store.apply_value_update(&update("p", "s", PrimitiveValue::Number(1.0)), &ctx);
        store.apply_value_update(
            &update("p", "s", PrimitiveValue::Text("oops".to_string())),
            &ctx,
        );

        let record = store.get_path("self.p").unwrap();
        // The value updates, the inferred type does not
        assert_eq!(
            record.current_value,
            Some(PrimitiveValue::Text("oops".to_string()))
        );
        assert_eq!(record.value_type, Some(ValueType::Number));
    }

    #[test]
    fn test_null_first_value_defers_type_inference() {
        let mut store = PathStore::new();
        let ctx = SelfContext::new();

        store.apply_value_update(&update("p", "s", PrimitiveValue::Null), &ctx);
        assert_eq!(store.get_path("self.p").unwrap().value_type, None);

        store.apply_value_update(&update("p", "s", PrimitiveValue::Bool(true)), &ctx);
        assert_eq!(
            store.get_path("self.p").unwrap().value_type,
            Some(ValueType::Bool)
        );
    }

    #[test]
    fn test_get_path_returns_deep_copy() {
        let mut store = PathStore::new();
        let ctx = SelfContext::new();

        store.apply_value_update(&update("p", "s", PrimitiveValue::Number(1.0)), &ctx);

        let mut copy = store.get_path("self.p").unwrap();
        copy.current_value = Some(PrimitiveValue::Number(999.0));
        copy.sources.clear();

        let record = store.get_path("self.p").unwrap();
        assert_eq!(record.current_value, Some(PrimitiveValue::Number(1.0)));
        assert_eq!(record.sources.len(), 1);
    }

    #[test]
    fn test_unknown_path_lookups_never_fail() {
        let store = PathStore::new();
        assert!(store.get_path("nonexistent").is_none());
        assert!(store.get_paths_by_type(ValueType::Number, false).is_empty());
    }

    #[test]
    fn test_paths_by_type_with_self_filter() {
        let mut store = PathStore::new();
        let mut ctx = SelfContext::new();
        ctx.set("vessels.urn:abc");

        store.apply_value_update(&update("a.speed", "s", PrimitiveValue::Number(1.0)), &ctx);
        store.apply_value_update(
            &PathValueUpdate {
                path: "a.speed".to_string(),
                context: Some("vessels.urn:other".to_string()),
                source: "ais".to_string(),
                timestamp: Utc::now(),
                value: PrimitiveValue::Number(2.0),
            },
            &ctx,
        );
        store.apply_value_update(
            &update("a.name", "s", PrimitiveValue::Text("Pelorus".to_string())),
            &ctx,
        );

        assert_eq!(
            store.get_paths_by_type(ValueType::Number, true),
            vec!["self.a.speed".to_string()]
        );
        assert_eq!(
            store.get_paths_by_type(ValueType::Number, false),
            vec![
                "self.a.speed".to_string(),
                "vessels.urn:other.a.speed".to_string()
            ]
        );
    }

    #[test]
    fn test_foreign_context_canonicalization() {
        let mut store = PathStore::new();
        let mut ctx = SelfContext::new();
        ctx.set("vessels.urn:abc");

        let key = store.apply_value_update(
            &PathValueUpdate {
                path: "navigation.speedOverGround".to_string(),
                context: Some("vessels.urn:abc".to_string()),
                source: "gps".to_string(),
                timestamp: Utc::now(),
                value: PrimitiveValue::Number(3.0),
            },
            &ctx,
        );
        assert_eq!(key, "self.navigation.speedOverGround");

        let key = store.apply_value_update(
            &PathValueUpdate {
                path: "navigation.speedOverGround".to_string(),
                context: Some("vessels.urn:target".to_string()),
                source: "ais".to_string(),
                timestamp: Utc::now(),
                value: PrimitiveValue::Number(5.0),
            },
            &ctx,
        );
        assert_eq!(key, "vessels.urn:target.navigation.speedOverGround");
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut store = PathStore::new();
        let ctx = SelfContext::new();

        store.apply_value_update(&update("p", "s", PrimitiveValue::Number(1.0)), &ctx);
        store.set_state("self.p", Severity::Alarm);
        assert_eq!(store.active_alarm_paths(), vec!["self.p".to_string()]);

        store.clear();
        assert!(store.is_empty());
        assert!(store.active_alarm_paths().is_empty());
    }
}
