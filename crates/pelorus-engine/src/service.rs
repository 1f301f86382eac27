//! The data service facade.
//!
//! Owns the self-context cell, the path store, the zone evaluator, the
//! subscription registry and the throughput sampler, and runs every
//! inbound message through the synchronous pipeline: decode → store
//! mutate → zone evaluate → fan-out → stats. Messages are processed to
//! completion in arrival order; there is no internal parallelism, so two
//! updates for the same path can never interleave.

use crate::registry::{ChannelUpdate, DataChannel, SourceSelector, SubscriptionRegistry};
use crate::stats::{ThroughputSampler, ThroughputStats};
use crate::zones::{Classification, UnitConverter, ZoneEvaluator};
use pelorus_core::{
    AlarmEvent, Metadata, PathRecord, PathStore, SelfContext, Severity, ValueType, Zone,
};
use pelorus_protocol::{
    decode_delta, decode_full, parse_delta, parse_full, DecodeError, DecodedBatch, DeltaMessage,
};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

/// Buffered alarm events per lagging receiver.
const ALARM_CHANNEL_CAPACITY: usize = 64;

/// Single-threaded orchestrator of the update pipeline.
pub struct DataService {
    self_ctx: SelfContext,
    store: PathStore,
    evaluator: ZoneEvaluator,
    registry: SubscriptionRegistry,
    sampler: ThroughputSampler,
    snapshot_tx: watch::Sender<Vec<PathRecord>>,
    alarm_tx: broadcast::Sender<AlarmEvent>,
}

impl DataService {
    pub fn new(converter: Arc<dyn UnitConverter>) -> Self {
        let (snapshot_tx, _) = watch::channel(Vec::new());
        let (alarm_tx, _) = broadcast::channel(ALARM_CHANNEL_CAPACITY);
        Self {
            self_ctx: SelfContext::new(),
            store: PathStore::new(),
            evaluator: ZoneEvaluator::new(converter),
            registry: SubscriptionRegistry::new(),
            sampler: ThroughputSampler::new(),
            snapshot_tx,
            alarm_tx,
        }
    }

    /// Parse and process one raw delta message.
    pub fn handle_delta_text(&mut self, text: &str) -> Result<(), DecodeError> {
        let message = parse_delta(text)?;
        self.handle_delta(&message);
        Ok(())
    }

    /// Process an already parsed delta message.
    pub fn handle_delta(&mut self, message: &DeltaMessage) {
        if message.is_hello() {
            if let Some(id) = &message.self_id {
                if self.self_ctx.set(id.clone()) {
                    info!(self_id = %id, "self identifier announced");
                }
            }
            return;
        }
        let batch = decode_delta(message);
        self.apply_batch(batch);
    }

    /// Parse and process one raw full-tree snapshot.
    pub fn handle_full_text(&mut self, text: &str) -> Result<(), DecodeError> {
        let root = parse_full(text)?;
        self.handle_full_snapshot(&root);
        Ok(())
    }

    /// Process a full-tree snapshot.
    pub fn handle_full_snapshot(&mut self, root: &serde_json::Value) {
        let batch = decode_full(root);
        self.apply_batch(batch);
    }

    fn apply_batch(&mut self, batch: DecodedBatch) {
        if let Some(id) = &batch.self_id {
            if self.self_ctx.set(id.clone()) {
                info!(self_id = %id, "self identifier announced");
            }
        }
        if batch.is_empty() {
            return;
        }

        // Meta first, so a value arriving in the same batch already sees
        // its units during zone evaluation.
        for meta in &batch.metas {
            self.store.apply_meta_update(meta, &self.self_ctx);
        }

        for update in &batch.values {
            let key = self.store.apply_value_update(update, &self.self_ctx);
            self.evaluate_and_deliver(&key);
            self.sampler.record_update();
        }

        self.publish_snapshot();
    }

    /// Classify the freshly written value, record any alarm transition,
    /// and fan the new value+state out.
    fn evaluate_and_deliver(&mut self, key: &str) {
        let Some(record) = self.store.record(key) else {
            return;
        };

        let old_state = record.state;
        let classification = match &record.current_value {
            Some(value) => {
                let base_unit = record.meta.as_ref().and_then(|m| m.units.as_deref());
                self.evaluator.classify(key, value, base_unit)
            }
            None => Classification::default(),
        };

        if classification.severity != old_state {
            self.store.set_state(key, classification.severity);
        }
        if let Some(event) = self.evaluator.transition(key, old_state, &classification) {
            debug!(path = key, action = ?event.action, severity = ?event.severity, "alarm transition");
            // Nobody listening is fine
            let _ = self.alarm_tx.send(event);
        }

        if let Some(record) = self.store.record(key) {
            self.registry.fan_out(record);
        }
    }

    /// Register a consumer for a path, seeding the returned channel with
    /// the path's current value and state if the path is already known.
    ///
    /// `source` is the literal `"default"` or a concrete source id.
    /// Idempotent per `(consumer_id, path)`.
    pub fn subscribe(&mut self, consumer_id: &str, path: &str, source: &str) -> Arc<DataChannel> {
        let selector = SourceSelector::from(source);
        let seed = match self.store.record(path) {
            Some(record) => ChannelUpdate {
                value: match &selector {
                    SourceSelector::Default => record.current_value.clone(),
                    SourceSelector::Source(s) => {
                        record.sources.get(s).map(|reading| reading.value.clone())
                    }
                },
                state: record.state,
            },
            None => ChannelUpdate::default(),
        };
        self.registry.subscribe(consumer_id, path, selector, seed)
    }

    /// Remove a registration. Unknown consumer or path is a silent no-op.
    pub fn unsubscribe(&mut self, consumer_id: &str, path: &str) {
        self.registry.unsubscribe(consumer_id, path);
    }

    /// Relay an external watchdog's staleness verdict to a path's
    /// consumers. The store keeps its last known value.
    pub fn notify_stale(&self, path: &str) {
        self.registry.notify_timeout(path);
    }

    /// Replace the zone configuration.
    pub fn set_zones(&mut self, zones: Vec<Zone>) {
        self.evaluator.set_zones(zones);
    }

    /// Full connection reset.
    ///
    /// Clears the store, the self identifier, the alarm states and the
    /// throughput windows in one synchronous step, so no observer can
    /// see a half-reset state. Active alarms get a cleared event first,
    /// and every registration receives a null/normal notice.
    pub fn reset(&mut self) {
        for path in self.store.active_alarm_paths() {
            if let Some(record) = self.store.record(&path) {
                if let Some(event) =
                    self.evaluator
                        .transition(&path, record.state, &Classification::default())
                {
                    let _ = self.alarm_tx.send(event);
                }
            }
        }

        self.store.clear();
        self.self_ctx.clear();
        self.registry.notify_reset();
        self.sampler.reset();
        self.publish_snapshot();
        info!("data service reset");
    }

    /// Advance the throughput sampler's clock by one second.
    pub fn tick_second(&mut self) {
        self.sampler.tick_second();
    }

    fn publish_snapshot(&self) {
        self.snapshot_tx.send_replace(self.store.records());
    }

    /// Bulk stream of full store snapshots, sorted by path, refreshed
    /// after every processed batch.
    pub fn snapshot_stream(&self) -> watch::Receiver<Vec<PathRecord>> {
        self.snapshot_tx.subscribe()
    }

    /// Receiver of alarm lifecycle events.
    pub fn alarm_events(&self) -> broadcast::Receiver<AlarmEvent> {
        self.alarm_tx.subscribe()
    }

    /// Receiver of throughput window snapshots.
    pub fn stats_stream(&self) -> watch::Receiver<ThroughputStats> {
        self.sampler.stats_stream()
    }

    /// Deep copy of one record, if the path is known.
    pub fn get_path(&self, path: &str) -> Option<PathRecord> {
        self.store.get_path(path)
    }

    /// Known paths of one inferred value type.
    pub fn paths_by_type(&self, value_type: ValueType, self_only: bool) -> Vec<String> {
        self.store.get_paths_by_type(value_type, self_only)
    }

    /// Known paths of one type, with their metadata.
    pub fn paths_and_meta(
        &self,
        value_type: ValueType,
        self_only: bool,
    ) -> Vec<(String, Option<Metadata>)> {
        self.store.get_paths_and_meta(value_type, self_only)
    }

    /// The announced self identifier, if any.
    pub fn self_id(&self) -> Option<String> {
        self.self_ctx.id().map(str::to_string)
    }

    /// Number of known paths.
    pub fn path_count(&self) -> usize {
        self.store.len()
    }
}
