//! Subscription registry and fan-out.
//!
//! Widgets register for one path/source combination and get back a push
//! channel of `{value, state}`. Registrations are plain in-memory
//! records with no timeout: a widget that never unsubscribes keeps
//! receiving updates, so teardown discipline is a caller obligation.
//!
//! Channels are `tokio::sync::watch`-backed: each holds the latest
//! value, new receivers see it immediately, and a single update never
//! produces duplicate deliveries.

use pelorus_core::{PathRecord, PrimitiveValue, Severity};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// What a registered consumer receives on every delivery.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelUpdate {
    /// The delivered value; `None` when the path has no value yet or a
    /// synthetic timeout/reset notice was pushed.
    pub value: Option<PrimitiveValue>,

    /// The path's zone classification at delivery time.
    pub state: Severity,
}

/// A push channel handed to one consumer for one path.
#[derive(Debug)]
pub struct DataChannel {
    tx: watch::Sender<ChannelUpdate>,
}

impl DataChannel {
    fn new(seed: ChannelUpdate) -> Self {
        let (tx, _) = watch::channel(seed);
        Self { tx }
    }

    /// A receiver of pushed updates. The current value is observable
    /// immediately via [`watch::Receiver::borrow`].
    pub fn updates(&self) -> watch::Receiver<ChannelUpdate> {
        self.tx.subscribe()
    }

    /// The most recently delivered update.
    pub fn latest(&self) -> ChannelUpdate {
        self.tx.borrow().clone()
    }

    fn push(&self, update: ChannelUpdate) {
        self.tx.send_replace(update);
    }
}

/// Which source a registration wants to observe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSelector {
    /// Follow the record's current (last-written) value.
    Default,
    /// Follow one concrete source id.
    Source(String),
}

impl From<&str> for SourceSelector {
    fn from(s: &str) -> Self {
        if s == "default" {
            SourceSelector::Default
        } else {
            SourceSelector::Source(s.to_string())
        }
    }
}

struct Registration {
    consumer_id: String,
    source: SourceSelector,
    channel: Arc<DataChannel>,
}

/// Tracks consumer registrations and fans updates out to them.
#[derive(Default)]
pub struct SubscriptionRegistry {
    by_path: HashMap<String, Vec<Registration>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a consumer for a path, seeding the channel.
    ///
    /// Idempotent per `(consumer_id, path)`: a second call returns the
    /// existing channel unchanged and ignores the new source selector.
    pub fn subscribe(
        &mut self,
        consumer_id: &str,
        path: &str,
        source: SourceSelector,
        seed: ChannelUpdate,
    ) -> Arc<DataChannel> {
        let registrations = self.by_path.entry(path.to_string()).or_default();

        if let Some(existing) = registrations
            .iter()
            .find(|r| r.consumer_id == consumer_id)
        {
            debug!(consumer_id, path, "returning existing registration");
            return existing.channel.clone();
        }

        let channel = Arc::new(DataChannel::new(seed));
        registrations.push(Registration {
            consumer_id: consumer_id.to_string(),
            source,
            channel: channel.clone(),
        });
        channel
    }

    /// Remove a registration. Safe no-op when it does not exist.
    pub fn unsubscribe(&mut self, consumer_id: &str, path: &str) {
        if let Some(registrations) = self.by_path.get_mut(path) {
            registrations.retain(|r| r.consumer_id != consumer_id);
            if registrations.is_empty() {
                self.by_path.remove(path);
            }
        }
    }

    /// Deliver a freshly mutated record to every registration on its path.
    ///
    /// Default registrations get the record's current value; concrete
    /// ones get their source's value. A registration naming a source the
    /// record does not have is a configuration/data mismatch: it is
    /// logged and skipped without affecting the other registrations.
    pub fn fan_out(&self, record: &PathRecord) {
        let Some(registrations) = self.by_path.get(&record.path) else {
            return;
        };

        for registration in registrations {
            let value = match &registration.source {
                SourceSelector::Default => record.current_value.clone(),
                SourceSelector::Source(source) => match record.sources.get(source) {
                    Some(reading) => Some(reading.value.clone()),
                    None => {
                        warn!(
                            consumer = registration.consumer_id,
                            path = record.path,
                            source,
                            "registration names a source the path does not report"
                        );
                        continue;
                    }
                },
            };

            registration.channel.push(ChannelUpdate {
                value,
                state: record.state,
            });
        }
    }

    /// Push a synthetic "value is null, state reset" notice to every
    /// registration on a path that a stale-data watchdog flagged.
    ///
    /// A timeout is a presentation concern; the store is not touched.
    pub fn notify_timeout(&self, path: &str) {
        if let Some(registrations) = self.by_path.get(path) {
            for registration in registrations {
                registration.channel.push(ChannelUpdate::default());
            }
        }
    }

    /// Push the null/normal notice to every registration, as part of a
    /// full connection reset.
    pub fn notify_reset(&self) {
        for registrations in self.by_path.values() {
            for registration in registrations {
                registration.channel.push(ChannelUpdate::default());
            }
        }
    }

    /// Number of live registrations on a path.
    pub fn registration_count(&self, path: &str) -> usize {
        self.by_path.get(path).map_or(0, Vec::len)
    }

    /// Total live registrations.
    pub fn len(&self) -> usize {
        self.by_path.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}
