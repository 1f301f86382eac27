//! # pelorus-engine
//!
//! The real-time update pipeline behind the dashboard: zone/alarm
//! evaluation, per-path subscription fan-out, throughput sampling, and
//! the [`DataService`] facade that runs inbound messages through all of
//! it synchronously.

pub mod registry;
pub mod service;
pub mod stats;
pub mod zones;

pub use registry::{ChannelUpdate, DataChannel, SourceSelector, SubscriptionRegistry};
pub use service::DataService;
pub use stats::{ThroughputSampler, ThroughputStats, WINDOW_SLOTS};
pub use zones::{Classification, ConversionError, IdentityConverter, UnitConverter, ZoneEvaluator};
