//! Update throughput sampling.
//!
//! A single counter sits on the update hot path; an externally driven
//! per-second tick folds it into rolling windows (the engine owns no
//! timers). Windows are published through a `watch` channel so a
//! diagnostics view can follow them without polling the sampler.

use std::collections::VecDeque;
use tokio::sync::watch;

/// Number of slots kept in each rolling window.
pub const WINDOW_SLOTS: usize = 60;

/// Published throughput windows, newest sample last.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThroughputStats {
    /// Updates per second over the last minute (≤ 60 entries).
    pub per_second: Vec<u64>,

    /// Updates per minute over the last hour (≤ 60 entries).
    pub per_minute: Vec<u64>,

    /// Updates processed since construction or the last reset.
    pub total: u64,
}

/// Counts path updates and maintains the rolling windows.
pub struct ThroughputSampler {
    current_second: u64,
    seconds_into_minute: u32,
    current_minute: u64,
    per_second: VecDeque<u64>,
    per_minute: VecDeque<u64>,
    total: u64,
    tx: watch::Sender<ThroughputStats>,
}

impl ThroughputSampler {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ThroughputStats::default());
        Self {
            current_second: 0,
            seconds_into_minute: 0,
            current_minute: 0,
            per_second: VecDeque::with_capacity(WINDOW_SLOTS),
            per_minute: VecDeque::with_capacity(WINDOW_SLOTS),
            total: 0,
            tx,
        }
    }

    /// Count one processed path update.
    pub fn record_update(&mut self) {
        self.current_second += 1;
        self.total += 1;
    }

    /// Close the current one-second sample and publish the windows.
    ///
    /// The caller drives this from its own clock, once per second.
    pub fn tick_second(&mut self) {
        let sample = std::mem::take(&mut self.current_second);
        push_capped(&mut self.per_second, sample);

        self.current_minute += sample;
        self.seconds_into_minute += 1;
        if self.seconds_into_minute == 60 {
            push_capped(&mut self.per_minute, std::mem::take(&mut self.current_minute));
            self.seconds_into_minute = 0;
        }

        self.publish();
    }

    /// Drop all samples and counters, e.g. on a connection reset.
    pub fn reset(&mut self) {
        self.current_second = 0;
        self.seconds_into_minute = 0;
        self.current_minute = 0;
        self.per_second.clear();
        self.per_minute.clear();
        self.total = 0;
        self.publish();
    }

    /// The current window snapshot.
    pub fn snapshot(&self) -> ThroughputStats {
        ThroughputStats {
            per_second: self.per_second.iter().copied().collect(),
            per_minute: self.per_minute.iter().copied().collect(),
            total: self.total,
        }
    }

    /// Receiver of window snapshots, refreshed on every tick.
    pub fn stats_stream(&self) -> watch::Receiver<ThroughputStats> {
        self.tx.subscribe()
    }

    fn publish(&self) {
        self.tx.send_replace(self.snapshot());
    }
}

impl Default for ThroughputSampler {
    fn default() -> Self {
        Self::new()
    }
}

fn push_capped(window: &mut VecDeque<u64>, sample: u64) {
    if window.len() == WINDOW_SLOTS {
        window.pop_front();
    }
    window.push_back(sample);
}
