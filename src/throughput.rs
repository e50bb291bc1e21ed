//! # Throughput Module
//!
//! Download/upload rates derived from two snapshots of the host's cumulative
//! byte counters. Elapsed time comes from a monotonic clock so wall-clock
//! adjustments never produce negative intervals.

use std::time::Instant;

const BITS_PER_BYTE: f64 = 8.0;
const BITS_PER_MEGABIT: f64 = 1_000_000.0;

/// Cumulative byte counters as reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrafficTotals {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Counters paired with the instant they were read
#[derive(Debug, Clone, Copy)]
pub struct CounterSnapshot {
    pub totals: TrafficTotals,
    pub at: Instant,
}

impl CounterSnapshot {
    pub fn new(totals: TrafficTotals, at: Instant) -> Self {
        Self { totals, at }
    }
}

/// Previous and current counter snapshots for one tick
#[derive(Debug, Clone, Copy)]
pub struct ThroughputSample {
    pub previous: CounterSnapshot,
    pub current: CounterSnapshot,
}

impl ThroughputSample {
    pub fn elapsed_secs(&self) -> f64 {
        self.current
            .at
            .saturating_duration_since(self.previous.at)
            .as_secs_f64()
    }

    /// Download rate in Mbps, 0.0 when no time has elapsed
    pub fn download_mbps(&self) -> f64 {
        let delta = self
            .current
            .totals
            .rx_bytes
            .saturating_sub(self.previous.totals.rx_bytes);
        rate_mbps(delta, self.elapsed_secs())
    }

    /// Upload rate in Mbps, 0.0 when no time has elapsed
    pub fn upload_mbps(&self) -> f64 {
        let delta = self
            .current
            .totals
            .tx_bytes
            .saturating_sub(self.previous.totals.tx_bytes);
        rate_mbps(delta, self.elapsed_secs())
    }
}

fn rate_mbps(delta_bytes: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    let rate = (delta_bytes as f64 * BITS_PER_BYTE / BITS_PER_MEGABIT) / elapsed_secs;
    if rate.is_finite() {
        rate
    } else {
        0.0
    }
}

/// Keeps the previous tick's counters and turns each new reading into a sample
#[derive(Debug, Clone)]
pub struct ThroughputTracker {
    last: CounterSnapshot,
}

impl ThroughputTracker {
    /// Start tracking from the given counters; missing counters start at zero
    pub fn new(initial: Option<TrafficTotals>, at: Instant) -> Self {
        Self {
            last: CounterSnapshot::new(initial.unwrap_or_default(), at),
        }
    }

    /// Produce the sample for this tick and remember `current` for the next one.
    ///
    /// Missing counters repeat the last known totals, giving a zero rate.
    pub fn advance(&mut self, current: Option<TrafficTotals>, at: Instant) -> ThroughputSample {
        let current = CounterSnapshot::new(current.unwrap_or(self.last.totals), at);
        let sample = ThroughputSample {
            previous: self.last,
            current,
        };
        self.last = current;
        sample
    }
}
