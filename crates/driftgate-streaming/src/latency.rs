// crates/driftgate-streaming/src/latency.rs
// ============================================================================
// Module: Decision Latency Recorder
// Description: p50/p95 decision-latency tracking over a bounded ring buffer.
// Purpose: Implement C5's latency recorder (§4.5 "Emit").
// Dependencies: (none beyond std)
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/streaming/latency.py`'s `LatencyRecorder`:
//! `percentile(p) = sorted[max(0, floor(n*p) - 1)]`, distinct from the
//! linear-interpolation percentile used for metric attribution.

use std::collections::VecDeque;

/// Default ring-buffer capacity, matching the original's `max_samples`.
pub const DEFAULT_MAX_SAMPLES: usize = 1000;

/// Records decision latencies over a bounded ring buffer and exposes
/// p50/p95.
#[derive(Debug, Clone)]
pub struct LatencyRecorder {
    max_samples: usize,
    samples: VecDeque<f64>,
}

impl Default for LatencyRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SAMPLES)
    }
}

impl LatencyRecorder {
    /// Creates a recorder retaining at most `max_samples` latencies.
    #[must_use]
    pub fn new(max_samples: usize) -> Self {
        Self { max_samples, samples: VecDeque::with_capacity(max_samples.min(1024)) }
    }

    /// Records one latency sample, evicting the oldest sample if the ring
    /// buffer is full.
    pub fn record(&mut self, latency_sec: f64) {
        self.samples.push_back(latency_sec);
        while self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }
    }

    /// Number of samples currently retained.
    #[must_use]
    pub fn count(&self) -> usize {
        self.samples.len()
    }

    fn percentile(&self, p: f64) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);
        #[allow(clippy::cast_precision_loss, reason = "sample counts are small ring-buffer sizes")]
        let raw_idx = (sorted.len() as f64 * p).floor() as i64 - 1;
        let idx = usize::try_from(raw_idx.max(0)).unwrap_or(0);
        sorted.get(idx.min(sorted.len() - 1)).copied()
    }

    /// 50th percentile decision latency.
    #[must_use]
    pub fn p50(&self) -> Option<f64> {
        self.percentile(0.50)
    }

    /// 95th percentile decision latency.
    #[must_use]
    pub fn p95(&self) -> Option<f64> {
        self.percentile(0.95)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_recorder_has_no_percentiles() {
        let recorder = LatencyRecorder::default();
        assert_eq!(recorder.p50(), None);
        assert_eq!(recorder.p95(), None);
    }

    #[test]
    fn percentiles_match_original_floor_minus_one_formula() {
        let mut recorder = LatencyRecorder::new(10);
        for i in 1..=10 {
            recorder.record(f64::from(i));
        }
        // sorted = [1..10], p50: floor(10*0.5)-1 = 4 -> sorted[4] = 5
        assert_eq!(recorder.p50(), Some(5.0));
        // p95: floor(10*0.95)-1 = 8 -> sorted[8] = 9
        assert_eq!(recorder.p95(), Some(9.0));
    }

    #[test]
    fn ring_buffer_evicts_oldest_past_capacity() {
        let mut recorder = LatencyRecorder::new(3);
        recorder.record(1.0);
        recorder.record(2.0);
        recorder.record(3.0);
        recorder.record(4.0);
        assert_eq!(recorder.count(), 3);
    }
}
