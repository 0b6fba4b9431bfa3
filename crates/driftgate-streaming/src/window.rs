// crates/driftgate-streaming/src/window.rs
// ============================================================================
// Module: Sliding Window Aggregator
// Description: Buckets events into overlapping sliding windows and keeps a
//              running per-metric aggregate per bucket.
// Purpose: Implement C5's "Windows" and "Aggregation" operations (§4.5).
// Dependencies: (none beyond std)
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/streaming/windows.py`'s
//! `SlidingWindowAggregator`. Unlike the original, bucket assignment here
//! follows spec.md's rule literally: an event is inserted into *every*
//! bucket whose half-open range `[t, t+window_size)` contains it, not just
//! the single nearest-aligned bucket.

use std::collections::BTreeMap;

/// Sliding window shape: size, slide interval, and optional alignment epoch
/// (§4.5 "Windows").
///
/// # Invariants
/// - `slide_sec <= window_size_sec`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSpec {
    /// Window duration in seconds.
    pub window_size_sec: f64,
    /// Distance between consecutive window starts, in seconds.
    pub slide_sec: f64,
    /// Epoch used to align window starts, for deterministic bucket keys.
    pub align_epoch_sec: Option<f64>,
}

/// A window start time, ordered by total comparison so it can key a
/// [`BTreeMap`] despite being an `f64`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct WindowStart(f64);

impl Eq for WindowStart {}

impl PartialOrd for WindowStart {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WindowStart {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Returns every window start whose `[start, start + window_size)` range
/// contains `event_time`.
fn window_starts_containing(event_time: f64, spec: &WindowSpec) -> Vec<f64> {
    let align = spec.align_epoch_sec.unwrap_or(0.0);
    let offset = event_time - align;
    let k_max = (offset / spec.slide_sec).floor() as i64;
    let k_min = ((offset - spec.window_size_sec) / spec.slide_sec).floor() as i64 + 1;
    (k_min..=k_max).map(|k| align + (k as f64) * spec.slide_sec).collect()
}

/// Default aggregate: arithmetic mean of in-window values (§4.5 "Aggregation").
#[must_use]
pub fn mean_aggregate(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Incremental sliding-window aggregator keyed by window start.
pub struct SlidingWindowAggregator {
    spec: WindowSpec,
    aggregate: Box<dyn Fn(&[f64]) -> Option<f64> + Send + Sync>,
    max_buckets: Option<usize>,
    buckets: BTreeMap<WindowStart, BTreeMap<String, Vec<f64>>>,
    watermark: Option<f64>,
}

impl SlidingWindowAggregator {
    /// Creates an aggregator for `spec`, optionally bounding memory to
    /// `max_buckets` windows (oldest evicted first).
    #[must_use]
    pub fn new(spec: WindowSpec, max_buckets: Option<usize>) -> Self {
        Self { spec, aggregate: Box::new(mean_aggregate), max_buckets, buckets: BTreeMap::new(), watermark: None }
    }

    /// Creates an aggregator with a caller-supplied aggregate function in
    /// place of the default mean.
    #[must_use]
    pub fn with_aggregate(
        spec: WindowSpec,
        max_buckets: Option<usize>,
        aggregate: impl Fn(&[f64]) -> Option<f64> + Send + Sync + 'static,
    ) -> Self {
        Self { spec, aggregate: Box::new(aggregate), max_buckets, buckets: BTreeMap::new(), watermark: None }
    }

    /// Window shape this aggregator was constructed with.
    #[must_use]
    pub const fn spec(&self) -> &WindowSpec {
        &self.spec
    }

    /// Adds one `(event_time, metric, value)` triple to every overlapping
    /// window, evicting the oldest bucket(s) if `max_buckets` is exceeded.
    pub fn add(&mut self, event_time: f64, metric: &str, value: f64) {
        for start in window_starts_containing(event_time, &self.spec) {
            self.buckets
                .entry(WindowStart(start))
                .or_default()
                .entry(metric.to_string())
                .or_default()
                .push(value);
        }
        if let Some(max) = self.max_buckets {
            while self.buckets.len() > max {
                if let Some(oldest) = self.buckets.keys().next().copied() {
                    self.buckets.remove(&oldest);
                } else {
                    break;
                }
            }
        }
    }

    /// Sets the current watermark, used by [`Self::current_aggregates`] to
    /// pick the newest complete window.
    pub fn set_watermark(&mut self, watermark: Option<f64>) {
        self.watermark = watermark;
    }

    /// Returns per-metric aggregates for the bucket starting at `window_start`.
    #[must_use]
    pub fn aggregates_for_window(&self, window_start: f64) -> BTreeMap<String, f64> {
        let Some(bucket) = self.buckets.get(&WindowStart(window_start)) else {
            return BTreeMap::new();
        };
        bucket
            .iter()
            .filter_map(|(metric, values)| (self.aggregate)(values).map(|v| (metric.clone(), v)))
            .collect()
    }

    /// Returns `(window_start, aggregates)` for the newest window whose end
    /// is at or before the watermark, or the newest window overall if no
    /// watermark has been set.
    #[must_use]
    pub fn current_window(&self) -> Option<(f64, BTreeMap<String, f64>)> {
        if self.buckets.is_empty() {
            return None;
        }
        if let Some(w) = self.watermark {
            for start in self.buckets.keys().rev() {
                if start.0 + self.spec.window_size_sec <= w {
                    return Some((start.0, self.aggregates_for_window(start.0)));
                }
            }
            return None;
        }
        let newest = self.buckets.keys().next_back().copied()?;
        Some((newest.0, self.aggregates_for_window(newest.0)))
    }

    /// Number of buckets currently retained.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Drops buckets that end well before `watermark`, bounding memory for
    /// long-running streams (§4.5 "Aggregation").
    pub fn prune_before(&mut self, watermark: f64) {
        let cutoff = watermark - self.spec.window_size_sec - self.spec.slide_sec * 2.0;
        self.buckets.retain(|start, _| start.0 >= cutoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> WindowSpec {
        WindowSpec { window_size_sec: 10.0, slide_sec: 5.0, align_epoch_sec: Some(0.0) }
    }

    #[test]
    fn event_lands_in_every_overlapping_window() {
        let mut agg = SlidingWindowAggregator::new(spec(), None);
        agg.add(12.0, "latency_ms", 42.0);
        // windows [5,15) and [10,20) both contain t=12
        assert_eq!(agg.bucket_count(), 2);
        assert_eq!(agg.aggregates_for_window(5.0).get("latency_ms"), Some(&42.0));
        assert_eq!(agg.aggregates_for_window(10.0).get("latency_ms"), Some(&42.0));
    }

    #[test]
    fn aggregate_defaults_to_mean() {
        let mut agg = SlidingWindowAggregator::new(spec(), None);
        agg.add(11.0, "latency_ms", 10.0);
        agg.add(12.0, "latency_ms", 20.0);
        let aggregates = agg.aggregates_for_window(10.0);
        assert_eq!(aggregates.get("latency_ms"), Some(&15.0));
    }

    #[test]
    fn current_window_picks_newest_complete_bucket_under_watermark() {
        let mut agg = SlidingWindowAggregator::new(spec(), None);
        agg.add(12.0, "m", 1.0);
        agg.add(22.0, "m", 2.0);
        agg.set_watermark(Some(21.0));
        let (start, _) = agg.current_window().expect("some window");
        assert!(start + 10.0 <= 21.0);
    }

    #[test]
    fn max_buckets_evicts_oldest() {
        let mut agg = SlidingWindowAggregator::new(spec(), Some(1));
        agg.add(12.0, "m", 1.0);
        agg.add(100.0, "m", 2.0);
        assert_eq!(agg.bucket_count(), 1);
    }

    #[test]
    fn prune_before_drops_old_buckets() {
        let mut agg = SlidingWindowAggregator::new(spec(), None);
        agg.add(12.0, "m", 1.0);
        agg.add(500.0, "m", 2.0);
        agg.prune_before(500.0);
        assert!(agg.bucket_count() < 2);
    }
}
