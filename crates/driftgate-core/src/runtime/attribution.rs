// crates/driftgate-core/src/runtime/attribution.rs
// ============================================================================
// Module: Drift Attribution
// Description: Per-metric explanation of a drift/fail decision: descriptive
//              statistics, onset detection, sample evidence window, and
//              feature correlation.
// Purpose: Let a human or downstream policy understand *why* a metric
//          drifted, not just that it did.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Attribution only runs for metrics that already drifted or failed (§4.4.g):
//! it never changes the status decision, only explains it.
//!
//! Invariants:
//! - `confidence` is derived solely from sample count, never from the effect
//!   size.
//! - Per Open Question 4, when `baseline_std == 0` the z-score is `None`,
//!   never infinite.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Descriptive Stats
// ============================================================================

/// Descriptive statistics for a sample set (or a degenerate single value).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleStats {
    /// Arithmetic mean.
    pub mean: f64,
    /// 50th percentile (linear interpolation, `rank = (n-1)*p`).
    pub median: f64,
    /// 95th percentile (linear interpolation).
    pub p95: f64,
    /// Population standard deviation.
    pub std: f64,
    /// Number of samples the statistics were computed over.
    pub count: usize,
}

/// Computes the `p`-th percentile (`0.0..=1.0`) of `sorted` using linear
/// interpolation with `rank = (n-1)*p` (Open Question 3).
///
/// # Panics
/// Never: callers must ensure `sorted` is non-empty; an empty slice returns
/// `0.0` rather than panicking.
#[must_use]
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = (sorted.len() - 1) as f64 * p;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let frac = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Computes [`SampleStats`] from a sample set, or a degenerate single-value
/// fallback (`mean = median = p95 = value`, `std = 0`, `count = 1`) when no
/// sample array is present.
#[must_use]
pub fn stats_from_samples(samples: Option<&[f64]>, fallback_value: Option<f64>) -> Option<SampleStats> {
    if let Some(samples) = samples.filter(|s| !s.is_empty()) {
        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        return Some(SampleStats {
            mean,
            median: percentile(&sorted, 0.5),
            p95: percentile(&sorted, 0.95),
            std: variance.sqrt(),
            count: n,
        });
    }
    fallback_value.map(|value| SampleStats {
        mean: value,
        median: value,
        p95: value,
        std: 0.0,
        count: 1,
    })
}

// ============================================================================
// SECTION: Confidence
// ============================================================================

/// Attribution confidence tier, derived solely from sample count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// `count >= 200`.
    High,
    /// `count >= 50`.
    Medium,
    /// `count > 0`.
    Low,
}

/// Maps a sample count to a [`Confidence`] tier, or `None` for a zero count.
#[must_use]
pub const fn confidence_from_count(count: usize) -> Option<Confidence> {
    if count >= 200 {
        Some(Confidence::High)
    } else if count >= 50 {
        Some(Confidence::Medium)
    } else if count > 0 {
        Some(Confidence::Low)
    } else {
        None
    }
}

// ============================================================================
// SECTION: Effect Size
// ============================================================================

/// Effect-size summary for a drifted/failed metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectSize {
    /// `current - baseline`.
    pub delta: f64,
    /// `100 * delta / baseline`, or `None` if baseline is zero.
    pub percent: Option<f64>,
    /// `delta / baseline_std`, or `None` if `baseline_std == 0` (Open Question 4).
    pub zscore: Option<f64>,
}

/// Computes a z-score, returning `None` rather than infinity when `std` is zero.
#[must_use]
pub fn zscore(delta: f64, baseline_std: f64) -> Option<f64> {
    (baseline_std > 0.0).then(|| delta / baseline_std)
}

// ============================================================================
// SECTION: Onset Detection
// ============================================================================

/// Onset location within a per-sample drift-score series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Onset {
    /// Index of the first sample whose `|score|` exceeds the threshold.
    pub first_exceed_index: Option<usize>,
    /// Index of the start of the first run of length >= `drift_persistence`
    /// whose samples all exceed the threshold.
    pub sustained_index: Option<usize>,
    /// Contiguous slice (up to ~7 samples) of raw sample values centered on
    /// the onset.
    pub evidence: Vec<f64>,
}

/// Scans a per-sample drift-score series (z-score if available, else raw
/// delta from baseline mean) for onset indices and an evidence window.
#[must_use]
pub fn onset_and_evidence(samples: &[f64], drift_scores: &[f64], threshold: f64, persistence: u32) -> Onset {
    let persistence = persistence.max(1) as usize;
    let first_exceed_index = drift_scores.iter().position(|s| s.abs() > threshold);

    let mut sustained_index = None;
    let mut run_start = None;
    let mut run_len = 0usize;
    for (idx, score) in drift_scores.iter().enumerate() {
        if score.abs() > threshold {
            if run_start.is_none() {
                run_start = Some(idx);
            }
            run_len += 1;
            if run_len >= persistence {
                sustained_index = run_start;
                break;
            }
        } else {
            run_start = None;
            run_len = 0;
        }
    }

    let center = sustained_index.or(first_exceed_index).unwrap_or(0);
    let half = 3usize;
    let start = center.saturating_sub(half);
    let end = (center + half + 1).min(samples.len());
    let evidence = samples.get(start..end).map(<[f64]>::to_vec).unwrap_or_default();

    Onset {
        first_exceed_index,
        sustained_index,
        evidence,
    }
}

// ============================================================================
// SECTION: Correlation
// ============================================================================

/// Pearson correlation coefficient between two equal-length series, or
/// `None` if either series has fewer than 2 points or zero variance.
#[must_use]
pub fn pearson_corr(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let xs = &xs[..n];
    let ys = &ys[..n];
    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for i in 0..n {
        let dx = xs[i] - mean_x;
        let dy = ys[i] - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Minimum absolute correlation required to report a feature correlation
/// with confidence (§4.4.g).
pub const CORRELATION_CUTOFF: f64 = 0.30;

/// One per-metric attribution entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    /// Canonical metric name.
    pub metric: String,
    /// Effect size (delta/percent/zscore).
    pub effect_size: EffectSize,
    /// Baseline-sample statistics.
    pub baseline_stats: SampleStats,
    /// Current-sample statistics.
    pub current_stats: SampleStats,
    /// Confidence tier, if any samples were available.
    pub confidence: Option<Confidence>,
    /// Onset location within the current sample series.
    pub onset: Onset,
    /// Pearson correlation between current samples and drift scores, kept
    /// only when `|r| >= CORRELATION_CUTOFF`.
    pub raw_feature_correlation: Option<f64>,
    /// Explanatory note when the correlation was dropped for low confidence.
    pub correlation_note: Option<String>,
    /// Ranking score used to sort `attribution[]` (`|delta|` when no
    /// z-score is available, else `|zscore|`).
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_uses_rank_n_minus_1_times_p() {
        let sorted = vec![1.0, 2.0, 3.0, 4.0];
        // rank = 3*0.5 = 1.5 -> interpolate between index 1 (2.0) and 2 (3.0)
        assert!((percentile(&sorted, 0.5) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn zscore_is_none_when_baseline_std_is_zero() {
        assert_eq!(zscore(5.0, 0.0), None);
        assert_eq!(zscore(5.0, 2.5), Some(2.0));
    }

    #[test]
    fn confidence_tiers_match_thresholds() {
        assert_eq!(confidence_from_count(0), None);
        assert_eq!(confidence_from_count(1), Some(Confidence::Low));
        assert_eq!(confidence_from_count(50), Some(Confidence::Medium));
        assert_eq!(confidence_from_count(200), Some(Confidence::High));
    }

    #[test]
    fn onset_detects_sustained_run() {
        let samples = vec![0.0, 0.1, 5.0, 5.1, 5.2, 0.0, 0.0];
        let scores = samples.clone();
        let onset = onset_and_evidence(&samples, &scores, 1.0, 3);
        assert_eq!(onset.first_exceed_index, Some(2));
        assert_eq!(onset.sustained_index, Some(2));
    }

    #[test]
    fn correlation_below_cutoff_should_be_dropped_by_caller() {
        let xs = vec![1.0, 2.0, 3.0, 4.0];
        let ys = vec![4.0, 3.0, 2.0, 1.0];
        let r = pearson_corr(&xs, &ys).expect("correlated series");
        assert!((r + 1.0).abs() < 1e-9);
        assert!(r.abs() >= CORRELATION_CUTOFF);
    }
}
