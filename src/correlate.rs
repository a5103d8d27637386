//! Pairwise correlation over raw observation tables.
//!
//! This is the O(n²·m) hot path of the pipeline: every unordered pair of
//! rows is scanned once, in natural row order, so results are
//! bit-reproducible for identical input. Downstream filters threshold on
//! the emitted weights, so the numeric contract here (pairwise exclusion of
//! non-finite samples, ≥ 2 shared samples, positive variance, two-decimal
//! round-half-to-even) is load-bearing.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

/// Minimum number of shared finite samples for a pair to correlate.
const MIN_SHARED_SAMPLES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    Pearson,
    Spearman,
}

/// Parameters for one correlation run. `take_abs` keeps negative
/// correlations by absolute value; otherwise non-positive correlations are
/// discarded outright.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationParams {
    pub method: CorrelationMethod,
    pub min_abs_corr: f64,
    pub take_abs: bool,
}

impl Default for CorrelationParams {
    fn default() -> Self {
        CorrelationParams {
            method: CorrelationMethod::Pearson,
            min_abs_corr: 0.8,
            take_abs: false,
        }
    }
}

/// Sparse edge output in parallel-array form. Entry `k` is an undirected
/// edge between rows `sources[k]` and `targets[k]` with `sources[k] >
/// targets[k]` always (only the lower triangle is emitted).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeList {
    pub sources: Vec<u32>,
    pub targets: Vec<u32>,
    pub weights: Vec<f64>,
}

impl EdgeList {
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, f64)> + '_ {
        self.sources
            .iter()
            .zip(self.targets.iter())
            .zip(self.weights.iter())
            .map(|((&s, &t), &w)| (s, t, w))
    }
}

/// Compute correlation edges over all unordered row pairs `(i, j)`, `i > j`.
///
/// Pairs with fewer than two shared finite samples or with non-positive
/// variance on either side are skipped silently; that is an expected
/// degenerate case, not an error.
#[tracing::instrument(skip(rows), fields(rows = rows.len()))]
pub fn compute_edges(rows: &[Vec<f64>], params: &CorrelationParams) -> EdgeList {
    scan(rows, params, None).unwrap_or_default()
}

/// Like [`compute_edges`], but checks `cancelled` once per source row and
/// returns `None` when the computation was abandoned. This is the entry
/// point the correlation worker uses.
pub fn compute_edges_cancellable(
    rows: &[Vec<f64>],
    params: &CorrelationParams,
    cancelled: &AtomicBool,
) -> Option<EdgeList> {
    scan(rows, params, Some(cancelled))
}

fn scan(
    rows: &[Vec<f64>],
    params: &CorrelationParams,
    cancelled: Option<&AtomicBool>,
) -> Option<EdgeList> {
    let mut edges = EdgeList::default();
    let mut skipped = 0usize;
    for i in 1..rows.len() {
        if cancelled.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            tracing::debug!(row = i, "correlation scan cancelled");
            return None;
        }
        for j in 0..i {
            let Some(raw) = pair_correlation(&rows[i], &rows[j], params.method) else {
                skipped += 1;
                continue;
            };
            let rounded = round2(raw.clamp(-1.0, 1.0));
            let weight = if params.take_abs {
                rounded.abs()
            } else if rounded <= 0.0 {
                continue;
            } else {
                rounded
            };
            if weight < params.min_abs_corr {
                continue;
            }
            edges.sources.push(i as u32);
            edges.targets.push(j as u32);
            edges.weights.push(weight);
        }
    }
    if skipped > 0 {
        tracing::debug!(skipped, "pairs excluded as numerically degenerate");
    }
    tracing::debug!(edges = edges.len(), "correlation scan complete");
    Some(edges)
}

/// Correlation of a single row pair, before rounding and thresholding.
/// Returns `None` for degenerate pairs.
pub fn pair_correlation(x: &[f64], y: &[f64], method: CorrelationMethod) -> Option<f64> {
    // Pairwise exclusion: only columns where both rows are finite.
    let shared: (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y.iter())
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(a, b)| (*a, *b))
        .unzip();
    if shared.0.len() < MIN_SHARED_SAMPLES {
        return None;
    }
    match method {
        CorrelationMethod::Pearson => pearson(&shared.0, &shared.1),
        CorrelationMethod::Spearman => {
            pearson(&average_ranks(&shared.0), &average_ranks(&shared.1))
        }
    }
}

fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y.iter()) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    Some(cov / (var_x * var_y).sqrt())
}

/// 1-based ranks with ties averaged, the Spearman rank transform.
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && values[order[end + 1]] == values[order[start]] {
            end += 1;
        }
        let average = (start + end) as f64 / 2.0 + 1.0;
        for &idx in &order[start..=end] {
            ranks[idx] = average;
        }
        start = end + 1;
    }
    ranks
}

/// Round to two decimal places, ties to even.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
