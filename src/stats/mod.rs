//! Summary statistics over a point-in-time set of samples.
//!
//! Everything here is a pure function of its input: the caller's slice is
//! never reordered, and the same input always yields the same summary.

use serde::Serialize;

use crate::catalog::FormatHint;
use crate::model::Sample;


/// Percentile reported by [`summarize`].
const PERCENTILE_P95: usize = 95;
const PERCENT_DIVISOR: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Statistics {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub percentile95: f64,
}

impl Statistics {
    /// Renders `min/max/avg/p95` with a fixed number of decimals.
    #[must_use]
    pub fn format(&self, hint: FormatHint) -> String {
        format!(
            "min={} max={} avg={} p95={}",
            hint.format(self.min),
            hint.format(self.max),
            hint.format(self.average),
            hint.format(self.percentile95)
        )
    }
}

/// Summarizes the values of `samples`, or `None` when there is no data.
#[must_use]
pub fn summarize(samples: &[Sample]) -> Option<Statistics> {
    let values: Vec<f64> = samples.iter().map(Sample::value).collect();
    summarize_values(&values)
}

/// Value-level entry point of [`summarize`].
#[must_use]
pub fn summarize_values(values: &[f64]) -> Option<Statistics> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let count = sorted.len();
    let min = *sorted.first()?;
    let max = *sorted.last()?;
    let percentile95 = *sorted.get(nearest_rank_index(count, PERCENTILE_P95))?;

    Some(Statistics {
        count,
        min,
        max,
        average: mean(&sorted),
        percentile95,
    })
}

/// Index of the nearest-rank percentile in an ascending slice of `count`
/// values: `floor(count * percentile / 100)`, clamped to the last element.
pub(crate) fn nearest_rank_index(count: usize, percentile: usize) -> usize {
    let index = count
        .checked_mul(percentile)
        .map_or(count, |scaled| scaled / PERCENT_DIVISOR);
    index.min(count.saturating_sub(1))
}

#[expect(
    clippy::float_arithmetic,
    reason = "Mean of telemetry values is inherently floating point"
)]
fn mean(values: &[f64]) -> f64 {
    let count = values.len() as f64;
    let sum: f64 = values.iter().sum();
    if sum.is_finite() {
        return sum / count;
    }
    // The plain sum overflowed; scaling first keeps the result within the
    // range of the inputs.
    values.iter().map(|value| value / count).sum()
}
