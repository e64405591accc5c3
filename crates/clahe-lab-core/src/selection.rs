//! Ranking and selection over a persisted master table
//!
//! Analysis never mutates the table: it derives a ranked shortlist, the
//! single optimal result, and relative qualitative tags from it.

use crate::error::{Error, Result};
use crate::models::{
    ExperimentRecord, Grade, MasterTable, MetricKind, OptimalResult, QualitativeTag, Shortlist,
};
use std::cmp::Ordering;

/// Quantile above which a metric value is tagged `High`
const HIGH_QUANTILE: f64 = 0.75;

/// Rank the table by `primary_metric` descending and keep the best
/// `top_n` rows. Ties break by ascending id so the first-created trial
/// wins and the ordering is deterministic. A `top_n` beyond the table
/// size returns the whole table sorted.
pub fn preselect(table: &MasterTable, primary_metric: MetricKind, top_n: usize) -> Shortlist {
    let mut entries: Vec<ExperimentRecord> = table.records().to_vec();
    entries.sort_by(|a, b| {
        b.metrics
            .get(primary_metric)
            .partial_cmp(&a.metrics.get(primary_metric))
            .unwrap_or(Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });
    entries.truncate(top_n);

    Shortlist {
        primary_metric,
        entries,
    }
}

/// The best-ranked trial of a shortlist
pub fn select_optimal(shortlist: &Shortlist) -> Result<OptimalResult> {
    let best = shortlist.entries.first().ok_or(Error::EmptyShortlist)?;
    Ok(OptimalResult {
        clip_limit_optimal: best.clip_limit,
        tile_size_optimal: best.tile_size,
        id: best.id,
        metrics: best.metrics,
    })
}

/// Tag each metric of a record relative to the full table: `High` above
/// the 75th percentile of that metric, `Moderate` otherwise. Percentiles
/// are recomputed over the whole table on every call; the assessment is
/// relative to this run, not an absolute threshold.
pub fn qualify(record: &ExperimentRecord, table: &MasterTable) -> Vec<QualitativeTag> {
    MetricKind::ALL
        .iter()
        .map(|&metric| {
            let threshold = percentile(&table.metric_values(metric), HIGH_QUANTILE);
            let grade = if record.metrics.get(metric) > threshold {
                Grade::High
            } else {
                Grade::Moderate
            };
            QualitativeTag { metric, grade }
        })
        .collect()
}

/// Nearest-rank percentile of a value set. Empty input yields 0.0.
fn percentile(values: &[f64], quantile: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let idx = (quantile * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
