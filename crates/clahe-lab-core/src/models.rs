//! Data model for the sweep pipeline
//!
//! One trial is an (image, clip limit, tile size) evaluation. Records
//! accumulate into the run-scoped master table; analysis derives a ranked
//! shortlist and a single optimal result from it.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// One point of the parameter space: clip limit (alpha) and tile size (omega)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterPoint {
    /// Clip limit bounding per-tile histogram bin height
    pub clip_limit: f64,
    /// Side length in pixels of the square equalization tiles
    pub tile_size: u32,
}

/// The fixed set of quality metrics computed per trial
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Shannon entropy of the intensity histogram, bits per pixel
    pub entropy: f64,
    /// Mean local standard deviation (box kernel)
    pub local_contrast: f64,
    /// Mean Sobel gradient magnitude
    pub edge_sharpness: f64,
    /// Normalized max/min intensity difference, in [0, 1]
    pub michelson_contrast: f64,
}

impl QualityMetrics {
    /// Sentinel used when metric computation fails on an enhanced image.
    /// The trial is kept in the table so the sweep never loses a row.
    pub const fn zeroed() -> Self {
        Self {
            entropy: 0.0,
            local_contrast: 0.0,
            edge_sharpness: 0.0,
            michelson_contrast: 0.0,
        }
    }

    /// Value of a single metric by kind
    pub fn get(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Entropy => self.entropy,
            MetricKind::LocalContrast => self.local_contrast,
            MetricKind::EdgeSharpness => self.edge_sharpness,
            MetricKind::MichelsonContrast => self.michelson_contrast,
        }
    }
}

/// Names of the four quality metrics, used for ranking and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Entropy,
    LocalContrast,
    EdgeSharpness,
    MichelsonContrast,
}

impl MetricKind {
    /// All metrics in master-table column order
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Entropy,
        MetricKind::LocalContrast,
        MetricKind::EdgeSharpness,
        MetricKind::MichelsonContrast,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Entropy => "entropy",
            MetricKind::LocalContrast => "local_contrast",
            MetricKind::EdgeSharpness => "edge_sharpness",
            MetricKind::MichelsonContrast => "michelson_contrast",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "entropy" => Ok(MetricKind::Entropy),
            "local_contrast" => Ok(MetricKind::LocalContrast),
            "edge_sharpness" => Ok(MetricKind::EdgeSharpness),
            "michelson_contrast" => Ok(MetricKind::MichelsonContrast),
            other => Err(Error::InvalidMetric(other.to_string())),
        }
    }
}

/// One row of the master table: a single (image, parameter point) trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    /// Sequential trial id, assigned in grid-iteration order starting at 1
    pub id: u32,
    /// File name of the source image
    pub source_image: String,
    /// Clip limit used for this trial
    pub clip_limit: f64,
    /// Tile size used for this trial
    pub tile_size: u32,
    /// Quality metrics of the enhanced image
    pub metrics: QualityMetrics,
    /// Location of the persisted enhanced image
    pub artifact_path: PathBuf,
}

impl ExperimentRecord {
    pub fn point(&self) -> ParameterPoint {
        ParameterPoint {
            clip_limit: self.clip_limit,
            tile_size: self.tile_size,
        }
    }
}

/// Run-scoped ledger of all trials. Append-only during the sweep,
/// read-only during analysis. Row order equals creation order.
#[derive(Debug, Clone, Default)]
pub struct MasterTable {
    records: Vec<ExperimentRecord>,
}

impl MasterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. Ids must be strictly increasing; the driver
    /// assigns them from a single monotonic counter per run.
    pub fn push(&mut self, record: ExperimentRecord) {
        debug_assert!(
            self.records.last().map_or(true, |r| record.id > r.id),
            "record ids must be strictly increasing"
        );
        self.records.push(record);
    }

    pub fn records(&self) -> &[ExperimentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All values of one metric, in row order
    pub fn metric_values(&self, kind: MetricKind) -> Vec<f64> {
        self.records.iter().map(|r| r.metrics.get(kind)).collect()
    }
}

impl FromIterator<ExperimentRecord> for MasterTable {
    fn from_iter<I: IntoIterator<Item = ExperimentRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// Ranked, size-bounded subset of the master table
#[derive(Debug, Clone)]
pub struct Shortlist {
    /// Metric the entries are ranked by
    pub primary_metric: MetricKind,
    /// Entries sorted descending by the primary metric, ties broken by
    /// ascending id
    pub entries: Vec<ExperimentRecord>,
}

impl Shortlist {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The winning parameter combination of a run, serialized as its final output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimalResult {
    pub clip_limit_optimal: f64,
    pub tile_size_optimal: u32,
    pub id: u32,
    pub metrics: QualityMetrics,
}

/// Qualitative grade of one metric relative to the full table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    /// Above the 75th percentile of the metric across the table
    High,
    Moderate,
}

/// Descriptive per-metric tag attached to shortlisted records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualitativeTag {
    pub metric: MetricKind,
    pub grade: Grade,
}
