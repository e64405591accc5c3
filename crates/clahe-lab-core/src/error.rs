//! Error types for the sweep pipeline
//!
//! Per-trial failures (enhancement, metric computation) are reported and
//! isolated by the driver; everything else propagates to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias used throughout the core crate
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline error types
#[derive(Error, Debug)]
pub enum Error {
    /// Input image is empty or otherwise unusable for metric computation
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// The enhancement operator rejected a trial. The driver skips the
    /// trial and continues the sweep.
    #[error("enhancement failed for trial {id} (clip={clip_limit}, tile={tile_size}): {reason}")]
    EnhancementFailure {
        id: u32,
        clip_limit: f64,
        tile_size: u32,
        reason: String,
    },

    /// Metric computation failed on an enhanced image. The driver records
    /// the trial with zeroed metrics and continues.
    #[error("metric computation failed for trial {id}: {reason}")]
    MetricComputationFailure { id: u32, reason: String },

    /// Unknown ranking metric name
    #[error("unknown ranking metric: {0}")]
    InvalidMetric(String),

    /// Selection attempted on an empty shortlist
    #[error("shortlist is empty, nothing to select")]
    EmptyShortlist,

    /// A master-table row references an artifact that is absent on disk
    #[error("missing artifact for trial {id}: {path}")]
    MissingArtifact { id: u32, path: PathBuf },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decode/encode error
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Master-table CSV error
    #[error("table error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON sidecar error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
