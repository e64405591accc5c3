//! CLAHE Lab Core Library
//!
//! Core functionality for CLAHE parameter sweeps: grid enumeration,
//! contrast enhancement, quality metrics, traceable persistence and
//! ranking of the results.

pub mod config;
pub mod decoders;
pub mod driver;
pub mod enhance;
pub mod error;
pub mod grid;
pub mod metrics;
pub mod models;
pub mod report;
pub mod selection;
pub mod store;

// Re-export commonly used types
pub use config::LabConfig;
pub use decoders::{GrayImage, SourceImage};
pub use enhance::{Clahe, Enhance};
pub use error::{Error, Result};
pub use grid::ParameterGrid;
pub use models::{
    ExperimentRecord, Grade, MasterTable, MetricKind, OptimalResult, ParameterPoint,
    QualitativeTag, QualityMetrics, Shortlist,
};
pub use store::TraceabilityStore;
