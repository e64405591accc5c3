//! Optional YAML configuration for sweep and analysis defaults
//!
//! Configuration is entirely optional: every field has a built-in default
//! and a missing file is not an error. Lookup order is the
//! `CLAHE_LAB_CONFIG` environment variable, then `clahe-lab.yml` /
//! `clahe-lab.yaml` in the working directory, then the same names under
//! `./config/`.

use crate::error::Result;
use crate::grid::ParameterGrid;
use crate::models::MetricKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File names probed in each candidate directory
pub const CONFIG_FILENAMES: &[&str] = &["clahe-lab.yml", "clahe-lab.yaml"];

/// Environment variable that overrides the config search path
pub const CONFIG_ENV_VAR: &str = "CLAHE_LAB_CONFIG";

/// Parameter-grid values as they appear in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridValues {
    pub clip_limits: Vec<f64>,
    pub tile_sizes: Vec<u32>,
}

impl Default for GridValues {
    fn default() -> Self {
        let grid = ParameterGrid::default();
        Self {
            clip_limits: grid.clip_limits,
            tile_sizes: grid.tile_sizes,
        }
    }
}

impl From<GridValues> for ParameterGrid {
    fn from(values: GridValues) -> Self {
        ParameterGrid {
            clip_limits: values.clip_limits,
            tile_sizes: values.tile_sizes,
        }
    }
}

/// Analysis defaults: ranking metric and shortlist sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisDefaults {
    pub primary_metric: MetricKind,
    pub preselect_top_n: usize,
    pub report_top_n: usize,
}

impl Default for AnalysisDefaults {
    fn default() -> Self {
        Self {
            primary_metric: MetricKind::LocalContrast,
            preselect_top_n: 10,
            report_top_n: 5,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    pub grid: GridValues,
    pub analysis: AnalysisDefaults,
}

impl LabConfig {
    /// Parse a config file from an explicit path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let mut config: LabConfig = serde_yaml::from_str(&text)
            .map_err(|e| crate::error::Error::Other(format!("invalid config: {}", e)))?;
        let warnings = config.sanitize();
        for warning in warnings {
            log::warn!("config: {}", warning);
        }
        Ok(config)
    }

    /// Load from the first candidate path that exists, or fall back to
    /// the built-in defaults
    pub fn discover() -> Result<Self> {
        match find_config_file() {
            Some(path) => {
                log::info!("using config {}", path.display());
                Self::load(path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Drop out-of-range values, returning a human-readable warning for
    /// each dropped entry. Emptied lists fall back to the defaults.
    pub fn sanitize(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        let before = self.grid.clip_limits.len();
        self.grid.clip_limits.retain(|&c| c > 0.0 && c.is_finite());
        if self.grid.clip_limits.len() < before {
            warnings.push("dropped non-positive clip limit values".to_string());
        }
        if self.grid.clip_limits.is_empty() {
            warnings.push("clip_limits empty, using defaults".to_string());
            self.grid.clip_limits = GridValues::default().clip_limits;
        }

        let before = self.grid.tile_sizes.len();
        self.grid.tile_sizes.retain(|&t| t > 0);
        if self.grid.tile_sizes.len() < before {
            warnings.push("dropped zero tile size values".to_string());
        }
        if self.grid.tile_sizes.is_empty() {
            warnings.push("tile_sizes empty, using defaults".to_string());
            self.grid.tile_sizes = GridValues::default().tile_sizes;
        }

        if self.analysis.preselect_top_n == 0 {
            warnings.push("preselect_top_n must be at least 1, using default".to_string());
            self.analysis.preselect_top_n = AnalysisDefaults::default().preselect_top_n;
        }
        if self.analysis.report_top_n == 0 {
            warnings.push("report_top_n must be at least 1, using default".to_string());
            self.analysis.report_top_n = AnalysisDefaults::default().report_top_n;
        }
        if self.analysis.report_top_n > self.analysis.preselect_top_n {
            warnings.push(format!(
                "report_top_n {} capped to preselect_top_n {}",
                self.analysis.report_top_n, self.analysis.preselect_top_n
            ));
            self.analysis.report_top_n = self.analysis.preselect_top_n;
        }

        warnings
    }
}

/// First existing config file among the candidate locations
fn find_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Some(path);
        }
        log::warn!(
            "{} points to {}, which does not exist",
            CONFIG_ENV_VAR,
            path.display()
        );
    }

    let cwd = std::env::current_dir().ok()?;
    for dir in [cwd.clone(), cwd.join("config")] {
        for name in CONFIG_FILENAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}
