//! Traceable persistence of sweep results
//!
//! Every trial gets its own directory keyed by zero-padded id, holding
//! the enhanced image plus a JSON sidecar of parameters and metrics. The
//! artifact is always written before the record joins the master table,
//! so the table never references an image that is not on disk.

use crate::decoders::GrayImage;
use crate::error::{Error, Result};
use crate::models::{ExperimentRecord, MasterTable, QualityMetrics};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the tabular artifact consumed by analysis
pub const MASTER_TABLE_FILE: &str = "master_table.csv";

/// File name of the enhanced image inside each trial directory
pub const ARTIFACT_FILE: &str = "enhanced.png";

/// File name of the parameter/metric sidecar inside each trial directory
pub const SIDECAR_FILE: &str = "record.json";

/// Flat row shape of the master-table CSV. Kept separate from
/// `ExperimentRecord` so the on-disk column set stays stable.
#[derive(Debug, Serialize, Deserialize)]
struct MasterRow {
    id: u32,
    source_image: String,
    clip_limit: f64,
    tile_size: u32,
    entropy: f64,
    local_contrast: f64,
    edge_sharpness: f64,
    michelson_contrast: f64,
}

impl From<&ExperimentRecord> for MasterRow {
    fn from(record: &ExperimentRecord) -> Self {
        Self {
            id: record.id,
            source_image: record.source_image.clone(),
            clip_limit: record.clip_limit,
            tile_size: record.tile_size,
            entropy: record.metrics.entropy,
            local_contrast: record.metrics.local_contrast,
            edge_sharpness: record.metrics.edge_sharpness,
            michelson_contrast: record.metrics.michelson_contrast,
        }
    }
}

/// Owns the run directory and the in-memory master table during a sweep
#[derive(Debug)]
pub struct TraceabilityStore {
    root: PathBuf,
    table: MasterTable,
    finalized: bool,
}

impl TraceabilityStore {
    /// Create a store rooted at `root`, creating the directory if needed
    pub fn create<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            table: MasterTable::new(),
            finalized: false,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of one trial, `trial_NNNN` with a 4-digit zero-padded id
    /// so listings sort by id
    pub fn trial_dir(&self, id: u32) -> PathBuf {
        self.root.join(format!("trial_{:04}", id))
    }

    /// Location of the enhanced-image artifact for a trial
    pub fn artifact_path(&self, id: u32) -> PathBuf {
        self.trial_dir(id).join(ARTIFACT_FILE)
    }

    /// Persist one trial: enhanced image first, then the JSON sidecar,
    /// then the master-table append. Ordering is the orphan-row guard.
    pub fn persist(&mut self, record: &ExperimentRecord, image: &GrayImage) -> Result<()> {
        let dir = self.trial_dir(record.id);
        fs::create_dir_all(&dir)?;

        write_png(&self.artifact_path(record.id), image)?;

        let sidecar = serde_json::to_string_pretty(record)?;
        fs::write(dir.join(SIDECAR_FILE), sidecar)?;

        self.table.push(record.clone());
        Ok(())
    }

    pub fn table(&self) -> &MasterTable {
        &self.table
    }

    pub fn master_table_path(&self) -> PathBuf {
        self.root.join(MASTER_TABLE_FILE)
    }

    /// Flush the complete master table to its CSV artifact. Idempotent;
    /// repeated calls after the first are no-ops.
    pub fn finalize(&mut self) -> Result<PathBuf> {
        let path = self.master_table_path();
        if self.finalized {
            return Ok(path);
        }

        let mut writer = csv::Writer::from_path(&path)?;
        for record in self.table.records() {
            writer.serialize(MasterRow::from(record))?;
        }
        writer.flush()?;

        self.finalized = true;
        Ok(path)
    }
}

/// Write a grayscale image as PNG
fn write_png(path: &Path, image: &GrayImage) -> Result<()> {
    let buffer: image::ImageBuffer<image::Luma<u8>, Vec<u8>> =
        image::ImageBuffer::from_raw(image.width, image.height, image.data.clone())
            .ok_or_else(|| Error::Other("image buffer size mismatch".to_string()))?;
    buffer.save(path)?;
    Ok(())
}

/// Read a master table back from its CSV artifact. Artifact paths are
/// reconstructed from the table's location and the trial ids.
pub fn load_master_table<P: AsRef<Path>>(path: P) -> Result<MasterTable> {
    let path = path.as_ref();
    let run_dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut reader = csv::Reader::from_path(path)?;
    let mut table = MasterTable::new();
    for row in reader.deserialize::<MasterRow>() {
        let row = row?;
        table.push(ExperimentRecord {
            artifact_path: run_dir
                .join(format!("trial_{:04}", row.id))
                .join(ARTIFACT_FILE),
            id: row.id,
            source_image: row.source_image,
            clip_limit: row.clip_limit,
            tile_size: row.tile_size,
            metrics: QualityMetrics {
                entropy: row.entropy,
                local_contrast: row.local_contrast,
                edge_sharpness: row.edge_sharpness,
                michelson_contrast: row.michelson_contrast,
            },
        });
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_record(id: u32) -> ExperimentRecord {
        ExperimentRecord {
            id,
            source_image: "scan.png".to_string(),
            clip_limit: 1.5,
            tile_size: 16,
            metrics: QualityMetrics {
                entropy: 6.5,
                local_contrast: 12.25,
                edge_sharpness: 30.0,
                michelson_contrast: 0.9,
            },
            artifact_path: PathBuf::new(),
        }
    }

    fn test_image() -> GrayImage {
        GrayImage::from_raw(4, 4, (0..16).map(|i| i * 16).collect()).unwrap()
    }

    #[test]
    fn persist_writes_artifact_and_sidecar() {
        let dir = tempdir().unwrap();
        let mut store = TraceabilityStore::create(dir.path().join("run")).unwrap();

        let mut record = test_record(1);
        record.artifact_path = store.artifact_path(1);
        store.persist(&record, &test_image()).unwrap();

        assert!(store.artifact_path(1).exists());
        assert!(store.trial_dir(1).join(SIDECAR_FILE).exists());
        assert_eq!(store.table().len(), 1);
    }

    #[test]
    fn trial_dirs_are_zero_padded() {
        let dir = tempdir().unwrap();
        let store = TraceabilityStore::create(dir.path()).unwrap();
        assert!(store.trial_dir(7).ends_with("trial_0007"));
        assert!(store.trial_dir(1234).ends_with("trial_1234"));
    }

    #[test]
    fn finalize_round_trips_the_table() {
        let dir = tempdir().unwrap();
        let mut store = TraceabilityStore::create(dir.path()).unwrap();

        for id in [1, 2, 5] {
            let mut record = test_record(id);
            record.artifact_path = store.artifact_path(id);
            store.persist(&record, &test_image()).unwrap();
        }
        let csv_path = store.finalize().unwrap();

        let loaded = load_master_table(&csv_path).unwrap();
        assert_eq!(loaded.len(), 3);
        let ids: Vec<u32> = loaded.records().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 5]);
        assert_eq!(loaded.records()[0].metrics.entropy, 6.5);
        assert_eq!(
            loaded.records()[2].artifact_path,
            store.artifact_path(5)
        );
    }

    #[test]
    fn finalize_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut store = TraceabilityStore::create(dir.path()).unwrap();
        let mut record = test_record(1);
        record.artifact_path = store.artifact_path(1);
        store.persist(&record, &test_image()).unwrap();

        let first = store.finalize().unwrap();
        let second = store.finalize().unwrap();
        assert_eq!(first, second);
        assert_eq!(load_master_table(&first).unwrap().len(), 1);
    }
}
