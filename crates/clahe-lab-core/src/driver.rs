//! Sweep driver
//!
//! Walks every (image, grid point) pair in enumeration order, runs the
//! enhancement operator and the metrics engine, and hands completed
//! trials to the traceability store. Trial ids come from one monotonic
//! counter per run, shared across all images, and every attempt consumes
//! an id whether or not it succeeds, so the grid-order/id correspondence
//! survives failures.

use crate::decoders::SourceImage;
use crate::enhance::Enhance;
use crate::error::Result;
use crate::grid::ParameterGrid;
use crate::metrics::compute_metrics;
use crate::models::{ExperimentRecord, ParameterPoint, QualityMetrics};
use crate::store::TraceabilityStore;
use rayon::prelude::*;

/// A trial whose enhancement failed. No record or artifact exists for
/// it; the id is retired.
#[derive(Debug, Clone)]
pub struct SkippedTrial {
    pub id: u32,
    pub source_image: String,
    pub point: ParameterPoint,
    pub reason: String,
}

/// Outcome counts of one sweep
#[derive(Debug, Default)]
pub struct SweepSummary {
    /// Trials attempted (equals images x grid points)
    pub attempted: usize,
    /// Trials persisted to the store
    pub completed: usize,
    /// Trials whose metrics were zeroed after a computation failure
    pub metric_failures: usize,
    /// Trials skipped because enhancement failed
    pub skipped: Vec<SkippedTrial>,
}

/// One pre-assigned unit of work
struct Trial<'a> {
    id: u32,
    source: &'a SourceImage,
    point: ParameterPoint,
}

/// Result of evaluating one trial, before persistence
enum Evaluated {
    Completed {
        record: ExperimentRecord,
        image: crate::decoders::GrayImage,
        metric_failed: bool,
    },
    Skipped(SkippedTrial),
}

/// Enumerate all trials in image-then-grid order with dense ids from 1
fn plan_trials<'a>(images: &'a [SourceImage], grid: &ParameterGrid) -> Vec<Trial<'a>> {
    let mut trials = Vec::with_capacity(images.len() * grid.len());
    let mut id = 0u32;
    for source in images {
        for point in grid.points() {
            id += 1;
            trials.push(Trial { id, source, point });
        }
    }
    trials
}

/// Evaluate one trial: enhance, then measure. Metric failures never
/// lose the trial; the record keeps zeroed metrics and is flagged.
fn evaluate<E: Enhance>(trial: &Trial<'_>, enhancer: &E, store: &TraceabilityStore) -> Evaluated {
    let enhanced = match enhancer.enhance(
        &trial.source.image,
        trial.point.clip_limit,
        trial.point.tile_size,
    ) {
        Ok(image) => image,
        Err(e) => {
            let e = crate::error::Error::EnhancementFailure {
                id: trial.id,
                clip_limit: trial.point.clip_limit,
                tile_size: trial.point.tile_size,
                reason: e.to_string(),
            };
            log::warn!("trial skipped (image={}): {}", trial.source.name, e);
            return Evaluated::Skipped(SkippedTrial {
                id: trial.id,
                source_image: trial.source.name.clone(),
                point: trial.point,
                reason: e.to_string(),
            });
        }
    };

    let (metrics, metric_failed) = match compute_metrics(&enhanced) {
        Ok(metrics) => (metrics, false),
        Err(e) => {
            let e = crate::error::Error::MetricComputationFailure {
                id: trial.id,
                reason: e.to_string(),
            };
            log::warn!(
                "trial recorded with zeroed metrics (image={}, clip={}, tile={}): {}",
                trial.source.name,
                trial.point.clip_limit,
                trial.point.tile_size,
                e
            );
            (QualityMetrics::zeroed(), true)
        }
    };

    Evaluated::Completed {
        record: ExperimentRecord {
            id: trial.id,
            source_image: trial.source.name.clone(),
            clip_limit: trial.point.clip_limit,
            tile_size: trial.point.tile_size,
            metrics,
            artifact_path: store.artifact_path(trial.id),
        },
        image: enhanced,
        metric_failed,
    }
}

/// Persist evaluated trials in id order and tally the summary
fn persist_all(
    evaluated: Vec<Evaluated>,
    store: &mut TraceabilityStore,
    attempted: usize,
) -> Result<SweepSummary> {
    let mut summary = SweepSummary {
        attempted,
        ..SweepSummary::default()
    };

    for outcome in evaluated {
        match outcome {
            Evaluated::Completed {
                record,
                image,
                metric_failed,
            } => {
                store.persist(&record, &image)?;
                summary.completed += 1;
                if metric_failed {
                    summary.metric_failures += 1;
                }
            }
            Evaluated::Skipped(skipped) => summary.skipped.push(skipped),
        }
    }
    Ok(summary)
}

/// Run the sweep sequentially: one trial is enhanced, measured and
/// persisted before the next begins.
pub fn run_sweep<E: Enhance>(
    images: &[SourceImage],
    grid: &ParameterGrid,
    enhancer: &E,
    store: &mut TraceabilityStore,
) -> Result<SweepSummary> {
    let trials = plan_trials(images, grid);
    let total = trials.len();
    eprintln!("[SWEEP] Running {} trials sequentially...", total);

    let mut summary = SweepSummary {
        attempted: total,
        ..SweepSummary::default()
    };

    for trial in &trials {
        match evaluate(trial, enhancer, store) {
            Evaluated::Completed {
                record,
                image,
                metric_failed,
            } => {
                store.persist(&record, &image)?;
                summary.completed += 1;
                if metric_failed {
                    summary.metric_failures += 1;
                }
            }
            Evaluated::Skipped(skipped) => summary.skipped.push(skipped),
        }
        if trial.id as usize % 10 == 0 || trial.id as usize == total {
            eprintln!("[SWEEP] Progress: {}/{}", trial.id, total);
        }
    }

    eprintln!(
        "[SWEEP] Complete: {} persisted, {} skipped, {} metric failures",
        summary.completed,
        summary.skipped.len(),
        summary.metric_failures
    );
    Ok(summary)
}

/// Run the sweep across a rayon pool. Ids are assigned up front from the
/// enumeration, trials evaluate independently, and persistence happens
/// in id order through the single store writer, so the resulting table
/// is identical to a sequential run.
pub fn run_sweep_parallel<E: Enhance + Sync>(
    images: &[SourceImage],
    grid: &ParameterGrid,
    enhancer: &E,
    store: &mut TraceabilityStore,
) -> Result<SweepSummary> {
    let trials = plan_trials(images, grid);
    let total = trials.len();
    eprintln!("[SWEEP] Running {} trials in parallel...", total);

    let shared_store: &TraceabilityStore = store;
    let mut evaluated: Vec<(u32, Evaluated)> = trials
        .par_iter()
        .map(|trial| (trial.id, evaluate(trial, enhancer, shared_store)))
        .collect();
    evaluated.sort_by_key(|(id, _)| *id);

    let summary = persist_all(
        evaluated.into_iter().map(|(_, e)| e).collect(),
        store,
        total,
    )?;

    eprintln!(
        "[SWEEP] Complete: {} persisted, {} skipped, {} metric failures",
        summary.completed,
        summary.skipped.len(),
        summary.metric_failures
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoders::GrayImage;
    use crate::enhance::Clahe;
    use crate::error::Error;
    use tempfile::tempdir;

    fn synthetic_source(name: &str) -> SourceImage {
        let data: Vec<u8> = (0..32u32 * 32).map(|i| (i * 5 % 256) as u8).collect();
        SourceImage {
            name: name.to_string(),
            image: GrayImage::from_raw(32, 32, data).unwrap(),
        }
    }

    fn small_grid() -> ParameterGrid {
        ParameterGrid::new(vec![1.0, 2.0], vec![8, 16])
    }

    /// Fails on one specific grid point, succeeds everywhere else
    struct FailsOn {
        clip_limit: f64,
        tile_size: u32,
    }

    impl Enhance for FailsOn {
        fn enhance(&self, image: &GrayImage, clip_limit: f64, tile_size: u32) -> Result<GrayImage> {
            if clip_limit == self.clip_limit && tile_size == self.tile_size {
                return Err(Error::Other("injected failure".to_string()));
            }
            Clahe.enhance(image, clip_limit, tile_size)
        }
    }

    /// Produces an empty image so metric computation fails
    struct EmptyOutput;

    impl Enhance for EmptyOutput {
        fn enhance(&self, _: &GrayImage, _: f64, _: u32) -> Result<GrayImage> {
            GrayImage::from_raw(0, 0, vec![])
        }
    }

    #[test]
    fn sweep_produces_records_in_grid_order() {
        let dir = tempdir().unwrap();
        let mut store = TraceabilityStore::create(dir.path()).unwrap();
        let images = vec![synthetic_source("a.png")];

        let summary = run_sweep(&images, &small_grid(), &Clahe, &mut store).unwrap();
        assert_eq!(summary.attempted, 4);
        assert_eq!(summary.completed, 4);
        assert!(summary.skipped.is_empty());

        let rows: Vec<(u32, f64, u32)> = store
            .table()
            .records()
            .iter()
            .map(|r| (r.id, r.clip_limit, r.tile_size))
            .collect();
        assert_eq!(
            rows,
            vec![(1, 1.0, 8), (2, 1.0, 16), (3, 2.0, 8), (4, 2.0, 16)]
        );
    }

    #[test]
    fn ids_keep_growing_across_images() {
        let dir = tempdir().unwrap();
        let mut store = TraceabilityStore::create(dir.path()).unwrap();
        let images = vec![synthetic_source("a.png"), synthetic_source("b.png")];

        run_sweep(&images, &small_grid(), &Clahe, &mut store).unwrap();

        let ids: Vec<u32> = store.table().records().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(store.table().records()[4].source_image, "b.png");
    }

    #[test]
    fn failed_enhancement_skips_trial_but_keeps_its_id_retired() {
        let dir = tempdir().unwrap();
        let mut store = TraceabilityStore::create(dir.path()).unwrap();
        let images = vec![synthetic_source("a.png")];
        let enhancer = FailsOn {
            clip_limit: 2.0,
            tile_size: 8,
        };

        let summary = run_sweep(&images, &small_grid(), &enhancer, &mut store).unwrap();
        assert_eq!(summary.completed, 3);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].id, 3);

        let ids: Vec<u32> = store.table().records().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 4]);
        assert!(!store.artifact_path(3).exists());
    }

    #[test]
    fn metric_failure_records_zeroed_trial() {
        let dir = tempdir().unwrap();
        let mut store = TraceabilityStore::create(dir.path()).unwrap();
        let images = vec![synthetic_source("a.png")];

        let summary = run_sweep(&images, &small_grid(), &EmptyOutput, &mut store).unwrap();
        assert_eq!(summary.completed, 4);
        assert_eq!(summary.metric_failures, 4);
        assert!(store
            .table()
            .records()
            .iter()
            .all(|r| r.metrics == QualityMetrics::zeroed()));
    }

    #[test]
    fn parallel_sweep_matches_sequential_table() {
        let images = vec![synthetic_source("a.png"), synthetic_source("b.png")];
        let grid = small_grid();

        let seq_dir = tempdir().unwrap();
        let mut seq_store = TraceabilityStore::create(seq_dir.path()).unwrap();
        run_sweep(&images, &grid, &Clahe, &mut seq_store).unwrap();

        let par_dir = tempdir().unwrap();
        let mut par_store = TraceabilityStore::create(par_dir.path()).unwrap();
        run_sweep_parallel(&images, &grid, &Clahe, &mut par_store).unwrap();

        let strip = |store: &TraceabilityStore| -> Vec<(u32, String, f64, u32, QualityMetrics)> {
            store
                .table()
                .records()
                .iter()
                .map(|r| {
                    (
                        r.id,
                        r.source_image.clone(),
                        r.clip_limit,
                        r.tile_size,
                        r.metrics,
                    )
                })
                .collect()
        };
        assert_eq!(strip(&seq_store), strip(&par_store));
    }

    #[test]
    fn every_persisted_record_has_its_artifact_on_disk() {
        let dir = tempdir().unwrap();
        let mut store = TraceabilityStore::create(dir.path()).unwrap();
        let images = vec![synthetic_source("a.png")];

        run_sweep(&images, &small_grid(), &Clahe, &mut store).unwrap();
        for record in store.table().records() {
            assert!(record.artifact_path.exists(), "{:?}", record.artifact_path);
        }
    }
}
