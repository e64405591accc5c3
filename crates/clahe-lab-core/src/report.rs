//! Report generation for a finished run
//!
//! Consumes the shortlist plus the persisted artifacts and produces a
//! textual ranking report, side-by-side comparison images and the final
//! optimal-parameters JSON. Everything here is derived presentation; the
//! master table stays untouched.

use crate::decoders::{decode_grayscale, GrayImage};
use crate::error::{Error, Result};
use crate::models::{Grade, MasterTable, MetricKind, OptimalResult, Shortlist};
use crate::selection::qualify;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the final optimal-parameters record
pub const OPTIMAL_FILE: &str = "optimal.json";

/// File name of the textual ranking report
pub const REPORT_FILE: &str = "report.txt";

/// Gap in pixels between the two halves of a comparison image
const COMPARISON_GAP: u32 = 8;

/// Write the ranking report for a shortlist into `run_dir/report/`
pub fn write_report(run_dir: &Path, table: &MasterTable, shortlist: &Shortlist) -> Result<PathBuf> {
    let report_dir = run_dir.join("report");
    fs::create_dir_all(&report_dir)?;

    let mut text = String::new();
    let _ = writeln!(text, "{:=<78}", "");
    let _ = writeln!(text, "CLAHE SWEEP RANKING REPORT");
    let _ = writeln!(text, "{:=<78}", "");
    let _ = writeln!(text, "Trials analyzed: {}", table.len());
    let _ = writeln!(
        text,
        "Ranked by: {} (descending), top {}",
        shortlist.primary_metric,
        shortlist.len()
    );

    for (rank, record) in shortlist.entries.iter().enumerate() {
        let _ = writeln!(text, "\n{}. TRIAL {:04}", rank + 1, record.id);
        let _ = writeln!(text, "   Source image: {}", record.source_image);
        let _ = writeln!(
            text,
            "   Parameters:   clip limit = {:.2}, tile size = {} x {}",
            record.clip_limit, record.tile_size, record.tile_size
        );
        let _ = writeln!(text, "   Metrics:");
        for metric in MetricKind::ALL {
            let _ = writeln!(
                text,
                "     {:<20} {:.4}",
                format!("{}:", metric),
                record.metrics.get(metric)
            );
        }
        let _ = writeln!(text, "   Assessment:");
        for tag in qualify(record, table) {
            let grade = match tag.grade {
                Grade::High => "high (top quartile of this run)",
                Grade::Moderate => "moderate",
            };
            let _ = writeln!(text, "     {:<20} {}", format!("{}:", tag.metric), grade);
        }
    }
    let _ = writeln!(text, "\n{:=<78}", "");

    let path = report_dir.join(REPORT_FILE);
    fs::write(&path, text)?;
    Ok(path)
}

/// Serialize the winning configuration as the run's final output
pub fn write_optimal_json(run_dir: &Path, optimal: &OptimalResult) -> Result<PathBuf> {
    let path = run_dir.join(OPTIMAL_FILE);
    fs::write(&path, serde_json::to_string_pretty(optimal)?)?;
    Ok(path)
}

/// Write one side-by-side comparison PNG per shortlisted trial into
/// `run_dir/report/`. A row whose artifact is missing is reported and
/// skipped; the remaining comparisons are still produced.
pub fn write_comparisons(
    run_dir: &Path,
    shortlist: &Shortlist,
    originals_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let report_dir = run_dir.join("report");
    fs::create_dir_all(&report_dir)?;

    let mut written = Vec::new();
    for record in &shortlist.entries {
        if !record.artifact_path.exists() {
            let e = Error::MissingArtifact {
                id: record.id,
                path: record.artifact_path.clone(),
            };
            log::warn!("comparison skipped: {}", e);
            continue;
        }

        let original = match decode_grayscale(originals_dir.join(&record.source_image)) {
            Ok(img) => img,
            Err(e) => {
                log::warn!(
                    "comparison for trial {} skipped, original {} unreadable: {}",
                    record.id,
                    record.source_image,
                    e
                );
                continue;
            }
        };
        let enhanced = match decode_grayscale(&record.artifact_path) {
            Ok(img) => img,
            Err(e) => {
                log::warn!(
                    "comparison for trial {} skipped, artifact {} undecodable: {}",
                    record.id,
                    record.artifact_path.display(),
                    e
                );
                continue;
            }
        };

        let montage = side_by_side(&original, &enhanced);
        let path = report_dir.join(format!("comparison_trial_{:04}.png", record.id));
        let buffer: image::ImageBuffer<image::Luma<u8>, Vec<u8>> =
            image::ImageBuffer::from_raw(montage.width, montage.height, montage.data)
                .ok_or_else(|| Error::Other("montage buffer size mismatch".to_string()))?;
        buffer.save(&path)?;
        written.push(path);
    }
    Ok(written)
}

/// Compose two images horizontally with a white gap
fn side_by_side(left: &GrayImage, right: &GrayImage) -> GrayImage {
    let width = left.width + COMPARISON_GAP + right.width;
    let height = left.height.max(right.height);
    let mut data = vec![255u8; (width * height) as usize];

    for y in 0..left.height {
        for x in 0..left.width {
            data[(y * width + x) as usize] = left.data[(y * left.width + x) as usize];
        }
    }
    let offset = left.width + COMPARISON_GAP;
    for y in 0..right.height {
        for x in 0..right.width {
            data[(y * width + offset + x) as usize] = right.data[(y * right.width + x) as usize];
        }
    }

    GrayImage {
        width,
        height,
        data,
    }
}

/// Print per-metric summary statistics for a finished sweep, in the
/// spirit of a dataframe describe()
pub fn print_summary_statistics(table: &MasterTable) {
    if table.is_empty() {
        eprintln!("[SWEEP] No trials to summarize");
        return;
    }

    eprintln!("[SWEEP] Summary over {} trials:", table.len());
    eprintln!(
        "  {:<20} {:>10} {:>10} {:>10}",
        "metric", "mean", "min", "max"
    );
    for metric in MetricKind::ALL {
        let values = table.metric_values(metric);
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        eprintln!(
            "  {:<20} {:>10.4} {:>10.4} {:>10.4}",
            metric, mean, min, max
        );
    }
}

/// Print the ranked shortlist to stdout
pub fn print_shortlist(table: &MasterTable, shortlist: &Shortlist) {
    println!("{:=<78}", "");
    println!(
        "TOP {} TRIALS BY {}",
        shortlist.len(),
        shortlist.primary_metric
    );
    println!("{:=<78}", "");

    for (rank, record) in shortlist.entries.iter().enumerate() {
        println!(
            "\n#{} trial {:04}: clip={:.2}, tile={} ({})",
            rank + 1,
            record.id,
            record.clip_limit,
            record.tile_size,
            record.source_image
        );
        for metric in MetricKind::ALL {
            println!("   {:<20} {:.4}", format!("{}:", metric), record.metrics.get(metric));
        }
        let high: Vec<&str> = qualify(record, table)
            .into_iter()
            .filter(|t| t.grade == Grade::High)
            .map(|t| t.metric.as_str())
            .collect();
        if !high.is_empty() {
            println!("   top quartile in: {}", high.join(", "));
        }
    }
    println!("\n{:=<78}", "");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExperimentRecord, QualityMetrics};
    use crate::selection::preselect;
    use tempfile::tempdir;

    fn record(id: u32, local_contrast: f64, artifact_path: PathBuf) -> ExperimentRecord {
        ExperimentRecord {
            id,
            source_image: "scan.png".to_string(),
            clip_limit: 2.5,
            tile_size: 16,
            metrics: QualityMetrics {
                entropy: 7.0,
                local_contrast,
                edge_sharpness: 20.0,
                michelson_contrast: 0.8,
            },
            artifact_path,
        }
    }

    fn save_png(path: &Path, width: u32, height: u32) {
        let buffer: image::ImageBuffer<image::Luma<u8>, Vec<u8>> =
            image::ImageBuffer::from_raw(width, height, vec![128u8; (width * height) as usize])
                .unwrap();
        buffer.save(path).unwrap();
    }

    #[test]
    fn report_lists_every_shortlisted_trial() {
        let dir = tempdir().unwrap();
        let table: MasterTable = vec![
            record(1, 3.0, PathBuf::new()),
            record(2, 5.0, PathBuf::new()),
        ]
        .into_iter()
        .collect();
        let shortlist = preselect(&table, MetricKind::LocalContrast, 2);

        let path = write_report(dir.path(), &table, &shortlist).unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains("TRIAL 0002"));
        assert!(text.contains("TRIAL 0001"));
        assert!(text.contains("clip limit = 2.50"));
    }

    #[test]
    fn optimal_json_round_trips() {
        let dir = tempdir().unwrap();
        let optimal = OptimalResult {
            clip_limit_optimal: 3.5,
            tile_size_optimal: 16,
            id: 12,
            metrics: QualityMetrics::zeroed(),
        };

        let path = write_optimal_json(dir.path(), &optimal).unwrap();
        let loaded: OptimalResult =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(loaded, optimal);
    }

    #[test]
    fn comparisons_skip_missing_artifacts() {
        let run = tempdir().unwrap();
        let originals = tempdir().unwrap();
        save_png(&originals.path().join("scan.png"), 6, 4);

        let present = run.path().join("trial_0001");
        fs::create_dir_all(&present).unwrap();
        let artifact = present.join("enhanced.png");
        save_png(&artifact, 6, 4);

        let table: MasterTable = vec![
            record(1, 5.0, artifact),
            record(2, 4.0, run.path().join("trial_0002").join("enhanced.png")),
        ]
        .into_iter()
        .collect();
        let shortlist = preselect(&table, MetricKind::LocalContrast, 2);

        let written = write_comparisons(run.path(), &shortlist, originals.path()).unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].ends_with("comparison_trial_0001.png"));
    }

    #[test]
    fn comparisons_skip_undecodable_artifacts() {
        let run = tempdir().unwrap();
        let originals = tempdir().unwrap();
        save_png(&originals.path().join("scan.png"), 6, 4);

        let good_dir = run.path().join("trial_0001");
        fs::create_dir_all(&good_dir).unwrap();
        let good = good_dir.join("enhanced.png");
        save_png(&good, 6, 4);

        let bad_dir = run.path().join("trial_0002");
        fs::create_dir_all(&bad_dir).unwrap();
        let bad = bad_dir.join("enhanced.png");
        fs::write(&bad, b"not a png").unwrap();

        let table: MasterTable = vec![record(1, 5.0, good), record(2, 4.0, bad)]
            .into_iter()
            .collect();
        let shortlist = preselect(&table, MetricKind::LocalContrast, 2);

        let written = write_comparisons(run.path(), &shortlist, originals.path()).unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].ends_with("comparison_trial_0001.png"));
    }

    #[test]
    fn report_covers_only_the_reporting_shortlist() {
        let dir = tempdir().unwrap();
        let table: MasterTable = (1..=6)
            .map(|id| record(id, id as f64, PathBuf::new()))
            .collect();
        let reported = preselect(&table, MetricKind::LocalContrast, 2);

        let path = write_report(dir.path(), &table, &reported).unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert_eq!(text.matches("TRIAL").count(), 2);
        assert!(text.contains("TRIAL 0006"));
        assert!(text.contains("TRIAL 0005"));
        assert!(!text.contains("TRIAL 0004"));
    }

    #[test]
    fn side_by_side_lays_out_both_halves() {
        let left = GrayImage::from_raw(2, 2, vec![0, 0, 0, 0]).unwrap();
        let right = GrayImage::from_raw(2, 3, vec![9; 6]).unwrap();
        let montage = side_by_side(&left, &right);

        assert_eq!(montage.width, 2 + COMPARISON_GAP + 2);
        assert_eq!(montage.height, 3);
        assert_eq!(montage.get_clamped(0, 0), 0);
        assert_eq!(montage.get_clamped((2 + COMPARISON_GAP) as i64, 0), 9);
        // gap stays white
        assert_eq!(montage.get_clamped(3, 0), 255);
    }
}
