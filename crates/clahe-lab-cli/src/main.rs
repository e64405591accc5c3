use clahe_lab_cli::{parse_clip_limits, parse_tile_sizes};
use clahe_lab_core::config::LabConfig;
use clahe_lab_core::decoders::{decode_grayscale, load_sources};
use clahe_lab_core::driver::{run_sweep, run_sweep_parallel};
use clahe_lab_core::enhance::Clahe;
use clahe_lab_core::grid::ParameterGrid;
use clahe_lab_core::metrics::compute_metrics;
use clahe_lab_core::models::MetricKind;
use clahe_lab_core::report::{
    print_shortlist, print_summary_statistics, write_comparisons, write_optimal_json, write_report,
};
use clahe_lab_core::selection::{preselect, select_optimal};
use clahe_lab_core::store::{load_master_table, TraceabilityStore, MASTER_TABLE_FILE};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clahe-lab")]
#[command(version, about = "CLAHE parameter sweep and analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the parameter sweep over image(s)
    Sweep {
        /// Input file or directory
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Run directory for trial artifacts and the master table
        #[arg(short, long, value_name = "DIR", default_value = "results")]
        out: PathBuf,

        /// Clip limit candidates (comma-separated, overrides config)
        #[arg(long, value_name = "A,B,C")]
        clip_limits: Option<String>,

        /// Tile size candidates in pixels (comma-separated, overrides config)
        #[arg(long, value_name = "A,B,C")]
        tile_sizes: Option<String>,

        /// Number of parallel threads
        #[arg(short = 'j', long, value_name = "N")]
        threads: Option<usize>,

        /// Evaluate trials in parallel
        #[arg(long)]
        parallel: bool,

        /// Config file path (skips the default search)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Rank a finished run and produce the analysis report
    Analyze {
        /// Run directory produced by the sweep
        #[arg(value_name = "RESULTS_DIR")]
        results_dir: PathBuf,

        /// Ranking metric: entropy, local_contrast, edge_sharpness
        /// or michelson_contrast
        #[arg(short, long, value_name = "METRIC")]
        metric: Option<String>,

        /// Shortlist size (overrides config)
        #[arg(long, value_name = "N")]
        top: Option<usize>,

        /// Number of comparison images to render (overrides config)
        #[arg(long, value_name = "N")]
        report_top: Option<usize>,

        /// Directory of the original inputs, enables side-by-side
        /// comparison images
        #[arg(long, value_name = "DIR")]
        input_dir: Option<PathBuf>,

        /// Config file path (skips the default search)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Compute the quality metrics of a single image
    Metrics {
        /// Input image
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sweep {
            input,
            out,
            clip_limits,
            tile_sizes,
            threads,
            parallel,
            config,
        } => cmd_sweep(input, out, clip_limits, tile_sizes, threads, parallel, config),

        Commands::Analyze {
            results_dir,
            metric,
            top,
            report_top,
            input_dir,
            config,
        } => cmd_analyze(results_dir, metric, top, report_top, input_dir, config),

        Commands::Metrics { image } => cmd_metrics(image),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<PathBuf>) -> Result<LabConfig, String> {
    match path {
        Some(path) => LabConfig::load(path).map_err(|e| e.to_string()),
        None => LabConfig::discover().map_err(|e| e.to_string()),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_sweep(
    input: PathBuf,
    out: PathBuf,
    clip_limits: Option<String>,
    tile_sizes: Option<String>,
    threads: Option<usize>,
    parallel: bool,
    config: Option<PathBuf>,
) -> Result<(), String> {
    let config = load_config(config)?;

    let mut grid: ParameterGrid = config.grid.into();
    if let Some(list) = clip_limits {
        grid.clip_limits = parse_clip_limits(&list)?;
    }
    if let Some(list) = tile_sizes {
        grid.tile_sizes = parse_tile_sizes(&list)?;
    }

    // Configure thread pool if specified
    if let Some(num_threads) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| format!("Failed to configure thread pool: {}", e))?;
        println!("Using {} threads for parallel processing", num_threads);
    }

    let images = load_sources(&input).map_err(|e| e.to_string())?;
    if images.is_empty() {
        return Err(format!("No supported images found in {}", input.display()));
    }
    println!(
        "Sweeping {} image(s) over {} grid points ({} trials)",
        images.len(),
        grid.len(),
        images.len() * grid.len()
    );

    let mut store = TraceabilityStore::create(&out).map_err(|e| e.to_string())?;
    let summary = if parallel {
        run_sweep_parallel(&images, &grid, &Clahe, &mut store)
    } else {
        run_sweep(&images, &grid, &Clahe, &mut store)
    }
    .map_err(|e| e.to_string())?;

    let table_path = store.finalize().map_err(|e| e.to_string())?;
    print_summary_statistics(store.table());
    println!("Master table written to {}", table_path.display());

    if !summary.skipped.is_empty() {
        println!("Skipped trials:");
        for skipped in &summary.skipped {
            println!(
                "  trial {:04} (image={}, clip={}, tile={}): {}",
                skipped.id,
                skipped.source_image,
                skipped.point.clip_limit,
                skipped.point.tile_size,
                skipped.reason
            );
        }
    }
    Ok(())
}

fn cmd_analyze(
    results_dir: PathBuf,
    metric: Option<String>,
    top: Option<usize>,
    report_top: Option<usize>,
    input_dir: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<(), String> {
    let config = load_config(config)?;

    let primary_metric = match metric {
        Some(name) => name.parse::<MetricKind>().map_err(|e| e.to_string())?,
        None => config.analysis.primary_metric,
    };
    let top = top.unwrap_or(config.analysis.preselect_top_n);
    let report_top = report_top.unwrap_or(config.analysis.report_top_n).min(top);

    let table_path = results_dir.join(MASTER_TABLE_FILE);
    let table = load_master_table(&table_path)
        .map_err(|e| format!("Failed to load {}: {}", table_path.display(), e))?;
    if table.is_empty() {
        return Err("Master table holds no trials".to_string());
    }

    let shortlist = preselect(&table, primary_metric, top);
    print_shortlist(&table, &shortlist);

    // The written report and the comparison images cover the smaller
    // reporting shortlist; ranking and selection use the full one.
    let reported = preselect(&table, primary_metric, report_top);
    let report_path =
        write_report(&results_dir, &table, &reported).map_err(|e| e.to_string())?;
    println!("Report written to {}", report_path.display());

    if let Some(input_dir) = input_dir {
        let written =
            write_comparisons(&results_dir, &reported, &input_dir).map_err(|e| e.to_string())?;
        println!("Wrote {} comparison image(s)", written.len());
    }

    let optimal = select_optimal(&shortlist).map_err(|e| e.to_string())?;
    let optimal_path = write_optimal_json(&results_dir, &optimal).map_err(|e| e.to_string())?;
    println!(
        "Optimal: clip={}, tile={} (trial {:04}), written to {}",
        optimal.clip_limit_optimal,
        optimal.tile_size_optimal,
        optimal.id,
        optimal_path.display()
    );
    Ok(())
}

fn cmd_metrics(image: PathBuf) -> Result<(), String> {
    let decoded = decode_grayscale(&image).map_err(|e| e.to_string())?;
    let metrics = compute_metrics(&decoded).map_err(|e| e.to_string())?;

    println!("{} ({}x{})", image.display(), decoded.width, decoded.height);
    for kind in MetricKind::ALL {
        println!("  {:<20} {:.4}", format!("{}:", kind), metrics.get(kind));
    }
    Ok(())
}
