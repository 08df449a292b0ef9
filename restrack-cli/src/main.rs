//! restrack: hits-to-track clustering and path minimization from the
//! command line.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

mod format;

use clap::{Parser, Subcommand, ValueEnum};
use restrack_algorithms::{HitsToTrackAlgorithm, Pipeline, PipelineConfig};
use restrack_core::{Hits, TrackEvent};
use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(#[from] restrack_core::Error),

    #[error("Logger error: {0}")]
    Logger(#[from] log::SetLoggerError),
}

/// Clustering algorithm selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Algorithm {
    /// Connected cells of a spatial mesh (fast, default)
    Mesh,
    /// Connected components under a cluster distance (exact, O(n²))
    Radius,
}

impl From<Algorithm> for HitsToTrackAlgorithm {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Mesh => Self::Mesh,
            Algorithm::Radius => Self::Radius,
        }
    }
}

/// TPC hit clustering and track path minimization.
#[derive(Parser)]
#[command(name = "restrack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster hits into tracks and refine them
    Process {
        /// Input JSON file with an array of events
        input: PathBuf,

        /// Output JSON file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pipeline configuration JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Clustering algorithm, overrides the configuration
        #[arg(short, long, value_enum)]
        algorithm: Option<Algorithm>,

        /// Mesh cell size (mm), overrides the configuration
        #[arg(long)]
        cell_resolution: Option<f64>,

        /// Radius clustering distance (mm), overrides the configuration
        #[arg(long)]
        cluster_distance: Option<f64>,

        /// Enable reduction, path minimization and detachment with
        /// default parameters when the configuration leaves them out
        #[arg(long)]
        refine: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print a template pipeline configuration
    Config,

    /// Show information about an input file
    Info {
        /// Input JSON file
        input: PathBuf,
    },

    /// Benchmark the clustering algorithms
    Benchmark {
        /// Input JSON file
        input: PathBuf,

        /// Number of iterations
        #[arg(short, long, default_value = "3")]
        iterations: usize,
    },
}

fn init_logger(verbose: bool) -> Result<()> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;
    Ok(())
}

fn load_events(path: &Path) -> Result<Vec<Hits>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(format::read_events(reader)?)
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            let reader = BufReader::new(File::open(path)?);
            Ok(serde_json::from_reader(reader)?)
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            output,
            config,
            algorithm,
            cell_resolution,
            cluster_distance,
            refine,
            verbose,
        } => {
            init_logger(verbose)?;

            let mut config = load_config(config.as_deref())?;
            if let Some(algorithm) = algorithm {
                config.algorithm = algorithm.into();
            }
            if let Some(cell_resolution) = cell_resolution {
                config.mesh.cell_resolution = cell_resolution;
            }
            if let Some(cluster_distance) = cluster_distance {
                config.radius.cluster_distance = cluster_distance;
            }
            if refine {
                let defaults = PipelineConfig::default().with_default_refinement();
                config.reduction = config.reduction.or(defaults.reduction);
                config.path = config.path.or(defaults.path);
                config.detach = config.detach.or(defaults.detach);
            }
            log::debug!("Configuration: {:?}", config);

            // Fail on a bad configuration before reading any event.
            let pipeline = Pipeline::new(&config)?;
            let events = load_events(&input)?;
            log::info!(
                "Processing {} events from {} with {} clustering",
                events.len(),
                input.display(),
                pipeline.clustering_name()
            );

            let start = Instant::now();
            let tracks = pipeline.process_events(&events)?;
            let elapsed = start.elapsed();

            let total_hits: usize = events.iter().map(Hits::len).sum();
            let total_tracks: usize = tracks.iter().map(TrackEvent::number_of_tracks).sum();
            let failed = tracks.iter().filter(|event| !event.is_ok()).count();
            log::info!(
                "Processed {} hits into {} tracks in {:.2}s",
                total_hits,
                total_tracks,
                elapsed.as_secs_f64()
            );
            if failed > 0 {
                log::warn!("{} events have tracks that kept their input order", failed);
            }

            match output {
                Some(path) => {
                    let mut writer = BufWriter::new(File::create(&path)?);
                    format::write_events(&mut writer, &tracks)?;
                    writer.flush()?;
                    log::info!("Wrote output to {}", path.display());
                }
                None => {
                    let stdout = std::io::stdout();
                    let mut writer = stdout.lock();
                    format::write_events(&mut writer, &tracks)?;
                    writeln!(writer)?;
                }
            }
        }

        Commands::Config => {
            let template = PipelineConfig::default().with_default_refinement();
            println!("{}", serde_json::to_string_pretty(&template)?);
        }

        Commands::Info { input } => {
            let events = load_events(&input)?;
            println!("File: {}", input.display());
            println!("Events: {}", events.len());

            let mut xz = 0usize;
            let mut yz = 0usize;
            let mut xyz = 0usize;
            let mut energy = 0.0;
            let mut largest = 0usize;
            for hits in &events {
                let split = hits.split_by_kind()?;
                xz += split.xz.len();
                yz += split.yz.len();
                xyz += split.xyz.len();
                energy += hits.total_energy();
                largest = largest.max(hits.len());
            }
            println!("Hits: {} (XZ {}, YZ {}, XYZ {})", xz + yz + xyz, xz, yz, xyz);
            println!("Largest event: {} hits", largest);
            println!("Total energy: {:.3}", energy);
        }

        Commands::Benchmark { input, iterations } => {
            let events = load_events(&input)?;
            let total_hits: usize = events.iter().map(Hits::len).sum();
            println!(
                "Benchmarking with {} events ({} hits), {} iterations",
                events.len(),
                total_hits,
                iterations
            );
            println!(
                "{:<10} | {:<15} | {:<15} | {:<15}",
                "Algorithm", "Mean Time (ms)", "Min Time (ms)", "Max Time (ms)"
            );
            println!("{:-<65}", "");

            for (algorithm, name) in [
                (HitsToTrackAlgorithm::Mesh, "Mesh"),
                (HitsToTrackAlgorithm::Radius, "Radius"),
            ] {
                let pipeline = Pipeline::new(&PipelineConfig::default().with_algorithm(algorithm))?;

                // Warmup
                pipeline.process_events(&events)?;

                let mut times = Vec::with_capacity(iterations);
                for _ in 0..iterations {
                    let start = Instant::now();
                    pipeline.process_events(&events)?;
                    times.push(start.elapsed().as_secs_f64() * 1000.0);
                }

                let min_time = times.iter().fold(f64::INFINITY, |a, &b| a.min(b));
                let max_time = times.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
                let mean_time = times.iter().sum::<f64>() / times.len().max(1) as f64;

                println!(
                    "{:<10} | {:<15.2} | {:<15.2} | {:<15.2}",
                    name, mean_time, min_time, max_time
                );
            }
        }
    }

    Ok(())
}
