//! Mecanum drivetrain simulation and tuning CLI.
//!
//! Provides four modes of operation:
//! - `simulate`: Replay one telemetry recording through the model and
//!   report the velocity tracking error
//! - `fit`: Gradient descent over recorded telemetry
//! - `search`: Random search over recorded telemetry
//! - `info`: Print workspace crate versions

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mecdrive_core::prelude::*;
use mecdrive_dynamics::prelude::*;
use mecdrive_fit::prelude::*;
use mecdrive_sim::prelude::*;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Mecanum drivetrain dynamics and parameter tuning.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay one recording through the model and print tracking error.
    Simulate {
        /// Telemetry recording (JSON).
        sample: PathBuf,

        /// Drive parameters (TOML); defaults to the nominal values.
        #[arg(short, long)]
        params: Option<PathBuf>,
    },

    /// Fit parameters to telemetry with gradient descent.
    Fit {
        /// Telemetry recording or directory of recordings.
        samples: PathBuf,

        /// Tuning configuration (TOML); defaults apply when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Initial parameters (TOML); defaults to the nominal values.
        #[arg(short, long)]
        params: Option<PathBuf>,

        /// Write the fitted parameters to this TOML file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fit parameters to telemetry with random search.
    Search {
        /// Telemetry recording or directory of recordings.
        samples: PathBuf,

        /// Number of trials.
        #[arg(short = 'n', long, default_value_t = 100)]
        trials: usize,

        /// Random seed.
        #[arg(short, long, default_value_t = 0)]
        seed: u64,

        /// Write the best parameters to this TOML file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print crate information.
    Info,
}

// ---------------------------------------------------------------------------
// Loading helpers
// ---------------------------------------------------------------------------

fn load_params(path: Option<&Path>) -> Result<DriveParameters, Box<dyn Error>> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        }
        None => Ok(DriveParameters::default()),
    }
}

/// Load one recording, or every `.json` recording in a directory.
fn load_samples(path: &Path) -> Result<Vec<DataSeries>, Box<dyn Error>> {
    let mut samples = Vec::new();
    if path.is_dir() {
        let mut entries: Vec<PathBuf> = std::fs::read_dir(path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        entries.sort();
        for entry in entries {
            samples.push(DataSeries::from_json_file(&entry)?);
        }
    } else {
        samples.push(DataSeries::from_json_file(path)?);
    }
    if samples.is_empty() {
        return Err(format!("no .json recordings found in {}", path.display()).into());
    }
    Ok(samples)
}

fn write_params(path: &Path, params: &DriveParameters) -> Result<(), Box<dyn Error>> {
    std::fs::write(path, toml::to_string_pretty(params)?)?;
    println!("wrote parameters to {}", path.display());
    Ok(())
}

fn print_params(params: &DriveParameters) {
    for (name, value) in PARAM_NAMES.iter().zip(params.to_array()) {
        println!("  {name:<24} {value:.6}");
    }
}

// ---------------------------------------------------------------------------
// Mode implementations
// ---------------------------------------------------------------------------

fn run_simulate(sample: &Path, params: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let r = CouplingMatrix::from_geometry(&RobotGeometry::default())?;
    let params = load_params(params)?;
    let series = DataSeries::from_json_file(sample)?;

    let trajectory = simulate(&r, &params, &series)?;
    let loss = trajectory.velocity_loss(&series);

    let last = trajectory
        .position
        .last()
        .copied()
        .ok_or("empty trajectory")?;
    println!("recording: {} ({} rows)", series.name(), series.len());
    println!("final pose: x={:.3} m, y={:.3} m, psi={:.3} rad", last.x, last.y, last.z);
    println!("velocity loss: {loss:.6}");
    Ok(())
}

fn run_fit(
    samples: &Path,
    config: Option<&Path>,
    params: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let r = CouplingMatrix::from_geometry(&RobotGeometry::default())?;
    let initial = load_params(params)?;
    let samples = load_samples(samples)?;
    let config = match config {
        Some(path) => TuneConfig::from_file(path)?,
        None => TuneConfig::default(),
    };

    tracing::info!(
        recordings = samples.len(),
        epochs = config.epochs,
        "starting gradient descent"
    );
    let report = config.descent().run(&r, &samples, &initial)?;

    if let (Some(first), Some(last)) = (report.loss_history.first(), report.final_loss()) {
        println!("loss: {first:.6} -> {last:.6} over {} epochs", report.epochs_run);
    }
    println!("fitted parameters:");
    print_params(&report.params);

    if let Some(path) = output {
        write_params(path, &report.params)?;
    }
    Ok(())
}

fn run_search(
    samples: &Path,
    trials: usize,
    seed: u64,
    output: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let r = CouplingMatrix::from_geometry(&RobotGeometry::default())?;
    let samples = load_samples(samples)?;
    let space = default_search_space()?;

    tracing::info!(
        recordings = samples.len(),
        trials,
        seed,
        "starting random search"
    );
    let report = RandomSearch::default()
        .with_trials(trials)
        .with_seed(seed)
        .run(&r, &samples, &space)?;

    println!(
        "best loss: {:.6} ({} of {} trials failed)",
        report.best_loss, report.trials_failed, report.trials_run
    );
    println!("best parameters:");
    print_params(&report.best_params);

    if let Some(path) = output {
        write_params(path, &report.best_params)?;
    }
    Ok(())
}

/// Search space centered on the nominal parameters: electrical constants
/// and inertias vary uniformly, friction coefficients log-uniformly.
fn default_search_space() -> Result<SearchSpace, Box<dyn Error>> {
    let nominal = DriveParameters::default();
    let mut space = SearchSpace::fixed_at(&nominal);
    for (index, &name) in PARAM_NAMES.iter().enumerate() {
        let center = nominal.parameter(index)?;
        // Battery voltage is measured, not searched.
        if name == "battery_voltage" {
            continue;
        }
        let range = if name.ends_with("_friction") {
            ParamRange::log_uniform(center * 0.2, center * 5.0)?
        } else {
            ParamRange::uniform(center * 0.5, center * 1.5)?
        };
        space = space.with_range(index, range)?;
    }
    Ok(space)
}

fn run_info() {
    println!("mecdrive v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("crates:");
    println!("  mecdrive-core     {}", env!("CARGO_PKG_VERSION"));
    println!("  mecdrive-dynamics {}", env!("CARGO_PKG_VERSION"));
    println!("  mecdrive-sim      {}", env!("CARGO_PKG_VERSION"));
    println!("  mecdrive-fit      {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("edition: 2021");
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Simulate { sample, params } => run_simulate(&sample, params.as_deref()),
        Commands::Fit {
            samples,
            config,
            params,
            output,
        } => run_fit(&samples, config.as_deref(), params.as_deref(), output.as_deref()),
        Commands::Search {
            samples,
            trials,
            seed,
            output,
        } => run_search(&samples, trials, seed, output.as_deref()),
        Commands::Info => {
            run_info();
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn friction_parameters_sample_log_uniform_bounds() {
        let nominal = DriveParameters::default();
        let space = default_search_space().expect("space");
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let friction_indices: Vec<usize> = PARAM_NAMES
            .iter()
            .enumerate()
            .filter(|(_, name)| name.ends_with("_friction"))
            .map(|(index, _)| index)
            .collect();
        assert_eq!(friction_indices.len(), 8);

        let mut escaped_central_band = vec![false; friction_indices.len()];
        for _ in 0..200 {
            let array = space.sample(&mut rng).to_array();
            for (escaped, &index) in escaped_central_band.iter_mut().zip(&friction_indices) {
                let center = nominal.parameter(index).expect("nominal value");
                let value = array[index];
                assert!(
                    value >= center * 0.2 && value <= center * 5.0,
                    "{} = {value} outside log-uniform bounds",
                    PARAM_NAMES[index]
                );
                if !(center * 0.5..center * 1.5).contains(&value) {
                    *escaped = true;
                }
            }
            // Battery voltage stays pinned at the measured nominal.
            assert_eq!(array[NUM_PARAMETERS - 1], nominal.battery_voltage());
        }

        // Over 200 draws a log-uniform range on [0.2c, 5c] routinely lands
        // outside the central [0.5c, 1.5c) band; a coefficient that never
        // does is being sampled from the wrong range.
        for (&index, escaped) in friction_indices.iter().zip(&escaped_central_band) {
            assert!(
                *escaped,
                "{} only ever sampled within the central uniform band",
                PARAM_NAMES[index]
            );
        }
    }

    #[test]
    fn non_friction_parameters_sample_uniform_bounds() {
        let nominal = DriveParameters::default();
        let space = default_search_space().expect("space");
        let mut rng = ChaCha8Rng::seed_from_u64(12);

        // motor_constant .. roller_moment
        for _ in 0..200 {
            let array = space.sample(&mut rng).to_array();
            for index in 0..6 {
                let center = nominal.parameter(index).expect("nominal value");
                let value = array[index];
                assert!(
                    value >= center * 0.5 && value < center * 1.5,
                    "{} = {value} outside uniform bounds",
                    PARAM_NAMES[index]
                );
            }
        }
    }
}
