use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use env_logger::Builder;
use log::info;

use flowsim::sweep::{float_range, parallel_sweep};
use flowsim::{Simulation, SimulationConfig};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
/// Runs flow admission simulations described by YAML configs
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Runs a single simulation and writes its final results as JSON
    Run(RunArgs),
    /// Runs a parallel sweep over arrival and service rates and writes a CSV table
    Sweep(SweepArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Path to YAML file with simulation configuration
    #[arg(short, long)]
    config: PathBuf,

    /// Path to produced JSON file with simulation results
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SweepArgs {
    /// Path to YAML file with simulation configuration
    #[arg(short, long)]
    config: PathBuf,

    /// Arrival rates as START STOP STEP
    #[arg(long, num_args = 3, required = true, value_names = ["START", "STOP", "STEP"])]
    arrival: Vec<f64>,

    /// Service rates as START STOP STEP
    #[arg(long, num_args = 3, required = true, value_names = ["START", "STOP", "STEP"])]
    service: Vec<f64>,

    /// Number of runs per pair of rates
    #[arg(short, long, default_value_t = 10)]
    runs: usize,

    /// Number of threads to use (default - use all available cores)
    #[arg(short, long, default_value_t = std::thread::available_parallelism().map_or(1, |n| n.get()))]
    threads: usize,

    /// Seed of the first run, run i uses seed + i
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Path to produced CSV file with sweep results
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn output_path(config: &Path, suffix: &str, extension: &str) -> PathBuf {
    let stem = config.file_stem().and_then(|s| s.to_str()).unwrap_or("flowsim");
    config
        .with_file_name([stem, suffix].concat())
        .with_extension(extension)
}

fn run(args: RunArgs) -> Result<(), Box<dyn Error>> {
    let config = SimulationConfig::from_file(&args.config)?;
    let mut sim = Simulation::from_config(&config)?;
    let results = sim.launch_simulation()?;
    info!("finished at {:.3}, blocking rate {:?}", results.time, results.get("Blocking_rate"));

    let output = args
        .output
        .unwrap_or_else(|| output_path(&args.config, "-results", "json"));
    std::fs::File::create(output)?.write_all(serde_json::to_string_pretty(&results)?.as_bytes())?;
    Ok(())
}

fn sweep(args: SweepArgs) -> Result<(), Box<dyn Error>> {
    let config = SimulationConfig::from_file(&args.config)?;
    let base = Simulation::from_config(&config)?;
    let arrival_rates = float_range(args.arrival[0], args.arrival[1], args.arrival[2]);
    let service_rates = float_range(args.service[0], args.service[1], args.service[2]);
    info!(
        "sweeping {} x {} rate pairs, {} runs each, {} threads",
        arrival_rates.len(),
        service_rates.len(),
        args.runs,
        args.threads
    );
    let points = parallel_sweep(&base, &arrival_rates, &service_rates, args.runs, args.threads, args.seed)?;

    let output = args.output.unwrap_or_else(|| output_path(&args.config, "-sweep", "csv"));
    let mut writer = csv::Writer::from_path(output)?;
    for point in &points {
        writer.serialize(point)?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    match Cli::parse().command {
        Command::Run(args) => run(args),
        Command::Sweep(args) => sweep(args),
    }
}
