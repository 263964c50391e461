//! PityLab CLI — Monte Carlo, worst-case, sweep and self-test commands.
//!
//! Commands:
//! - `run` — simulate a scenario file and print summary statistics
//! - `worst-case` — print the adversarial bounds for a scenario
//! - `sweep` — run one batch per point of a pity/probability grid
//! - `self-test` — run the fixed-input regression harness

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use pitylab_core::WorstCaseOutcome;
use pitylab_runner::{
    export_histogram_csv, export_json, export_stages_csv, run_batch, run_self_tests,
    write_artifact, AggregateStatistics, BatchRequest, BatchResult, ExportBundle, ParamGrid,
    ParamSweep, Scenario, WorstCaseBounds,
};

#[derive(Parser)]
#[command(
    name = "pitylab",
    about = "PityLab CLI — staged upgrade cost simulator with pity counters"
)]
struct Cli {
    /// Log at debug level (overrides PITYLAB_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Monte Carlo batch for a scenario file.
    Run {
        /// Path to a TOML scenario file.
        #[arg(long)]
        config: PathBuf,

        #[command(flatten)]
        batch: BatchArgs,

        /// Output format on stdout.
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Also write the JSON result bundle to this path.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write both histograms as CSV to this path.
        #[arg(long)]
        histogram_csv: Option<PathBuf>,

        /// Write both per-stage tables as CSV to this path.
        #[arg(long)]
        stages_csv: Option<PathBuf>,
    },
    /// Print the worst-case bounds for a scenario file.
    WorstCase {
        /// Path to a TOML scenario file.
        #[arg(long)]
        config: PathBuf,

        /// Output format on stdout.
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Run one batch per grid point and print a summary row for each.
    Sweep {
        /// Path to a TOML scenario file (the base configuration).
        #[arg(long)]
        config: PathBuf,

        #[command(flatten)]
        batch: BatchArgs,

        /// Stage pity thresholds to try (comma-separated).
        #[arg(long, value_delimiter = ',')]
        stage_pity: Vec<u32>,

        /// Final pity thresholds to try (comma-separated).
        #[arg(long, value_delimiter = ',')]
        final_pity: Vec<u32>,

        /// Final probabilities to try (comma-separated).
        #[arg(long, value_delimiter = ',')]
        final_probabilities: Vec<f64>,

        /// Run grid points one at a time.
        #[arg(long, default_value_t = false)]
        serial: bool,
    },
    /// Run the fixed-input regression checks.
    SelfTest {
        /// Output format on stdout.
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

/// Overrides for the scenario's `[batch]` table.
#[derive(clap::Args)]
struct BatchArgs {
    /// Number of trials.
    #[arg(long)]
    trials: Option<usize>,

    /// Generator seed.
    #[arg(long, conflicts_with = "random_seed")]
    seed: Option<i64>,

    /// Draw a fresh seed and print it.
    #[arg(long, default_value_t = false)]
    random_seed: bool,

    /// Histogram bin width in attempts.
    #[arg(long)]
    bin_width: Option<u64>,

    /// Per-run attempt ceiling.
    #[arg(long)]
    attempt_ceiling: Option<u64>,
}

impl BatchArgs {
    fn apply(&self, mut request: BatchRequest) -> BatchRequest {
        if let Some(trials) = self.trials {
            request.trials = trials;
        }
        if let Some(seed) = self.seed {
            request.seed = seed;
        }
        if self.random_seed {
            request.seed = i64::from(rand::random::<u32>());
            eprintln!("Using seed {}", request.seed);
        }
        if let Some(width) = self.bin_width {
            request.bin_width = width;
        }
        if let Some(ceiling) = self.attempt_ceiling {
            request.attempt_ceiling = ceiling;
        }
        request
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            batch,
            format,
            output,
            histogram_csv,
            stages_csv,
        } => run_cmd(&config, &batch, format, output, histogram_csv, stages_csv),
        Commands::WorstCase { config, format } => run_worst_case(&config, format),
        Commands::Sweep {
            config,
            batch,
            stage_pity,
            final_pity,
            final_probabilities,
            serial,
        } => {
            let grid = ParamGrid {
                stage_pity_thresholds: stage_pity,
                final_pity_thresholds: final_pity,
                final_probabilities,
            };
            run_sweep(&config, &batch, &grid, serial)
        }
        Commands::SelfTest { format } => run_self_test(format),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("PITYLAB_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_scenario(path: &Path) -> Result<Scenario> {
    Scenario::from_file(path).with_context(|| format!("failed to load {}", path.display()))
}

fn run_cmd(
    config_path: &Path,
    batch: &BatchArgs,
    format: Format,
    output: Option<PathBuf>,
    histogram_csv: Option<PathBuf>,
    stages_csv: Option<PathBuf>,
) -> Result<()> {
    let scenario = load_scenario(config_path)?;
    let request = batch.apply(scenario.batch);
    let result = run_batch(&scenario.config, &request)?;

    if let Some(path) = output {
        let bundle = ExportBundle::new(result.clone());
        write_artifact(&path, &export_json(&bundle)?)?;
        eprintln!("Result written to {}", path.display());
    }
    if let Some(path) = histogram_csv {
        write_artifact(&path, &export_histogram_csv(&result)?)?;
    }
    if let Some(path) = stages_csv {
        write_artifact(&path, &export_stages_csv(&result)?)?;
    }

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        Format::Text => print_batch(&result),
    }
    Ok(())
}

fn run_worst_case(config_path: &Path, format: Format) -> Result<()> {
    let scenario = load_scenario(config_path)?;
    let bounds = WorstCaseBounds::compute(&scenario.config);

    match format {
        // Serialize directly: attempt counts can exceed u64, which `serde_json::Value` rejects.
        Format::Json => println!("{}", serde_json::to_string_pretty(&bounds)?),
        Format::Text => {
            print_worst_case("stages only", &bounds.stages_only);
            print_worst_case("full run", &bounds.full_run);
        }
    }
    Ok(())
}

fn run_sweep(config_path: &Path, batch: &BatchArgs, grid: &ParamGrid, serial: bool) -> Result<()> {
    let scenario = load_scenario(config_path)?;
    let request = batch.apply(scenario.batch);
    let results = ParamSweep::new(request)
        .with_parallelism(!serial)
        .sweep(grid, &scenario.config)?;

    println!(
        "{:>10} {:>10} {:>8} {:>12} {:>12} {:>12} {:>14}",
        "stage_pity", "final_pity", "final_p", "mean", "p90", "p99", "worst"
    );
    for r in &results {
        println!(
            "{:>10} {:>10} {:>8.3} {:>12.2} {:>12.2} {:>12.2} {:>14}",
            r.config.stage_pity_threshold(),
            r.config.final_pity_threshold(),
            r.config.final_probability(),
            r.full_run.attempts.mean,
            r.full_run.attempts.p90,
            r.full_run.attempts.p99,
            r.worst_case.full_run.total_attempts.to_string(),
        );
    }
    Ok(())
}

fn run_self_test(format: Format) -> Result<()> {
    let report = run_self_tests();
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Format::Text => {
            for check in &report.checks {
                let mark = if check.passed { "PASS" } else { "FAIL" };
                println!("[{mark}] {}: {}", check.name, check.detail);
            }
        }
    }
    if !report.all_passed() {
        bail!("{} self-test check(s) failed", report.failures().count());
    }
    Ok(())
}

fn print_batch(result: &BatchResult) {
    println!(
        "Trials: {}  Seed: {}  Config: {}",
        result.request.trials,
        result.request.seed,
        &result.config_fingerprint[..12.min(result.config_fingerprint.len())]
    );
    print_family("Stages only", &result.stages_only);
    print_family("Full run", &result.full_run);
    println!();
    println!("Worst case");
    print_worst_case("stages only", &result.worst_case.stages_only);
    print_worst_case("full run", &result.worst_case.full_run);
}

fn print_family(title: &str, stats: &AggregateStatistics) {
    println!();
    println!("{title}");
    println!("  {:<10} {:>12} {:>12} {:>12} {:>12}", "", "mean", "p50", "p90", "p99");
    for (label, s) in [("attempts", &stats.attempts), ("cost", &stats.cost)] {
        println!(
            "  {:<10} {:>12.2} {:>12.2} {:>12.2} {:>12.2}",
            label, s.mean, s.p50, s.p90, s.p99
        );
    }
    for (stage, s) in stats.per_stage.iter().enumerate() {
        println!(
            "  {:<10} {:>12.2} {:>12.2} {:>12.2} {:>12.2}",
            format!("stage {}", stage + 1),
            s.mean,
            s.p50,
            s.p90,
            s.p99
        );
    }
    println!("  histogram (bin width {})", stats.bin_width);
    for bin in &stats.histogram {
        println!(
            "    {:>6}-{:<6} {}",
            bin.start,
            bin.start + stats.bin_width - 1,
            bin.count
        );
    }
}

fn print_worst_case(label: &str, wc: &WorstCaseOutcome) {
    println!(
        "  {:<12} attempts: {}  cost: {}",
        label, wc.total_attempts, wc.total_cost
    );
}
