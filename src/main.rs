//! xmile-regress: CLI entry point.
//!
//! Runs the model regression suite, compares two tables directly, or bundles
//! runtime sources.

use std::fs::{self, File};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{fmt, EnvFilter};

use xmile_regress::bundle::{bundle_runtime, BundleSources};
use xmile_regress::compare::compare;
use xmile_regress::config::SuiteConfig;
use xmile_regress::reporter::{Level, Reporter};
use xmile_regress::runner::{discover_cases, find_simulator, run_suite};
use xmile_regress::series::SeriesTable;
use xmile_regress::types::{Summary, TestResult};

#[derive(Parser)]
#[command(name = "xmile-regress")]
#[command(about = "Regression comparison of simulator output against reference data")]
#[command(version)]
struct Cli {
    /// Diagnostic verbosity.
    #[arg(short, long, value_enum, default_value_t = Level::Debug, global = true)]
    verbosity: Level,

    /// Suppress diagnostics.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run every model case under the suite directory.
    Run(RunArgs),
    /// Compare a reference table against a simulated table.
    Compare(CompareArgs),
    /// Emit the runtime source module.
    Bundle(BundleArgs),
}

#[derive(Args)]
struct RunArgs {
    /// YAML suite config.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Suite directory (one subdirectory per model).
    #[arg(short, long)]
    base: Option<PathBuf>,

    /// Simulator binary (or set `XMILERUN_BIN`).
    #[arg(short, long)]
    simulator: Option<PathBuf>,

    /// Simulator timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Only run cases whose name contains this.
    #[arg(short, long)]
    filter: Option<String>,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CompareArgs {
    /// Reference table.
    reference: PathBuf,
    /// Simulated table.
    simulated: PathBuf,
    /// Reference field delimiter.
    #[arg(long, default_value_t = ',')]
    reference_delimiter: char,
    /// Simulated field delimiter.
    #[arg(long, default_value_t = '\t')]
    simulated_delimiter: char,
}

#[derive(Args)]
struct BundleArgs {
    /// Runtime preamble source.
    preamble: PathBuf,
    /// Runtime epilogue source.
    epilogue: PathBuf,
    /// Drawing stylesheet.
    draw_css: PathBuf,
    /// Output file (default stdout).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Initialize tracing. `RUST_LOG` overrides the default `warn` filter.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let mut reporter = Reporter::stderr(cli.verbosity, cli.quiet);

    match cli.command {
        Cmd::Run(args) => run_mode(&args, &mut reporter),
        Cmd::Compare(args) => compare_mode(&args, &mut reporter),
        Cmd::Bundle(args) => bundle_mode(&args),
    }
}

fn build_config(args: &RunArgs) -> anyhow::Result<SuiteConfig> {
    let mut config = match &args.config {
        Some(path) => SuiteConfig::load(path)?,
        None => SuiteConfig::default(),
    };

    if let Some(base) = &args.base {
        config.base_dir.clone_from(base);
    }
    match &args.simulator {
        Some(sim) => config.simulator.clone_from(sim),
        None if args.config.is_none() => {
            if let Some(found) = find_simulator() {
                config.simulator = found;
            }
        }
        None => {}
    }
    if let Some(secs) = args.timeout {
        config.timeout_secs = secs;
    }

    config.validate()?;
    Ok(config)
}

fn run_mode(args: &RunArgs, reporter: &mut Reporter) -> anyhow::Result<()> {
    let config = build_config(args)?;
    let cases = discover_cases(&config)?;

    if !args.json {
        println!("{}", "xmile-regress".bold());
        println!("  Simulator: {}", config.simulator.display());
        println!("  Suite: {}", config.base_dir.display());
        println!("Found {} cases", cases.len());
        println!();
        println!("{}", "Running cases...".cyan());
    }

    let start = Instant::now();
    let results = run_suite(&cases, &config, args.filter.as_deref(), reporter);
    let elapsed = start.elapsed();
    let summary = Summary::from_results(&results);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in &results {
            print_result(result);
        }
        print_summary(&summary, elapsed.as_secs_f64());
    }

    if !summary.success() {
        std::process::exit(1);
    }

    Ok(())
}

fn compare_mode(args: &CompareArgs, reporter: &mut Reporter) -> anyhow::Result<()> {
    let load = |path: &PathBuf, delimiter: char| -> anyhow::Result<SeriesTable> {
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        SeriesTable::load(file, delimiter).with_context(|| format!("Malformed {}", path.display()))
    };

    let reference = load(&args.reference, args.reference_delimiter)?;
    let simulated = load(&args.simulated, args.simulated_delimiter)?;

    let outcome = compare(&reference, &simulated, reporter);
    if outcome.is_match() {
        println!("  {} {} time steps match", "✓".green(), reference.len());
        Ok(())
    } else {
        println!("  {} {}", "✗".red(), "mismatch".red());
        std::process::exit(1);
    }
}

fn bundle_mode(args: &BundleArgs) -> anyhow::Result<()> {
    let module = bundle_runtime(BundleSources {
        preamble: &args.preamble,
        epilogue: &args.epilogue,
        draw_css: &args.draw_css,
    })?;

    match &args.output {
        Some(path) => {
            fs::write(path, module).with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => print!("{module}"),
    }
    Ok(())
}

fn print_summary(summary: &Summary, secs: f64) {
    println!();
    println!("{}", "=".repeat(60));

    if summary.success() {
        println!(
            "  {} {} passed, {} skipped in {:.2}s",
            "PASS".green(),
            summary.passed.to_string().green(),
            summary.skipped,
            secs
        );
    } else {
        println!(
            "  {} {} passed, {} failed, {} errors, {} skipped in {:.2}s",
            "FAIL".red(),
            summary.passed,
            summary.failed.to_string().red(),
            summary.errored.to_string().red(),
            summary.skipped,
            secs
        );
    }

    println!("{}", "=".repeat(60));
}

fn print_result(result: &TestResult) {
    match result {
        TestResult::Pass { name, .. } => {
            println!("  {} {}", "✓".green(), name);
        }
        TestResult::Fail { name, reason } => {
            println!("  {} {}", "✗".red(), name.red());
            println!("      {reason}");
        }
        TestResult::Error { name, error } => {
            println!("  {} {} (error)", "✗".red(), name.red());
            println!("      {error}");
        }
        TestResult::Skip { name, reason } => {
            println!("  {} {} ({})", "○".yellow(), name.dimmed(), reason.dimmed());
        }
    }
}
