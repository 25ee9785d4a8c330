//! Spike Trace CLI
//!
//! Runs a traced demo workload and lists the metrics the tracer records.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use spike_trace::commands::{execute_demo, list_metrics, validate_args, DemoArgs};
use spike_trace::metric::CountingAllocator;
use spike_trace::report::write_report;
use spike_trace::utils::config::{DEFAULT_TOP_K, ENABLE_ENV_VAR, TOP_K_ENV_VAR};
use spike_trace::MetricRegistry;

#[global_allocator]
static ALLOC: CountingAllocator = CountingAllocator;

/// Spike Trace - top-K span trees per metric
#[derive(Parser, Debug)]
#[command(name = "spike-trace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Trace a synthetic multi-threaded workload and print its spikes
    Demo {
        /// Number of worker threads
        #[arg(short, long, default_value = "4")]
        workers: usize,

        /// Jobs run by each worker
        #[arg(short, long, default_value = "3")]
        iterations: usize,

        /// Nesting depth of each job
        #[arg(short, long, default_value = "3")]
        depth: usize,

        /// Roots reported per metric
        #[arg(long, env = TOP_K_ENV_VAR, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,

        /// Milliseconds each leaf stage sleeps per unit of weight
        #[arg(long, default_value = "2")]
        work_ms: u64,

        /// Also write the report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the metrics a tracer records, in report order
    Metrics,

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Demo {
            workers,
            iterations,
            depth,
            top_k,
            work_ms,
            output,
        } => {
            let args = DemoArgs {
                workers,
                iterations,
                depth,
                top_k,
                work_ms,
                output,
            };

            // Validate args first
            validate_args(&args)?;

            let summary = execute_demo(args)?;
            write_report(&mut std::io::stdout().lock(), &summary)
                .context("Failed to print spike report")?;
        }

        Commands::Metrics => {
            let registry =
                MetricRegistry::with_builtins().context("Failed to load builtin metrics")?;
            print!("{}", list_metrics(&registry));
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}

/// Display version information
fn display_version() {
    println!("Spike Trace v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("In-process span tracing with top-K spike reports.");
    println!(
        "Set {}=1 to enable tracing in an instrumented program, {}=N to change K.",
        ENABLE_ENV_VAR, TOP_K_ENV_VAR
    );
}
