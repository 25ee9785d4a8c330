//! Demo command implementation.
//!
//! The demo command:
//! 1. Builds a tracer over the builtin metrics
//! 2. Runs a synthetic nested workload on several worker threads
//! 3. Renders the spike report
//! 4. Optionally writes the report to a file
//!
//! Worker 0 adopts a context forked from the dispatching thread, so its jobs
//! show up inside the `dispatch` tree; every other worker's jobs are roots
//! of their own.

use crate::metric::MetricRegistry;
use crate::report::write_report_file;
use crate::tracer::{SpanContext, Tracer};
use crate::utils::config::{TracerConfig, DEFAULT_TOP_K};
use anyhow::{Context, Result};
use log::{debug, info};
use std::hint::black_box;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

/// Deepest nesting the demo workload accepts
pub const MAX_DEPTH: usize = 8;

/// Most worker threads the demo workload accepts
pub const MAX_WORKERS: usize = 64;

/// Arguments for the demo command
#[derive(Debug, Clone)]
pub struct DemoArgs {
    /// Number of worker threads
    pub workers: usize,

    /// Jobs run by each worker
    pub iterations: usize,

    /// Nesting depth of each job
    pub depth: usize,

    /// Roots reported per metric
    pub top_k: usize,

    /// Milliseconds each leaf stage sleeps, scaled by its weight
    pub work_ms: u64,

    /// Also write the report here (optional)
    pub output: Option<PathBuf>,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            workers: 4,
            iterations: 3,
            depth: 3,
            top_k: DEFAULT_TOP_K,
            work_ms: 2,
            output: None,
        }
    }
}

/// Execute the demo command and return the rendered report
///
/// # Errors
/// * Invalid arguments
/// * Builtin metrics failing to load
/// * Report file write errors
pub fn execute_demo(args: DemoArgs) -> Result<String> {
    validate_args(&args)?;
    let start_time = Instant::now();

    info!(
        "Running demo workload: {} workers x {} jobs, depth {}",
        args.workers, args.iterations, args.depth
    );

    let registry = MetricRegistry::with_builtins().context("Failed to load builtin metrics")?;
    let config = TracerConfig::new()
        .with_enabled(true)
        .with_top_k(args.top_k);
    let tracer = Tracer::from_registry(config, &registry);

    {
        let _dispatch = tracer.trace("dispatch");
        let ctx = tracer.fork();

        thread::scope(|s| {
            for worker in 0..args.workers {
                let tracer = &tracer;
                let args = &args;
                let adopted = (worker == 0).then_some(&ctx);
                s.spawn(move || run_worker(tracer, worker, args, adopted));
            }
        });
    }

    let summary = tracer.summary();

    if let Some(path) = &args.output {
        write_report_file(&summary, path).context("Failed to write spike report")?;
        info!("✓ Report written to: {}", path.display());
    }

    info!(
        "Demo completed in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(summary)
}

/// Validate demo arguments
pub fn validate_args(args: &DemoArgs) -> Result<()> {
    if args.workers == 0 {
        anyhow::bail!("workers must be greater than 0");
    }

    if args.workers > MAX_WORKERS {
        anyhow::bail!("workers is too large (max {})", MAX_WORKERS);
    }

    if args.iterations == 0 {
        anyhow::bail!("iterations must be greater than 0");
    }

    if args.depth > MAX_DEPTH {
        anyhow::bail!("depth is too large (max {})", MAX_DEPTH);
    }

    TracerConfig::new()
        .with_top_k(args.top_k)
        .validate()
        .context("Invalid top-k")?;

    Ok(())
}

fn run_worker(tracer: &Tracer, worker: usize, args: &DemoArgs, ctx: Option<&SpanContext>) {
    let _adopted = ctx.map(|ctx| tracer.adopt(ctx));
    debug!("Worker {} started (adopted: {})", worker, ctx.is_some());

    for iteration in 0..args.iterations {
        let name = format!("worker_{}::job_{}", worker, iteration);
        let _job = tracer.trace(&name);

        // Later jobs on higher workers are heavier, so spikes vary by tree
        let weight = 1 + worker + iteration;
        descend(tracer, 1, args.depth, weight, args.work_ms);
    }
}

/// One level of the workload: a light `fetch` stage and a heavy `process`
/// stage, each nesting the next level
fn descend(tracer: &Tracer, level: usize, depth: usize, weight: usize, work_ms: u64) {
    if level > depth {
        burn(weight, work_ms);
        return;
    }

    tracer.in_scope(&format!("fetch_{}", level), || {
        burn(weight, work_ms / 4);
    });

    tracer.in_scope(&format!("process_{}", level), || {
        descend(tracer, level + 1, depth, weight, work_ms);
    });
}

/// Allocate, compute and sleep in proportion to `weight`
fn burn(weight: usize, work_ms: u64) {
    let buffer: Vec<u64> = (0..weight as u64 * 4096).collect();
    black_box(buffer.iter().fold(0u64, |acc, x| acc.wrapping_mul(31).wrapping_add(*x)));

    if work_ms > 0 {
        thread::sleep(Duration::from_millis(work_ms * weight as u64));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_args() -> DemoArgs {
        DemoArgs {
            workers: 2,
            iterations: 2,
            depth: 2,
            top_k: 10,
            work_ms: 0,
            output: None,
        }
    }

    #[test]
    fn test_validate_args_valid() {
        assert!(validate_args(&DemoArgs::default()).is_ok());
    }

    #[test]
    fn test_validate_args_rejects_bad_values() {
        let args = DemoArgs {
            workers: 0,
            ..quick_args()
        };
        assert!(validate_args(&args).is_err());

        let args = DemoArgs {
            iterations: 0,
            ..quick_args()
        };
        assert!(validate_args(&args).is_err());

        let args = DemoArgs {
            depth: MAX_DEPTH + 1,
            ..quick_args()
        };
        assert!(validate_args(&args).is_err());

        let args = DemoArgs {
            top_k: 0,
            ..quick_args()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_demo_reports_every_root() {
        let summary = execute_demo(quick_args()).unwrap();

        assert!(summary.contains("Tracer Summary:"));
        assert!(summary.contains("Top 10 Latency Spikes:"));

        // dispatch (holding worker 0) plus the two jobs of worker 1
        let roots = summary
            .lines()
            .filter(|line| line.starts_with("    ["))
            .count();
        assert_eq!(roots, 3);
        assert!(summary.contains("]  dispatch"));
        assert!(summary.contains("]  worker_1::job_0"));
        assert!(summary.contains("]  worker_1::job_1"));
    }
}
