// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use jacobi_relax::render;
use jacobi_relax::scheduler::{ProgressInfo, RelaxSolver};

#[derive(Parser)]
#[command(
    name = "jacobi-relax",
    about = "Parallel Jacobi relaxation with a two-barrier compute/commit cycle"
)]
struct Cli {
    /// Grid dimension N (at least 3)
    size: usize,

    /// Precision digits p; the run stops once no cell moves by more than 10^-p
    precision: u32,

    /// Number of worker threads (defaults to the number of CPU cores)
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Abort if the grid has not converged after this many cycles
    #[arg(long)]
    max_cycles: Option<u64>,

    /// Relax every block on the main thread instead of a worker pool
    #[arg(long)]
    sequential: bool,

    /// Print cycle progress to stderr (see --progress-interval)
    #[arg(long)]
    progress: bool,

    /// Progress reporting interval in milliseconds (used with --progress)
    #[arg(long, default_value = "500")]
    progress_interval: u64,

    /// Print the converged grid after the timing line
    #[arg(long)]
    print_grid: bool,

    /// Print the block layout after the timing line
    #[arg(long)]
    print_blocks: bool,

    /// Show the block layout as block ids instead of ANSI colours
    #[arg(long)]
    no_color: bool,
}

/// Usage errors exit with status 1; help and version output exit normally.
fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Whether a progress line is due at `now_ms` when the last one was printed
/// at `prev_ms`.
fn progress_due(now_ms: u64, prev_ms: u64, interval_ms: u64) -> bool {
    now_ms >= prev_ms.saturating_add(interval_ms)
}

fn main() -> Result<()> {
    let cli = parse_cli();
    init_tracing();

    let start = Instant::now();

    let threads = cli.threads.unwrap_or_else(default_threads);
    let mut solver = RelaxSolver::new(cli.size, cli.precision, threads)
        .context("could not set up the relaxation")?;
    if let Some(limit) = cli.max_cycles {
        solver = solver
            .with_max_cycles(limit)
            .context("could not set up the relaxation")?;
    }

    let progress_cb: Option<Box<dyn Fn(ProgressInfo) + Sync>> = if cli.progress {
        let interval_ms = cli.progress_interval;
        let last_print = AtomicU64::new(0);
        Some(Box::new(move |info: ProgressInfo| {
            let now_ms = info.elapsed.as_millis() as u64;
            let prev = last_print.load(Ordering::Relaxed);
            if progress_due(now_ms, prev, interval_ms) {
                last_print.store(now_ms, Ordering::Relaxed);
                eprintln!(
                    "[{:.1}s] cycle={} commits={}",
                    info.elapsed.as_secs_f64(),
                    info.cycle,
                    info.commits,
                );
            }
        }))
    } else {
        None
    };

    let outcome = if cli.sequential {
        solver.solve_sequential(progress_cb.as_deref())
    } else {
        solver.solve(progress_cb.as_deref())
    };
    let report = outcome.context("relaxation did not complete")?;

    let total = start.elapsed();
    println!(
        "{}, {:.6}, {:.6}, {:.6}",
        cli.size,
        total.as_secs_f64(),
        report.commit_time.as_secs_f64(),
        report.compute_time.as_secs_f64()
    );

    if cli.print_blocks {
        let blocks = solver.block_ranges();
        print!("{}", render::format_block_table(&blocks));
        print!(
            "{}",
            render::format_grid_blocks(solver.grid(), &blocks, !cli.no_color)
        );
    }
    if cli.print_grid {
        print!("{}", render::format_grid(solver.grid()));
    }

    Ok(())
}
