// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Barrier, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::core::{validate_size, GridData, RelaxGrid};
use crate::error::{RelaxError, Result};
use crate::partition::{make_blocks, validate_workers, Block};
use crate::update_kernels::{commit_block, relax_block};

/// Largest accepted number of precision digits.
pub const MAX_PRECISION: u32 = 15;

/// Convergence threshold `10^-precision`, with `precision` clamped to
/// [`MAX_PRECISION`].
pub fn threshold_for(precision: u32) -> f64 {
    10f64.powi(-(precision.min(MAX_PRECISION) as i32))
}

/// Progress information passed to the optional callback after every commit.
pub struct ProgressInfo {
    /// Compute phases run so far.
    pub cycle: u64,
    /// Commits applied so far.
    pub commits: u64,
    /// Elapsed time since the solve started.
    pub elapsed: Duration,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelaxReport {
    /// Number of compute phases, including the final one that found no change.
    pub cycles: u64,
    /// Number of commits applied to the grid.
    pub commits: u64,
    /// Time spent in compute phases, accumulated over all cycles.
    pub compute_time: Duration,
    /// Time spent deciding and committing, accumulated over all cycles.
    pub commit_time: Duration,
}

/// Phases of one relaxation cycle as seen by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    /// Workers relax their blocks into their buffers.
    Compute,
    /// The coordinator reads and resets the convergence flag.
    Decide,
    /// The coordinator copies every buffer into the grid.
    Commit,
    /// Terminal: the grid holds the converged result.
    Done,
}

impl CyclePhase {
    /// The phase following `self`. `changed` is the flag value read in
    /// [`CyclePhase::Decide`] and is ignored by the other phases.
    pub fn next(self, changed: bool) -> CyclePhase {
        match self {
            CyclePhase::Compute => CyclePhase::Decide,
            CyclePhase::Decide if changed => CyclePhase::Commit,
            CyclePhase::Decide => CyclePhase::Done,
            CyclePhase::Commit => CyclePhase::Compute,
            CyclePhase::Done => CyclePhase::Done,
        }
    }
}

/// Shared "some cell moved" signal.
///
/// Workers only ever raise it; the coordinator reads and clears it in one
/// step while no worker is computing.
#[derive(Debug, Default)]
pub struct ConvergenceFlag(AtomicBool);

impl ConvergenceFlag {
    /// A lowered flag.
    pub fn new() -> Self {
        ConvergenceFlag(AtomicBool::new(false))
    }

    /// Mark that at least one cell changed this cycle.
    pub fn raise(&self) {
        self.0.fetch_or(true, Ordering::AcqRel);
    }

    /// Whether the flag is currently raised.
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Return the current value and lower the flag.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// Parallel Jacobi relaxation over a square grid.
///
/// The grid is split into one block per worker. Each cycle the workers relax
/// their blocks into private buffers, all parties meet at a first barrier,
/// the coordinator decides whether anything moved and, if so, commits the
/// buffers into the grid before releasing the workers through a second
/// barrier. The run ends after the first compute phase in which no cell
/// moved by more than the threshold.
pub struct RelaxSolver {
    grid: RelaxGrid,
    blocks: Vec<Mutex<Block>>,
    precision: u32,
    threshold: f64,
    max_cycles: Option<u64>,
    progress_callback: Option<Box<dyn Fn(ProgressInfo) + Send + Sync>>,
}

impl RelaxSolver {
    /// Create a solver for a `size`×`size` grid, a threshold of
    /// `10^-precision` and `workers` worker threads.
    ///
    /// All parameters are checked before the grid or any block buffer is
    /// allocated.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if `size < 3`, `workers == 0` or
    /// `precision > 15`, and `AllocationFailure` if the grid or a buffer
    /// cannot be reserved.
    pub fn new(size: usize, precision: u32, workers: usize) -> Result<Self> {
        validate_size(size)?;
        validate_workers(workers)?;
        if precision > MAX_PRECISION {
            return Err(RelaxError::invalid(
                "precision",
                precision as usize,
                "must be <= 15",
            ));
        }

        let grid = RelaxGrid::new(size)?;
        let blocks = make_blocks(size, workers)?;

        let mutable = grid.mutable_range().len();
        if workers > mutable {
            warn!(
                workers,
                mutable, "more workers than mutable cells; some workers will idle"
            );
        }
        for block in &blocks {
            trace!(
                block = block.id(),
                start = block.start(),
                len = block.len(),
                "block assigned"
            );
        }

        Ok(RelaxSolver {
            grid,
            blocks: blocks.into_iter().map(Mutex::new).collect(),
            precision,
            threshold: threshold_for(precision),
            max_cycles: None,
            progress_callback: None,
        })
    }

    /// Abort with `MaxCyclesExceeded` if the grid has not converged after
    /// `limit` compute phases (builder method). Unbounded by default.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if `limit` is 0: every run needs at
    /// least one compute phase to find out whether it has converged.
    pub fn with_max_cycles(mut self, limit: u64) -> Result<Self> {
        if limit == 0 {
            return Err(RelaxError::invalid("max cycles", 0, "must be >= 1"));
        }
        self.max_cycles = Some(limit);
        Ok(self)
    }

    /// Set a progress callback invoked after every commit (builder method).
    pub fn with_progress(mut self, callback: Box<dyn Fn(ProgressInfo) + Send + Sync>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Get a reference to the grid.
    pub fn grid(&self) -> &RelaxGrid {
        &self.grid
    }

    /// Consume the solver and return the grid.
    pub fn into_grid(self) -> RelaxGrid {
        self.grid
    }

    /// Number of worker threads, one per block.
    pub fn workers(&self) -> usize {
        self.blocks.len()
    }

    /// Precision digits the solver was built with.
    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Convergence threshold, `10^-precision`.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Flat index range assigned to each worker, in worker order.
    pub fn block_ranges(&self) -> Vec<Range<usize>> {
        self.blocks.iter().map(|slot| lock(slot).indices()).collect()
    }

    /// Run the two-barrier protocol on a dedicated thread pool until the grid
    /// converges.
    ///
    /// # Parameters
    /// - `progress_cb`: Optional callback for progress updates (overrides builder-set callback)
    ///
    /// # Errors
    /// Returns `MaxCyclesExceeded` if a cycle limit is set and reached, and
    /// `ThreadPool` if the worker threads cannot be started.
    pub fn solve(&self, progress_cb: Option<&(dyn Fn(ProgressInfo) + Sync)>) -> Result<RelaxReport> {
        let workers = self.blocks.len();

        // Every worker parks its thread at the barriers, and so does the
        // coordinator running the scope body: the pool needs one thread per
        // party or the rendezvous never completes.
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers + 1)
            .thread_name(|i| format!("relax-{}", i))
            .build()
            .map_err(|e| RelaxError::ThreadPool(e.to_string()))?;

        let flag = ConvergenceFlag::new();
        let stop = AtomicBool::new(false);
        let computed = Barrier::new(workers + 1);
        let committed = Barrier::new(workers + 1);

        pool.scope(|s| {
            for slot in &self.blocks {
                let (flag, stop, computed, committed) = (&flag, &stop, &computed, &committed);
                s.spawn(move |_| loop {
                    {
                        let mut block = lock(slot);
                        if relax_block(&self.grid, &mut block, self.threshold) {
                            flag.raise();
                        }
                    }
                    computed.wait();
                    committed.wait();
                    if stop.load(Ordering::Acquire) {
                        break;
                    }
                });
            }

            self.coordinate(
                &flag,
                || {
                    computed.wait();
                },
                |finished| {
                    if finished {
                        stop.store(true, Ordering::Release);
                    }
                    committed.wait();
                },
                progress_cb,
            )
        })
    }

    /// Run the same compute/decide/commit cycle on the calling thread,
    /// relaxing the blocks one after another.
    ///
    /// Produces exactly the grid [`RelaxSolver::solve`] produces.
    ///
    /// # Errors
    /// Returns `MaxCyclesExceeded` if a cycle limit is set and reached.
    pub fn solve_sequential(
        &self,
        progress_cb: Option<&(dyn Fn(ProgressInfo) + Sync)>,
    ) -> Result<RelaxReport> {
        let flag = ConvergenceFlag::new();
        self.coordinate(
            &flag,
            || {
                for slot in &self.blocks {
                    if relax_block(&self.grid, &mut lock(slot), self.threshold) {
                        flag.raise();
                    }
                }
            },
            |_| {},
            progress_cb,
        )
    }

    /// Coordinator side of the cycle. `compute` returns once every block has
    /// been relaxed for the current cycle; `release` lets the workers past
    /// the commit rendezvous, telling them whether the run is over.
    fn coordinate<C, R>(
        &self,
        flag: &ConvergenceFlag,
        mut compute: C,
        mut release: R,
        progress_cb: Option<&(dyn Fn(ProgressInfo) + Sync)>,
    ) -> Result<RelaxReport>
    where
        C: FnMut(),
        R: FnMut(bool),
    {
        let start_time = Instant::now();
        let mut report = RelaxReport::default();
        let mut phase = CyclePhase::Compute;
        let mut changed = false;
        let mut mark = Instant::now();

        loop {
            match phase {
                CyclePhase::Compute => {
                    compute();
                    report.compute_time += mark.elapsed();
                    report.cycles += 1;
                    mark = Instant::now();
                }
                CyclePhase::Decide => {
                    changed = flag.take();
                    debug!(cycle = report.cycles, changed, "cycle computed");
                    if let Some(limit) = self.max_cycles {
                        if changed && report.cycles >= limit {
                            report.commit_time += mark.elapsed();
                            release(true);
                            warn!(limit, "cycle limit reached before convergence");
                            return Err(RelaxError::MaxCyclesExceeded { limit });
                        }
                    }
                }
                CyclePhase::Commit => {
                    for slot in &self.blocks {
                        commit_block(&self.grid, &lock(slot));
                    }
                    report.commits += 1;
                    report.commit_time += mark.elapsed();

                    let info = ProgressInfo {
                        cycle: report.cycles,
                        commits: report.commits,
                        elapsed: start_time.elapsed(),
                    };
                    // Workers are parked at the commit barrier here. If the
                    // callback unwinds they must still be let through, or the
                    // pool never drains and the panic never reaches the caller.
                    let notified = panic::catch_unwind(AssertUnwindSafe(|| {
                        if let Some(cb) = progress_cb {
                            cb(info);
                        } else if let Some(cb) = &self.progress_callback {
                            cb(info);
                        }
                    }));
                    if let Err(payload) = notified {
                        release(true);
                        panic::resume_unwind(payload);
                    }

                    release(false);
                    mark = Instant::now();
                }
                CyclePhase::Done => {
                    report.commit_time += mark.elapsed();
                    release(true);
                    info!(
                        cycles = report.cycles,
                        commits = report.commits,
                        compute_secs = report.compute_time.as_secs_f64(),
                        commit_secs = report.commit_time.as_secs_f64(),
                        "converged"
                    );
                    return Ok(report);
                }
            }
            phase = phase.next(changed);
        }
    }
}

fn lock(slot: &Mutex<Block>) -> MutexGuard<'_, Block> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
