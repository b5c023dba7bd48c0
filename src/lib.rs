// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Parallel Jacobi relaxation over a square grid.
//!
//! The first row and column of an N×N grid are held at 1.0 and every other
//! cell is repeatedly replaced by the mean of its four neighbours until no
//! cell moves by more than `10^-p`. The mutable rows are split into one
//! contiguous block per worker thread; workers compute into private buffers
//! and a coordinator commits them between two barrier rendezvous per cycle.

#![warn(missing_docs)]

/// Grid storage and read access.
pub mod core;
/// Error types for the library.
pub mod error;
/// Splitting the mutable cells into per-worker blocks.
pub mod partition;
/// Text and ANSI rendering of the grid and its blocks.
pub mod render;
/// The two-barrier cycle coordinator.
pub mod scheduler;
/// Per-cell relaxation and commit kernels.
pub mod update_kernels;

pub use crate::core::{GridData, RelaxGrid};
pub use crate::error::{RelaxError, Result};
pub use crate::partition::{make_blocks, Block};
pub use crate::scheduler::{ProgressInfo, RelaxReport, RelaxSolver};
