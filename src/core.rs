// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

use ndarray::Array2;

use crate::error::{RelaxError, Result};

/// Value held by every cell of the first row and the first column.
pub const BOUNDARY_VALUE: f64 = 1.0;

/// Smallest grid with at least one relaxable cell.
pub const MIN_GRID_SIZE: usize = 3;

/// Read access to a square, row-major grid of cell values.
pub trait GridData {
    /// Get the value at a flat (row-major) index.
    fn get(&self, index: usize) -> f64;

    /// Number of cells along one side.
    fn size(&self) -> usize;

    /// Total number of cells.
    fn num_cells(&self) -> usize {
        self.size() * self.size()
    }

    /// True if the index lies in the first or last column. These cells are
    /// carried through relaxation unchanged.
    fn is_side_column(&self, index: usize) -> bool {
        let n = self.size();
        index % n == 0 || (index + 1) % n == 0
    }

    /// Flat indices of every row except the first and the last.
    fn mutable_range(&self) -> Range<usize> {
        let n = self.size();
        n..n * n - n
    }

    /// Convert a flat index to `[row, col]`.
    fn flat_to_2d(&self, flat: usize) -> [usize; 2] {
        [flat / self.size(), flat % self.size()]
    }

    /// Convert `[row, col]` to a flat index.
    fn flat_index(&self, idx: [usize; 2]) -> usize {
        idx[0] * self.size() + idx[1]
    }
}

/// The committed N×N grid.
///
/// Cells are stored as `f64` bit patterns in `AtomicU64` so that worker
/// threads can read the grid through a shared reference while the
/// coordinator owns all writes. Loads and stores are `Relaxed`: the two
/// rendezvous barriers order every commit against the next compute phase.
pub struct RelaxGrid {
    size: usize,
    cells: Box<[AtomicU64]>,
}

impl RelaxGrid {
    /// Create a grid with the first row and column set to [`BOUNDARY_VALUE`]
    /// and every other cell set to 0.0.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if `size < 3`, and `AllocationFailure`
    /// if `size * size` cells cannot be reserved.
    pub fn new(size: usize) -> Result<Self> {
        validate_size(size)?;
        let num_cells = size
            .checked_mul(size)
            .ok_or(RelaxError::AllocationFailure { cells: usize::MAX })?;

        let mut cells = Vec::new();
        cells
            .try_reserve_exact(num_cells)
            .map_err(|_| RelaxError::AllocationFailure { cells: num_cells })?;

        for flat in 0..num_cells {
            let (row, col) = (flat / size, flat % size);
            let value = if row == 0 || col == 0 {
                BOUNDARY_VALUE
            } else {
                0.0
            };
            cells.push(AtomicU64::new(value.to_bits()));
        }

        Ok(RelaxGrid {
            size,
            cells: cells.into_boxed_slice(),
        })
    }

    /// Write a committed value. Only the coordinator calls this, between
    /// the two barriers.
    pub(crate) fn store(&self, index: usize, value: f64) {
        self.cells[index].store(value.to_bits(), Ordering::Relaxed);
    }

    /// Copy the cells out in row-major order.
    pub fn to_vec(&self) -> Vec<f64> {
        self.cells
            .iter()
            .map(|c| f64::from_bits(c.load(Ordering::Relaxed)))
            .collect()
    }

    /// Snapshot of the grid as a 2D array indexed `[[row, col]]`.
    pub fn to_array(&self) -> Array2<f64> {
        let n = self.size;
        Array2::from_shape_fn((n, n), |(row, col)| self.get(row * n + col))
    }
}

impl GridData for RelaxGrid {
    fn get(&self, index: usize) -> f64 {
        f64::from_bits(self.cells[index].load(Ordering::Relaxed))
    }

    fn size(&self) -> usize {
        self.size
    }

    fn num_cells(&self) -> usize {
        self.cells.len()
    }
}

pub(crate) fn validate_size(size: usize) -> Result<()> {
    if size < MIN_GRID_SIZE {
        return Err(RelaxError::invalid("grid size", size, "must be >= 3"));
    }
    Ok(())
}
