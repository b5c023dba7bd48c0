// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::core::{GridData, RelaxGrid};
use crate::partition::Block;

/// Mean of the four cells directly above, below, left and right of `index`.
///
/// `index` must not lie in the first or last row or column.
pub fn neighbor_average<G: GridData>(grid: &G, index: usize) -> f64 {
    let n = grid.size();
    let up = grid.get(index - n);
    let right = grid.get(index + 1);
    let down = grid.get(index + n);
    let left = grid.get(index - 1);
    (up + right + down + left) / 4.0
}

/// Relax every cell of `block` against the committed grid, writing the new
/// values into the block's buffer.
///
/// Side-column cells are copied through unchanged. For every other cell the
/// new value is compared with the value the buffer held from the previous
/// compute phase. Returns true if any cell moved by more than `threshold`.
/// The grid is never written.
pub fn relax_block<G: GridData>(grid: &G, block: &mut Block, threshold: f64) -> bool {
    let start = block.start();
    let mut changed = false;
    for (offset, slot) in block.values_mut().iter_mut().enumerate() {
        let index = start + offset;
        if grid.is_side_column(index) {
            *slot = grid.get(index);
            continue;
        }
        let new_val = neighbor_average(grid, index);
        if (new_val - *slot).abs() > threshold {
            changed = true;
        }
        *slot = new_val;
    }
    changed
}

/// Copy a block's buffered values into the grid, skipping side-column cells
/// whose buffered value is the one already committed.
pub fn commit_block(grid: &RelaxGrid, block: &Block) {
    for (index, &value) in block.indices().zip(block.values()) {
        if !grid.is_side_column(index) {
            grid.store(index, value);
        }
    }
}
