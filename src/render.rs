// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt::Write;
use std::ops::Range;

use crate::core::RelaxGrid;

const PALETTE: [&str; 6] = [
    "\x1b[0;31m",
    "\x1b[0;32m",
    "\x1b[0;33m",
    "\x1b[0;34m",
    "\x1b[0;35m",
    "\x1b[0;36m",
];
const RESET: &str = "\x1b[0m";

fn owner(blocks: &[Range<usize>], index: usize) -> Option<usize> {
    blocks.iter().position(|r| r.contains(&index))
}

/// Render the grid as one line per row, each cell as `{:.6}, `.
pub fn format_grid(grid: &RelaxGrid) -> String {
    let arr = grid.to_array();
    let mut out = String::new();
    for row in arr.rows() {
        for value in row {
            let _ = write!(out, "{:.6}, ", value);
        }
        out.push('\n');
    }
    out
}

/// Render the grid with each cell tinted by the block that owns it.
///
/// With `color` off, each cell shows the id of its owning block instead of
/// its value, and `.` for cells outside every block.
pub fn format_grid_blocks(grid: &RelaxGrid, blocks: &[Range<usize>], color: bool) -> String {
    let arr = grid.to_array();
    let n = arr.ncols();
    let width = blocks.len().saturating_sub(1).to_string().len();
    let mut out = String::new();
    for ((row, col), value) in arr.indexed_iter() {
        let owned_by = owner(blocks, row * n + col);
        match (color, owned_by) {
            (true, Some(id)) => {
                let _ = write!(out, "{}{:.6}{}, ", PALETTE[id % PALETTE.len()], value, RESET);
            }
            (true, None) => {
                let _ = write!(out, "{:.6}, ", value);
            }
            (false, Some(id)) => {
                let _ = write!(out, "{:>width$} ", id, width = width);
            }
            (false, None) => {
                let _ = write!(out, "{:>width$} ", ".", width = width);
            }
        }
        if col + 1 == n {
            out.push('\n');
        }
    }
    out
}

/// List each block's inclusive start and end index.
pub fn format_block_table(blocks: &[Range<usize>]) -> String {
    let mut out = String::new();
    for (id, range) in blocks.iter().enumerate() {
        if range.is_empty() {
            let _ = writeln!(out, "block {}: empty", id);
        } else {
            let _ = writeln!(
                out,
                "block {}: start {}, end {} ({} cells)",
                id,
                range.start,
                range.end - 1,
                range.len()
            );
        }
    }
    out
}
