// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::ops::Range;

use crate::core::validate_size;
use crate::error::{RelaxError, Result};

/// One worker's share of the grid: a contiguous run of flat indices and the
/// buffer its new values are written into.
///
/// The buffer holds one value per index, including side-column indices, and
/// is reused from cycle to cycle. Between cycles it holds the values computed
/// in the previous compute phase, which is what convergence is measured
/// against.
#[derive(Debug, Clone)]
pub struct Block {
    id: usize,
    start: usize,
    values: Vec<f64>,
}

impl Block {
    /// Worker slot this block is assigned to.
    pub fn id(&self) -> usize {
        self.id
    }

    /// First flat index covered by the block.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Last flat index covered (inclusive), or `None` for an empty block.
    pub fn end(&self) -> Option<usize> {
        (!self.values.is_empty()).then(|| self.start + self.values.len() - 1)
    }

    /// Number of indices covered.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the block covers no index. Happens only when there are more
    /// workers than mutable cells.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The covered flat indices as a half-open range.
    pub fn indices(&self) -> Range<usize> {
        self.start..self.start + self.values.len()
    }

    /// True if `index` belongs to this block.
    pub fn contains(&self, index: usize) -> bool {
        self.indices().contains(&index)
    }

    /// Buffered values, one per covered index.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }
}

pub(crate) fn validate_workers(workers: usize) -> Result<()> {
    if workers == 0 {
        return Err(RelaxError::invalid("worker count", workers, "must be >= 1"));
    }
    Ok(())
}

/// Split the rows `1..size-1` of a `size`×`size` grid into exactly `workers`
/// contiguous, ordered, non-overlapping index ranges.
///
/// With `M = size² - 2·size` indices to share, the first `M % workers`
/// ranges get one index more than the rest, so range lengths differ by at
/// most one. If `workers > M` the trailing ranges are empty and start at the
/// end of the mutable range.
///
/// # Errors
/// Returns `InvalidConfiguration` if `size < 3` or `workers == 0`.
pub fn block_ranges(size: usize, workers: usize) -> Result<Vec<Range<usize>>> {
    validate_size(size)?;
    validate_workers(workers)?;

    let total = size
        .checked_mul(size)
        .ok_or(RelaxError::AllocationFailure { cells: usize::MAX })?;
    let mutable = total - 2 * size;
    let base = mutable / workers;
    let extra = mutable % workers;

    let mut ranges = Vec::with_capacity(workers);
    let mut start = size;
    for id in 0..workers {
        let len = base + usize::from(id < extra);
        ranges.push(start..start + len);
        start += len;
    }
    debug_assert_eq!(start, total - size);
    Ok(ranges)
}

/// Build one [`Block`] per worker with a zeroed buffer sized to its range.
///
/// # Errors
/// Returns `InvalidConfiguration` for a degenerate size or worker count
/// (checked before any buffer is allocated) and `AllocationFailure` if a
/// buffer cannot be reserved.
pub fn make_blocks(size: usize, workers: usize) -> Result<Vec<Block>> {
    let ranges = block_ranges(size, workers)?;
    ranges
        .into_iter()
        .enumerate()
        .map(|(id, range)| {
            let len = range.len();
            let mut values = Vec::new();
            values
                .try_reserve_exact(len)
                .map_err(|_| RelaxError::AllocationFailure { cells: len })?;
            values.resize(len, 0.0);
            Ok(Block {
                id,
                start: range.start,
                values,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_tiles(size: usize, workers: usize) {
        let blocks = make_blocks(size, workers).unwrap();
        assert_eq!(blocks.len(), workers, "size={} workers={}", size, workers);

        let mut next = size;
        for (id, block) in blocks.iter().enumerate() {
            assert_eq!(block.id(), id);
            assert_eq!(block.start(), next, "gap or overlap before block {}", id);
            next = block.indices().end;
        }
        assert_eq!(next, size * size - size, "size={} workers={}", size, workers);

        let min = blocks.iter().map(Block::len).min().unwrap();
        let max = blocks.iter().map(Block::len).max().unwrap();
        assert!(max - min <= 1, "unbalanced: min={} max={}", min, max);
    }

    #[test]
    fn tiles_every_size_and_worker_count() {
        for size in 3..=16 {
            for workers in 1..=40 {
                assert_tiles(size, workers);
            }
        }
    }

    #[test]
    fn exact_division() {
        // 6x6 grid: 24 mutable indices, 4 workers of 6
        let blocks = make_blocks(6, 4).unwrap();
        let spans: Vec<_> = blocks.iter().map(|b| (b.start(), b.end())).collect();
        assert_eq!(
            spans,
            vec![(6, Some(11)), (12, Some(17)), (18, Some(23)), (24, Some(29))]
        );
    }

    #[test]
    fn uneven_division_front_loads_extra() {
        // 5x5 grid: 15 mutable indices over 4 workers -> 4, 4, 4, 3
        let ranges = block_ranges(5, 4).unwrap();
        assert_eq!(ranges, vec![5..9, 9..13, 13..17, 17..20]);
    }

    #[test]
    fn minimum_grid_single_worker() {
        let blocks = make_blocks(3, 1).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start(), 3);
        assert_eq!(blocks[0].end(), Some(5));
        assert_eq!(blocks[0].values(), &[0.0, 0.0, 0.0]);
        assert!(blocks[0].contains(4));
        assert!(!blocks[0].contains(6));
    }

    #[test]
    fn more_workers_than_cells() {
        let blocks = make_blocks(3, 5).unwrap();
        let lens: Vec<_> = blocks.iter().map(Block::len).collect();
        assert_eq!(lens, vec![1, 1, 1, 0, 0]);
        assert!(blocks[4].is_empty());
        assert_eq!(blocks[4].end(), None);
        assert_eq!(blocks[4].indices(), 6..6);
    }

    #[test]
    fn invalid_worker_count() {
        let result = make_blocks(8, 0);
        assert!(matches!(
            result,
            Err(RelaxError::InvalidConfiguration {
                parameter: "worker count",
                value: 0,
                ..
            })
        ));
    }

    #[test]
    fn invalid_size() {
        let result = block_ranges(2, 4);
        assert!(matches!(
            result,
            Err(RelaxError::InvalidConfiguration {
                parameter: "grid size",
                value: 2,
                ..
            })
        ));
    }
}
