// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;

/// Errors that can occur while configuring or running a relaxation.
#[derive(Debug)]
pub enum RelaxError {
    /// A run parameter is out of range. Raised before anything is allocated.
    InvalidConfiguration {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// The value provided.
        value: usize,
        /// The accepted range, in words.
        expected: &'static str,
    },
    /// The grid or a block buffer could not be allocated.
    AllocationFailure {
        /// Number of `f64` cells requested.
        cells: usize,
    },
    /// The cycle limit was reached before the grid converged.
    MaxCyclesExceeded {
        /// The limit that was set.
        limit: u64,
    },
    /// The worker thread pool could not be started.
    ThreadPool(String),
}

impl RelaxError {
    pub(crate) fn invalid(parameter: &'static str, value: usize, expected: &'static str) -> Self {
        RelaxError::InvalidConfiguration {
            parameter,
            value,
            expected,
        }
    }

    /// True for errors caused by bad run parameters rather than resources.
    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self, RelaxError::InvalidConfiguration { .. })
    }
}

impl fmt::Display for RelaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelaxError::InvalidConfiguration {
                parameter,
                value,
                expected,
            } => {
                write!(
                    f,
                    "invalid configuration: {} is {} ({})",
                    parameter, value, expected
                )
            }
            RelaxError::AllocationFailure { cells } => {
                write!(f, "allocation failure: could not reserve {} cells", cells)
            }
            RelaxError::MaxCyclesExceeded { limit } => {
                write!(f, "max cycles exceeded: no convergence after {} cycles", limit)
            }
            RelaxError::ThreadPool(msg) => write!(f, "thread pool error: {}", msg),
        }
    }
}

impl std::error::Error for RelaxError {}

/// Convenience type alias for Results with RelaxError.
pub type Result<T> = std::result::Result<T, RelaxError>;
