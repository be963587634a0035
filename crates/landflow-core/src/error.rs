//! Error type shared by every aggregation step.

use thiserror::Error;

use crate::grid::ClassCode;

#[derive(Debug, Error)]
pub enum Error {
    /// The two grids of a transition do not cover the same cells.
    /// Carries `(height, width)` of each side.
    #[error("grid shapes differ: {from:?} (rows, cols) vs {to:?}")]
    ShapeMismatch {
        from: (usize, usize),
        to: (usize, usize),
    },

    #[error("class code {0} is not in the class registry")]
    UnknownClass(ClassCode),

    #[error("class code {0} is registered more than once")]
    DuplicateClass(ClassCode),

    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    #[error("invalid color {0:?}")]
    InvalidColor(String),

    #[error("a transition chain needs at least two grids, got {0}")]
    InsufficientSlices(usize),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
