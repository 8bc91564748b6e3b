//! Error type shared by all fallible operations.

use thiserror::Error;

/// Errors raised while validating or processing arrival-time surfaces.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LensrayError {
    /// The grid is smaller than the 3x3 footprint of the difference stencil.
    #[error("grid of shape ({rows}, {cols}) is smaller than the 3x3 stencil footprint")]
    Shape {
        /// Number of rows.
        rows: usize,
        /// Number of columns.
        cols: usize,
    },
    /// Arrival-time and coordinate grids do not have the same shape.
    #[error("arrival grid has shape {arrival:?} but coordinate grid has shape {coords:?}")]
    ShapeMismatch {
        /// Shape of the arrival-time grid.
        arrival: Vec<usize>,
        /// Shape of the coordinate grid.
        coords: Vec<usize>,
    },
    /// The arrival-time surface contains NaN or an infinity.
    #[error("non-finite arrival time at ({row}, {col})")]
    NonFinite {
        /// Row of the first offending value.
        row: usize,
        /// Column of the first offending value.
        col: usize,
    },
    /// The separation tolerance is negative or NaN.
    #[error("separation tolerance must be a non-negative number")]
    InvalidTolerance,
    /// No central stencil exists for the requested point count and order.
    #[error("no {points}-point central stencil for derivative order {order}")]
    InvalidStencil {
        /// Number of stencil points.
        points: usize,
        /// Derivative order.
        order: usize,
    },
    /// The lens model has no image system with this index.
    #[error("lens model has no image system {0}")]
    UnknownSystem(usize),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LensrayError>;
