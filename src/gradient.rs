//! Gradient magnitude of an arrival-time surface.

use log::debug;
use ndarray::{Array2, ArrayView2, Axis, Zip};

use crate::error::{LensrayError, Result};
use crate::ndarray_utils::{central_diff_weights, correlate1d, crop_border, find_non_finite};
use crate::Float;

/// Width of the central difference stencil.
pub const STENCIL_WIDTH: usize = 3;

/// Check that `arrival` covers the stencil footprint and holds only finite values.
pub(crate) fn validate_surface<F: Float>(arrival: ArrayView2<F>) -> Result<()> {
    let (rows, cols) = arrival.dim();
    if rows < STENCIL_WIDTH || cols < STENCIL_WIDTH {
        return Err(LensrayError::Shape { rows, cols });
    }
    if let Some((row, col)) = find_non_finite(arrival) {
        return Err(LensrayError::NonFinite { row, col });
    }
    Ok(())
}

/// Approximate `|d/drow| + |d/dcol|` of the arrival-time surface on its interior.
///
/// Each axis is correlated with the three-point central difference weights,
/// zero-padded at the edges. Since the padded edges are meaningless, one
/// pixel is cropped from every side, so a grid of shape `(m, n)` results
/// in a magnitude grid of shape `(m - 2, n - 2)`.
///
/// # Example:
/// ```
/// # use ndarray::array;
/// # use lensray::gradient::gradient_magnitude;
/// let arrival: ndarray::Array2<f64> = array![[0., 1., 2.], [1., 2., 3.], [2., 3., 4.]];
/// let magnitude = gradient_magnitude(arrival.view()).unwrap();
/// assert_eq!(magnitude.dim(), (1, 1));
/// assert!((magnitude[[0, 0]] - 2.).abs() < 1e-12);
/// ```
pub fn gradient_magnitude<F: Float>(arrival: ArrayView2<F>) -> Result<Array2<F>> {
    validate_surface(arrival)?;

    let weights = central_diff_weights::<F>(STENCIL_WIDTH, 1)?;
    let d_rows = correlate1d(arrival, &weights, Axis(0));
    let d_cols = correlate1d(arrival, &weights, Axis(1));

    let magnitude = Zip::from(crop_border(d_rows.view()))
        .and(crop_border(d_cols.view()))
        .map_collect(|&a, &b| a.abs() + b.abs());
    debug!("Computed gradient magnitude on a {:?} interior.", magnitude.dim());

    Ok(magnitude)
}
