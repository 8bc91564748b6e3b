//! A collection of various utilities needed in this library.
//! The two main groups are conversions of the different coordinate grid layouts
//! into one of `nalgebra` points, and stencil operations on arrays.

use std::cmp::Ordering;

use itertools::Itertools;
use nalgebra::{Complex, DMatrix, Vector2};
use ndarray::{s, Array2, Array3, ArrayView2, Axis, Slice, Zip};

use crate::error::{LensrayError, Result};
use crate::Float;

/// Conversion into a grid of 2D image-plane positions.
///
/// Implemented for grids of [`Vector2`], grids of [`Complex`] numbers
/// (real part is `x`, imaginary part is `y`) and `(rows, cols, 2)` arrays.
pub trait IntoCoordinateGrid<F: Float> {
    /// Convert into a grid of positions.
    fn into_coordinate_grid(self) -> Result<Array2<Vector2<F>>>;
}

impl<F: Float> IntoCoordinateGrid<F> for Array2<Vector2<F>> {
    fn into_coordinate_grid(self) -> Result<Array2<Vector2<F>>> {
        Ok(self)
    }
}

impl<F: Float> IntoCoordinateGrid<F> for Array2<Complex<F>> {
    fn into_coordinate_grid(self) -> Result<Array2<Vector2<F>>> {
        Ok(self.mapv(|c| Vector2::new(c.re, c.im)))
    }
}

impl<F: Float> IntoCoordinateGrid<F> for Array3<F> {
    fn into_coordinate_grid(self) -> Result<Array2<Vector2<F>>> {
        let (rows, cols, dim) = self.dim();
        if dim != 2 {
            return Err(LensrayError::ShapeMismatch {
                arrival: vec![rows, cols, 2],
                coords: self.shape().to_vec(),
            });
        }
        Ok(Array2::from_shape_fn((rows, cols), |(i, j)| {
            Vector2::new(self[[i, j, 0]], self[[i, j, 1]])
        }))
    }
}

/// Weights of the `points`-point central difference stencil of the derivative of order `order`.
///
/// The weights are the `order`-th row of the inverse Vandermonde matrix of the
/// stencil offsets `-points/2..=points/2`, scaled by `order!`.
/// For `(3, 1)` these are `[-0.5, 0, 0.5]`.
pub fn central_diff_weights<F: Float>(points: usize, order: usize) -> Result<Vec<F>> {
    if points < order + 1 || points % 2 == 0 {
        return Err(LensrayError::InvalidStencil { points, order });
    }

    let half = (points / 2) as f64;
    let vandermonde =
        DMatrix::<f64>::from_fn(points, points, |i, k| (i as f64 - half).powi(k as i32));
    let inverse = vandermonde
        .try_inverse()
        .ok_or(LensrayError::InvalidStencil { points, order })?;
    let factorial: f64 = (1..=order).map(|k| k as f64).product();

    // Central stencils are symmetric for even and antisymmetric for odd orders.
    let row = inverse.row(order).iter().copied().collect_vec();
    let parity = if order % 2 == 0 { 1. } else { -1. };
    (0..points)
        .map(|k| 0.5 * (row[k] + parity * row[points - 1 - k]) * factorial)
        .map(|w| F::from_f64(w).ok_or(LensrayError::InvalidStencil { points, order }))
        .collect()
}

/// Correlate `arr` with `weights` along `axis`, treating everything outside the grid as zero.
///
/// The stencil is centred, i.e. `out[i] = sum_j weights[j] * arr[i + j - weights.len() / 2]`.
pub(crate) fn correlate1d<F: Float>(arr: ArrayView2<F>, weights: &[F], axis: Axis) -> Array2<F> {
    let len = arr.len_of(axis) as isize;
    let half = (weights.len() / 2) as isize;
    let mut out = Array2::zeros(arr.raw_dim());

    for (j, &w) in weights.iter().enumerate() {
        let shift = j as isize - half;
        let lo = (-shift).max(0);
        let hi = (len - shift).min(len);
        if lo >= hi {
            continue;
        }

        let src = arr.slice_axis(axis, Slice::from(lo + shift..hi + shift));
        Zip::from(out.slice_axis_mut(axis, Slice::from(lo..hi)))
            .and(src)
            .for_each(|o, &x| *o += w * x);
    }

    out
}

/// View of `arr` without its outermost rows and columns.
pub(crate) fn crop_border<T>(arr: ArrayView2<'_, T>) -> ArrayView2<'_, T> {
    arr.slice_move(s![1..-1, 1..-1])
}

/// Stable argsort of a flat sequence.
///
/// Equal keys are resolved by `tie`, and if still equal keep their original order.
pub(crate) fn argsort_by<F, T>(keys: &[F], mut tie: T) -> Vec<usize>
where
    F: Float,
    T: FnMut(usize, usize) -> Ordering,
{
    (0..keys.len())
        .sorted_by(|&a, &b| {
            keys[a]
                .partial_cmp(&keys[b])
                .unwrap_or(Ordering::Equal)
                .then_with(|| tie(a, b))
        })
        .collect_vec()
}

/// Position of the first non-finite value in row-major order.
pub(crate) fn find_non_finite<F: Float>(arr: ArrayView2<F>) -> Option<(usize, usize)> {
    arr.indexed_iter()
        .find(|(_, v)| !v.is_finite())
        .map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array};

    use super::*;

    #[test]
    fn three_point_first_derivative() {
        let w: Vec<f64> = central_diff_weights(3, 1).unwrap();
        assert_abs_diff_eq!(w.as_slice(), [-0.5, 0., 0.5].as_slice(), epsilon = 1e-12);
    }

    #[test]
    fn five_point_weights() {
        let first: Vec<f64> = central_diff_weights(5, 1).unwrap();
        let expected = [1. / 12., -8. / 12., 0., 8. / 12., -1. / 12.];
        assert_abs_diff_eq!(first.as_slice(), expected.as_slice(), epsilon = 1e-10);

        let second: Vec<f64> = central_diff_weights(3, 2).unwrap();
        assert_abs_diff_eq!(second.as_slice(), [1., -2., 1.].as_slice(), epsilon = 1e-10);
    }

    #[test]
    fn invalid_stencils() {
        assert_eq!(
            central_diff_weights::<f64>(4, 1),
            Err(LensrayError::InvalidStencil {
                points: 4,
                order: 1
            })
        );
        assert!(central_diff_weights::<f64>(3, 3).is_err());
    }

    #[test]
    fn correlate_constant_mode() {
        let arr = array![[1., 2., 4.], [0., 0., 0.]];
        let w = [-0.5, 0., 0.5];

        let along_cols = correlate1d(arr.view(), &w, Axis(1));
        assert_abs_diff_eq!(along_cols, array![[1., 1.5, -1.], [0., 0., 0.]]);

        let along_rows = correlate1d(arr.view(), &w, Axis(0));
        assert_abs_diff_eq!(along_rows, array![[0., 0., 0.], [-0.5, -1., -2.]]);
    }

    #[test]
    fn crop() {
        let arr = Array::from_shape_vec((3, 4), (0..12).collect_vec()).unwrap();
        assert_eq!(crop_border(arr.view()), array![[5, 6]]);
    }

    #[test]
    fn argsort_is_stable() {
        let keys = [2., 1., 2., 0., 1.];
        assert_eq!(argsort_by(&keys, |_, _| Ordering::Equal), vec![3, 1, 4, 0, 2]);
        assert_eq!(argsort_by(&keys, |a, b| b.cmp(&a)), vec![3, 4, 1, 2, 0]);
    }

    #[test]
    fn complex_grid() {
        let grid = array![[Complex::<f64>::new(1., 2.), Complex::new(3., 4.)]];
        let points = grid.into_coordinate_grid().unwrap();
        assert_eq!(points[[0, 1]], Vector2::new(3., 4.));
    }

    #[test]
    fn array3_grid() {
        let grid = Array3::from_shape_fn((2, 3, 2), |(i, j, k)| (i * 10 + j) as f64 + k as f64 * 0.5);
        let points = grid.into_coordinate_grid().unwrap();
        assert_eq!(points.dim(), (2, 3));
        assert_eq!(points[[1, 2]], Vector2::new(12., 12.5));

        let bad = Array3::<f64>::zeros((2, 3, 3));
        assert!(bad.into_coordinate_grid().is_err());
    }

    #[test]
    fn non_finite() {
        let arr = array![[0., 1.], [f64::NAN, f64::INFINITY]];
        assert_eq!(find_non_finite(arr.view()), Some((1, 0)));
        assert_eq!(find_non_finite(array![[0., 1.]].view()), None);
    }
}
