//! Image search on arrival-time surfaces and main interface.

use std::cmp::Ordering;
use std::ops::Deref;

use itertools::Itertools;
use log::{debug, info, warn};
use nalgebra::Vector2;
use ndarray::Array2;

use crate::error::{LensrayError, Result};
use crate::gradient::gradient_magnitude;
use crate::model::LensModel;
use crate::ndarray_utils::{argsort_by, crop_border, IntoCoordinateGrid};
use crate::Float;

/// Order among interior pixels of equal gradient magnitude.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TieBreak {
    /// Keep the row-major order of the interior pixels.
    #[default]
    RowMajor,
    /// Prefer the lower arrival time, then fall back to row-major order.
    LowestArrival,
}

/// A lensed image found on the arrival-time surface.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageCandidate<F: Float> {
    /// Row-major index into the interior of the grid, i.e. without its border.
    pub offset: usize,
    /// Image-plane position.
    pub position: Vector2<F>,
    /// Arrival time at `position`.
    pub time: F,
}

/// Images of one source, ordered by arrival time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImageSequence<F: Float> {
    images: Vec<ImageCandidate<F>>,
}

impl<F: Float> ImageSequence<F> {
    /// Sort `images` by arrival time. Images arriving at the same time keep their order.
    pub fn new(mut images: Vec<ImageCandidate<F>>) -> Self {
        images.sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(Ordering::Equal));
        Self { images }
    }

    /// Arrival times in sequence order.
    pub fn times(&self) -> Vec<F> {
        self.images.iter().map(|img| img.time).collect_vec()
    }

    /// Positions in sequence order.
    pub fn positions(&self) -> Vec<Vector2<F>> {
        self.images.iter().map(|img| img.position).collect_vec()
    }

    /// Arrival time of each image relative to the one before it, starting with the second image.
    pub fn delays(&self) -> Vec<F> {
        self.images
            .iter()
            .tuple_windows()
            .map(|(prev, next)| next.time - prev.time)
            .collect_vec()
    }
}

impl<F: Float> Deref for ImageSequence<F> {
    type Target = [ImageCandidate<F>];

    fn deref(&self) -> &Self::Target {
        &self.images
    }
}

impl<F: Float> IntoIterator for ImageSequence<F> {
    type Item = ImageCandidate<F>;

    type IntoIter = std::vec::IntoIter<ImageCandidate<F>>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.into_iter()
    }
}

impl<'a, F: Float> IntoIterator for &'a ImageSequence<F> {
    type Item = &'a ImageCandidate<F>;

    type IntoIter = std::slice::Iter<'a, ImageCandidate<F>>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.iter()
    }
}

/// The central struct of this library.
///
/// Holds an arrival-time surface with the positions of its pixels and the search options.
/// Options are set via `with_*` functions.
///
/// # Example:
/// ```
/// # use ndarray::Array2;
/// # use nalgebra::Vector2;
/// # use lensray::ImageFinder;
/// let coords = Array2::from_shape_fn((5, 5), |(i, j)| Vector2::new(j as f64, i as f64));
/// let arrival = coords.mapv(|p| (p.x - 2.).powi(2) + (p.y - 2.).powi(2));
/// let images = ImageFinder::new(arrival, coords)
///     .unwrap()
///     .with_max_images(1)
///     .with_eps(0.01)
///     .find_images()
///     .unwrap();
/// assert_eq!(images[0].position, Vector2::new(2., 2.));
/// ```
#[derive(Clone, Debug)]
pub struct ImageFinder<F: Float> {
    /// Arrival-time surface. Shape `(rows, cols)`.
    arrival: Array2<F>,
    /// Position of every pixel of `arrival`.
    coords: Array2<Vector2<F>>,
    /// Maximum number of images, unlimited if `None`.
    max_images: Option<usize>,
    /// Accepted images are separated by more than this distance.
    eps: F,
    /// Order among pixels of equal gradient magnitude.
    tie_break: TieBreak,
}

impl<F: Float> ImageFinder<F> {
    /// Create a new instance using default options.
    ///
    /// # Arguments
    /// - `arrival`: Arrival-time surface. Shape `(rows, cols)`.
    /// - `coords`: Position of every pixel, same shape as `arrival`.
    ///
    /// # Errors
    /// [`LensrayError::ShapeMismatch`] if the two grids differ in shape.
    pub fn new<C>(arrival: Array2<F>, coords: C) -> Result<Self>
    where
        C: IntoCoordinateGrid<F>,
    {
        let coords = coords.into_coordinate_grid()?;
        if arrival.shape() != coords.shape() {
            return Err(LensrayError::ShapeMismatch {
                arrival: arrival.shape().to_vec(),
                coords: coords.shape().to_vec(),
            });
        }

        Ok(Self {
            arrival,
            coords,
            max_images: None,
            eps: F::zero(),
            tie_break: TieBreak::default(),
        })
    }

    /// Set the maximum number of images.
    pub fn with_max_images(mut self, max_images: usize) -> Self {
        self.max_images = Some(max_images);
        self
    }

    /// Set the minimum separation between images.
    pub fn with_eps(mut self, eps: F) -> Self {
        self.eps = eps;
        self
    }

    /// Set the order among pixels of equal gradient magnitude.
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Find the images on the arrival-time surface.
    ///
    /// Interior pixels are visited from the flattest to the steepest. A pixel
    /// becomes an image if it lies farther than `eps` from every image found before,
    /// until `max_images` images are found.
    ///
    /// # Returns
    /// The images sorted by arrival time. This is empty if no pixel was accepted.
    ///
    /// # Errors
    /// - [`LensrayError::InvalidTolerance`] if `eps` is negative or NaN.
    /// - [`LensrayError::Shape`] if the surface is smaller than 3x3.
    /// - [`LensrayError::NonFinite`] if the surface holds NaN or infinite values.
    pub fn find_images(&self) -> Result<ImageSequence<F>> {
        if !(self.eps >= F::zero()) {
            return Err(LensrayError::InvalidTolerance);
        }

        info!("Computing gradient magnitude.");
        let magnitude = gradient_magnitude(self.arrival.view())?;
        let magnitude = magnitude.iter().copied().collect_vec();
        let times = crop_border(self.arrival.view()).iter().copied().collect_vec();
        let positions = crop_border(self.coords.view()).into_iter().collect_vec();

        let order = match self.tie_break {
            TieBreak::RowMajor => argsort_by(&magnitude, |_, _| Ordering::Equal),
            TieBreak::LowestArrival => argsort_by(&magnitude, |a, b| {
                times[a].partial_cmp(&times[b]).unwrap_or(Ordering::Equal)
            }),
        };

        info!("Searching {} interior pixels for images.", order.len());
        let mut accepted: Vec<usize> = Vec::new();
        let mut rejected = 0usize;
        let mut ties = 0usize;
        for (k, &i) in order.iter().enumerate() {
            if self.max_images == Some(accepted.len()) {
                break;
            }

            let position = positions[i];
            if accepted
                .iter()
                .any(|&j| (positions[j] - position).norm() <= self.eps)
            {
                rejected += 1;
                continue;
            }

            if order
                .get(k + 1)
                .is_some_and(|&next| magnitude[next] == magnitude[i])
            {
                ties += 1;
            }
            accepted.push(i);
        }

        debug!(
            "Accepted {} images, rejected {} pixels closer than {:?}.",
            accepted.len(),
            rejected,
            self.eps
        );
        if ties > 0 {
            warn!(
                "{} images were chosen among pixels of equal gradient magnitude in {:?} order.",
                ties, self.tie_break
            );
        }

        let images = accepted
            .into_iter()
            .map(|i| ImageCandidate {
                offset: i,
                position: *positions[i],
                time: times[i],
            })
            .collect_vec();
        Ok(ImageSequence::new(images))
    }
}

/// Find the images of image system `system`.
///
/// # Arguments
/// - `arrival_grids`: Arrival-time surfaces, indexed by image system.
/// - `coords`: Position of every pixel, same shape as the surfaces.
/// - `system`: Index of the image system to search.
/// - `max_images`: Maximum number of images, unlimited if `None`.
/// - `eps`: Minimum separation between images.
pub fn raytrace<F, C>(
    arrival_grids: &[Array2<F>],
    coords: C,
    system: usize,
    max_images: Option<usize>,
    eps: F,
) -> Result<ImageSequence<F>>
where
    F: Float,
    C: IntoCoordinateGrid<F>,
{
    let arrival = arrival_grids
        .get(system)
        .ok_or(LensrayError::UnknownSystem(system))?;
    search(arrival.clone(), coords, system, max_images, eps)
}

/// Find the images of image system `system` of `model` evaluated at `sample`.
///
/// Also see [`raytrace`].
pub fn raytrace_model<F, M>(
    model: &M,
    sample: &M::Sample,
    system: usize,
    max_images: Option<usize>,
    eps: F,
) -> Result<ImageSequence<F>>
where
    F: Float,
    M: LensModel<F>,
{
    let arrival = model
        .arrival_grid(sample, system)
        .ok_or(LensrayError::UnknownSystem(system))?;
    search(arrival, model.coordinate_grid(sample), system, max_images, eps)
}

fn search<F, C>(
    arrival: Array2<F>,
    coords: C,
    system: usize,
    max_images: Option<usize>,
    eps: F,
) -> Result<ImageSequence<F>>
where
    F: Float,
    C: IntoCoordinateGrid<F>,
{
    info!("Searching images of system {}.", system);
    let mut finder = ImageFinder::new(arrival, coords)?.with_eps(eps);
    if let Some(max_images) = max_images {
        finder = finder.with_max_images(max_images);
    }
    finder.find_images()
}

#[cfg(feature = "parallel")]
pub use parallel::*;

#[cfg(feature = "parallel")]
mod parallel {
    use super::*;
    use rayon::prelude::*;

    /// Find the images of several image systems of `model`, in parallel.
    ///
    /// Also see [`raytrace_model`] for more details. The results are in the order of `systems`.
    pub fn raytrace_systems_par<F, M>(
        model: &M,
        sample: &M::Sample,
        systems: &[usize],
        max_images: Option<usize>,
        eps: F,
    ) -> Result<Vec<ImageSequence<F>>>
    where
        F: Float,
        M: LensModel<F> + Sync,
        M::Sample: Sync,
    {
        info!("Searching {} image systems in parallel.", systems.len());
        systems
            .par_iter()
            .map(|&system| raytrace_model(model, sample, system, max_images, eps))
            .collect()
    }
}
