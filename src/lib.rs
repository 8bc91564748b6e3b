#![warn(missing_docs)]

//! Image finding on the arrival-time surfaces of gravitational lens models. \
//! No lens models are built here. Given the arrival-time surface of one lensed source,
//! sampled on a grid, this finds the image positions, orders them by arrival time, and
//! writes the time delays between them in the input format of the lens modelling tool.
//!
//! ## Interface
//! The central struct of this library is [`ImageFinder`]. It holds an arrival-time surface
//! and the positions of its pixels, and is configured via `ImageFinder::with_*()` functions.
//!
//! Example:
//! ```rust
//! # use ndarray::Array2;
//! # use nalgebra::Vector2;
//! # use lensray::ImageFinder;
//! # let coords = Array2::from_shape_fn((5, 5), |(i, j)| Vector2::new(j as f64, i as f64));
//! # let arrival = coords.mapv(|p| p.norm_squared());
//! ImageFinder::new(arrival, coords)
//!     .unwrap()
//!     .with_max_images(4)
//!     .with_eps(0.5);
//! ```
//!
//! The surfaces can also be requested from a lens model through the [`LensModel`] trait,
//! see [`raytrace_model`]. With the `parallel` feature, several image systems can be
//! searched at once.
//!
//! The images found are turned into a report with [`report::write_code`].
//!
//! ## Parameters
//! - `eps`: Minimum distance between two images, in the units of the pixel positions.
//!     Pixels closer than this to an image already found are skipped.
//! - `max_images`: Maximum number of images. The search stops once this many were found.
//! - `tie_break`: Order among pixels of the same gradient magnitude, see [`TieBreak`].
//!
//! ## Ensembles
//! The [`hubble`] module computes median and percentile ranges of the Hubble constant
//! over the models of an ensemble.

pub(crate) mod error;
pub mod gradient;
pub mod hubble;
pub mod model;
pub(crate) mod ndarray_utils;
pub mod raytrace;
pub mod report;

pub use error::{LensrayError, Result};
pub use model::{LensModel, PrecomputedModel};
pub use ndarray_utils::{central_diff_weights, IntoCoordinateGrid};
pub use raytrace::{
    raytrace, raytrace_model, ImageCandidate, ImageFinder, ImageSequence, TieBreak,
};
#[cfg(feature = "parallel")]
pub use raytrace::raytrace_systems_par;
pub use report::{write_code, TimeDelayReport};

/// A generic float trait such that the image search is generic over `f32`/`f64`.
///
/// This trait is automatically implemented for all types implementing the supertraits.
/// Particularly, this includes `f32` and `f64`.
/// [`num_traits::Float`] is not a supertrait as the need to specify the provider of the redundant definitions of the basic math functions would clutter the code.
pub trait Float:
    Copy + Default + nalgebra::RealField + num_traits::FromPrimitive + num_traits::ToPrimitive
{
}

impl<F> Float for F where
    F: Copy + Default + nalgebra::RealField + num_traits::FromPrimitive + num_traits::ToPrimitive
{
}
