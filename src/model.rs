//! Interface to the lens modelling library that produced the arrival-time surfaces.
//!
//! Nothing in this crate builds lens models. Everything a search or a report needs
//! from a model is requested through [`LensModel`], so the caller decides where
//! grids, distances and parameter samples come from.

use nalgebra::Vector2;
use ndarray::Array2;

use crate::Float;

/// A lens model together with the parameter samples drawn for it.
pub trait LensModel<F: Float> {
    /// One sample of the model's free parameters.
    type Sample;

    /// Number of image systems, i.e. lensed sources, in the model.
    fn n_systems(&self) -> usize;

    /// Arrival-time surface of image system `system` for `sample`.
    ///
    /// Returns `None` if the model has no such system.
    fn arrival_grid(&self, sample: &Self::Sample, system: usize) -> Option<Array2<F>>;

    /// Image-plane position of every pixel of the arrival-time surfaces.
    fn coordinate_grid(&self, sample: &Self::Sample) -> Array2<Vector2<F>>;

    /// Redshift of the source of image system `system`.
    fn source_redshift(&self, system: usize) -> Option<F>;

    /// Size of a top-level cell of the spatial discretisation.
    fn top_level_cell_size(&self) -> F;

    /// Convert a dimensionless arrival-time difference into physical units at the lens distance.
    fn time_to_physical(&self, dt: F) -> F;

    /// Inverse Hubble parameter of `sample`.
    fn inverse_hubble(&self, sample: &Self::Sample) -> F;
}

/// A lens model whose surfaces were evaluated beforehand.
///
/// The only sampled parameter is the inverse Hubble constant, so
/// `Sample = F`. Time conversion is a constant factor.
#[derive(Clone, Debug)]
pub struct PrecomputedModel<F: Float> {
    /// One arrival-time surface per image system.
    pub arrival_grids: Vec<Array2<F>>,
    /// Positions shared by all surfaces.
    pub coordinates: Array2<Vector2<F>>,
    /// One source redshift per image system.
    pub redshifts: Vec<F>,
    /// Top-level cell size.
    pub cell_size: F,
    /// Physical time units per dimensionless time unit.
    pub time_scale: F,
}

impl<F: Float> LensModel<F> for PrecomputedModel<F> {
    type Sample = F;

    fn n_systems(&self) -> usize {
        self.arrival_grids.len()
    }

    fn arrival_grid(&self, _sample: &F, system: usize) -> Option<Array2<F>> {
        self.arrival_grids.get(system).cloned()
    }

    fn coordinate_grid(&self, _sample: &F) -> Array2<Vector2<F>> {
        self.coordinates.clone()
    }

    fn source_redshift(&self, system: usize) -> Option<F> {
        self.redshifts.get(system).copied()
    }

    fn top_level_cell_size(&self) -> F {
        self.cell_size
    }

    fn time_to_physical(&self, dt: F) -> F {
        dt * self.time_scale
    }

    fn inverse_hubble(&self, sample: &F) -> F {
        *sample
    }
}
