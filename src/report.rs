//! Time-delay reports in the input format of the lens modelling tool.
//!
//! A report lists the images of one source, labelled `A`, `B`, ... in order of
//! arrival, followed by a `source(...)` directive with the redshift of the source
//! and the physical time delay of every image relative to the image before it:
//!
//! ```text
//! A = 1.5000, 2.0000
//! B = 5.5000, 2.0000
//! source(1.20,A,'min', B,'',0.2000)
//! ```

use std::fmt;

use itertools::Itertools;
use log::info;
use nalgebra::Vector2;

use crate::error::{LensrayError, Result};
use crate::model::LensModel;
use crate::raytrace::ImageSequence;
use crate::Float;

/// Delays below this magnitude are written in scientific notation.
pub const SCIENTIFIC_THRESHOLD: f64 = 1e-4;

/// Label of the image at position `index` of a sequence.
///
/// Labels run `A` to `Z`, then continue with two letters `AA`, `AB`, ... and so on.
///
/// # Example:
/// ```
/// # use lensray::report::image_label;
/// assert_eq!(image_label(0), "A");
/// assert_eq!(image_label(26), "AA");
/// ```
pub fn image_label(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(char::from(b'A' + (n % 26) as u8));
        n /= 26;
    }
    letters.into_iter().rev().collect()
}

/// Format a physical time delay.
///
/// Delays smaller than [`SCIENTIFIC_THRESHOLD`] in magnitude are written with four
/// decimals in scientific notation and a signed exponent of at least two digits,
/// e.g. `5.0000e-05`. Larger ones are written with four decimals, e.g. `0.1234`.
pub fn format_delay(delay: f64) -> String {
    if delay.abs() >= SCIENTIFIC_THRESHOLD {
        return format!("{:.4}", delay);
    }

    let formatted = format!("{:.4e}", delay);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exponent.abs())
        }
        None => formatted,
    }
}

/// Convert a dimensionless arrival-time difference into a physical time delay.
///
/// The delay scales with the inverse Hubble parameter of `sample` and with the
/// square of the model's top-level cell size.
pub fn physical_delay<F, M>(model: &M, sample: &M::Sample, dt: F) -> F
where
    F: Float,
    M: LensModel<F>,
{
    let cell_size = model.top_level_cell_size();
    model.time_to_physical(dt) * model.inverse_hubble(sample) * cell_size * cell_size
}

/// Labelled images of one source together with their physical time delays.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeDelayReport<F: Float> {
    /// Redshift of the source.
    pub redshift: F,
    /// Label and position of every image, in order of arrival.
    pub images: Vec<(String, Vector2<F>)>,
    /// Physical delay of every image after the first relative to the image before it.
    pub delays: Vec<F>,
}

impl<F: Float> TimeDelayReport<F> {
    /// Build the report for the images `seq` of image system `system`.
    ///
    /// # Returns
    /// `None` if `seq` is empty. The model is not consulted in that case.
    ///
    /// # Errors
    /// [`LensrayError::UnknownSystem`] if the model has no redshift for `system`.
    pub fn new<M>(
        model: &M,
        sample: &M::Sample,
        system: usize,
        seq: &ImageSequence<F>,
    ) -> Result<Option<Self>>
    where
        M: LensModel<F>,
    {
        if seq.is_empty() {
            return Ok(None);
        }

        let redshift = model
            .source_redshift(system)
            .ok_or(LensrayError::UnknownSystem(system))?;
        let images = seq
            .iter()
            .enumerate()
            .map(|(k, img)| (image_label(k), img.position))
            .collect_vec();
        let delays = seq
            .delays()
            .into_iter()
            .map(|dt| physical_delay(model, sample, dt))
            .collect_vec();

        Ok(Some(Self {
            redshift,
            images,
            delays,
        }))
    }
}

fn to_f64<F: Float>(x: F) -> f64 {
    x.to_f64().unwrap_or(f64::NAN)
}

impl<F: Float> fmt::Display for TimeDelayReport<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.images.is_empty() {
            return Ok(());
        }

        for (label, position) in &self.images {
            writeln!(
                f,
                "{} = {:.4}, {:.4}",
                label,
                to_f64(position.x),
                to_f64(position.y)
            )?;
        }

        write!(f, "source({:.2},{},'min'", to_f64(self.redshift), self.images[0].0)?;
        for ((label, _), delay) in self.images.iter().skip(1).zip(&self.delays) {
            write!(f, ", {},'',{}", label, format_delay(to_f64(*delay)))?;
        }
        writeln!(f, ")")
    }
}

/// Write the time-delay report of the images `seq` of image system `system`.
///
/// Returns an empty string if `seq` is empty.
pub fn write_code<F, M>(
    model: &M,
    sample: &M::Sample,
    system: usize,
    seq: &ImageSequence<F>,
) -> Result<String>
where
    F: Float,
    M: LensModel<F>,
{
    info!("Writing time-delay report of system {}.", system);
    Ok(TimeDelayReport::new(model, sample, system, seq)?
        .map(|report| report.to_string())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::*;
    use crate::model::PrecomputedModel;
    use crate::raytrace::ImageCandidate;

    fn model(time_scale: f64, cell_size: f64) -> PrecomputedModel<f64> {
        PrecomputedModel {
            arrival_grids: Vec::new(),
            coordinates: Array2::from_elem((3, 3), Vector2::zeros()),
            redshifts: vec![1.2, 0.657],
            cell_size,
            time_scale,
        }
    }

    fn sequence(images: &[(f64, f64, f64)]) -> ImageSequence<f64> {
        ImageSequence::new(
            images
                .iter()
                .enumerate()
                .map(|(offset, &(x, y, time))| ImageCandidate {
                    offset,
                    position: Vector2::new(x, y),
                    time,
                })
                .collect_vec(),
        )
    }

    #[test]
    fn labels() {
        assert_eq!(image_label(1), "B");
        assert_eq!(image_label(25), "Z");
        assert_eq!(image_label(27), "AB");
        assert_eq!(image_label(51), "AZ");
        assert_eq!(image_label(52), "BA");
        assert_eq!(image_label(701), "ZZ");
        assert_eq!(image_label(702), "AAA");
    }

    #[test]
    fn delay_formats() {
        assert_eq!(format_delay(0.1234), "0.1234");
        assert_eq!(format_delay(12.34567), "12.3457");
        assert_eq!(format_delay(5e-5), "5.0000e-05");
        assert_eq!(format_delay(1.23456e-7), "1.2346e-07");
        assert_eq!(format_delay(0.), "0.0000e+00");
        assert_eq!(format_delay(1e-4), "0.0001");
    }

    #[test]
    fn empty_sequence_writes_nothing() {
        // The redshift lookup would fail for this system if it happened.
        let code = write_code(&model(1., 1.), &1., 7, &ImageSequence::default()).unwrap();
        assert_eq!(code, "");
    }

    #[test]
    fn single_image() {
        let seq = sequence(&[(0.25, -0.5, 3.)]);
        let code = write_code(&model(1., 1.), &1., 1, &seq).unwrap();
        assert_eq!(code, "A = 0.2500, -0.5000\nsource(0.66,A,'min')\n");
    }

    #[test]
    fn three_images() {
        let seq = sequence(&[(3.5, 2., 16.), (1.5, 2., -0.2), (5.5, 2., 0.2)]);
        let code = write_code(&model(2., 0.5), &1., 0, &seq).unwrap();
        assert_eq!(
            code,
            "A = 1.5000, 2.0000\n\
             B = 5.5000, 2.0000\n\
             C = 3.5000, 2.0000\n\
             source(1.20,A,'min', B,'',0.2000, C,'',7.9000)\n"
        );
    }

    #[test]
    fn small_delays_in_scientific_notation() {
        let seq = sequence(&[(0., 0., 0.), (1., 0., 0.5)]);
        let code = write_code(&model(1e-4, 1.), &1., 0, &seq).unwrap();
        assert!(code.ends_with("source(1.20,A,'min', B,'',5.0000e-05)\n"));
    }

    #[test]
    fn delays_scale_with_sample() {
        let seq = sequence(&[(0., 0., 0.), (1., 0., 1.)]);
        let report = TimeDelayReport::new(&model(3., 2.), &0.5, 0, &seq)
            .unwrap()
            .unwrap();
        assert_eq!(report.delays, vec![6.]);
    }

    #[test]
    fn unknown_system() {
        let seq = sequence(&[(0., 0., 0.)]);
        assert_eq!(
            write_code(&model(1., 1.), &1., 2, &seq),
            Err(LensrayError::UnknownSystem(2))
        );
    }
}
