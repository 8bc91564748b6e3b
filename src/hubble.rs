//! Hubble constant statistics over a model ensemble.
//!
//! Every model of an ensemble may carry an H0 value per lens object and may be
//! tagged as accepted or rejected by the sampler. The statistics are taken over
//! the models of one tag, by default the accepted ones.

use std::cmp::Ordering;
use std::fmt;

use itertools::Itertools;
use log::{debug, info};

use crate::Float;

/// Which models of an ensemble enter the statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Selection {
    /// Models tagged as accepted.
    #[default]
    Accepted,
    /// Models tagged as rejected.
    Rejected,
    /// Models without a tag.
    Untagged,
}

impl Selection {
    fn matches(self, tag: Option<bool>) -> bool {
        match self {
            Selection::Accepted => tag == Some(true),
            Selection::Rejected => tag == Some(false),
            Selection::Untagged => tag.is_none(),
        }
    }
}

/// Width of the central range between the low and high values.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum SigmaLevel {
    /// 68.27%.
    #[default]
    One,
    /// 95.45%.
    Two,
    /// 99.73%.
    Three,
    /// The full range of the samples.
    All,
    /// Any fraction in `[0, 1]`.
    Fraction(f64),
}

impl SigmaLevel {
    /// Fraction of the samples inside the range.
    pub fn fraction(self) -> f64 {
        match self {
            SigmaLevel::One => 0.6827,
            SigmaLevel::Two => 0.9545,
            SigmaLevel::Three => 0.9973,
            SigmaLevel::All => 1.0,
            SigmaLevel::Fraction(f) => f.clamp(0., 1.),
        }
    }
}

/// How the low and high values around the median are obtained.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Spread {
    /// Percentiles enclosing the sigma level. The high percentile is rounded up
    /// to the next sample, the low one down to the previous sample.
    #[default]
    Percentile,
    /// Median plus and minus the standard deviation. The sigma level is ignored.
    StdDev,
}

/// One model of an ensemble.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelSample<F: Float> {
    /// Acceptance tag, `None` if the model was never tagged.
    pub accepted: Option<bool>,
    /// H0 of every lens object, if the model provides one.
    pub h0: Vec<Option<F>>,
}

/// H0 values of lens object `object` over the models chosen by `selection`.
pub fn hubble_samples<F: Float>(
    models: &[ModelSample<F>],
    object: usize,
    selection: Selection,
) -> Vec<F> {
    models
        .iter()
        .filter(|m| selection.matches(m.accepted))
        .filter_map(|m| m.h0.get(object).copied().flatten())
        .collect_vec()
}

/// Median of the Hubble constant with a low and a high value around it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HubbleStats<F: Float> {
    /// Median of the samples.
    pub median: F,
    /// Upper end of the range.
    pub high: F,
    /// Lower end of the range.
    pub low: F,
}

impl<F: Float> HubbleStats<F> {
    /// Compute the statistics of `samples`. Returns `None` if there are no samples.
    pub fn from_samples(samples: &[F], sigma: SigmaLevel, spread: Spread) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let sorted = samples
            .iter()
            .copied()
            .sorted_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
            .collect_vec();
        let median = median_sorted(&sorted);

        let (high, low) = match spread {
            Spread::Percentile => {
                let q_high = 0.5 + sigma.fraction() / 2.;
                (
                    sorted[percentile_index(sorted.len(), q_high, f64::ceil)],
                    sorted[percentile_index(sorted.len(), 1. - q_high, f64::floor)],
                )
            }
            Spread::StdDev => {
                let std = std_dev(&sorted);
                (median + std, median - std)
            }
        };

        Some(Self { median, high, low })
    }

    /// Half the width of the range between `low` and `high`.
    pub fn error(&self) -> F {
        (self.high - self.low) / (F::one() + F::one())
    }
}

impl<F: Float> fmt::Display for HubbleStats<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2} \t{:.2}",
            self.median.to_f64().unwrap_or(f64::NAN),
            self.error().to_f64().unwrap_or(f64::NAN)
        )
    }
}

fn median_sorted<F: Float>(sorted: &[F]) -> F {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / (F::one() + F::one())
    }
}

/// Index of the `q`-quantile into `n` sorted samples, rounded by `round`.
fn percentile_index(n: usize, q: f64, round: fn(f64) -> f64) -> usize {
    let index = round(q * (n - 1) as f64);
    (index.max(0.) as usize).min(n - 1)
}

fn std_dev<F: Float>(samples: &[F]) -> F {
    let n = F::from_usize(samples.len()).unwrap_or_else(F::one);
    let mean = samples.iter().fold(F::zero(), |acc, &x| acc + x) / n;
    let var = samples
        .iter()
        .fold(F::zero(), |acc, &x| acc + (x - mean) * (x - mean))
        / n;
    var.sqrt()
}

/// Options for the H0 statistics of an ensemble.
/// Use `with_` functions to set parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HubbleOptions {
    /// Lens object whose H0 is used.
    pub object: usize,
    /// Models that enter the statistics.
    pub selection: Selection,
    /// Width of the range around the median.
    pub sigma: SigmaLevel,
    /// Kind of range around the median.
    pub spread: Spread,
}

impl HubbleOptions {
    /// Set the lens object.
    pub fn with_object(mut self, object: usize) -> Self {
        self.object = object;
        self
    }

    /// Set the models entering the statistics.
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Set the sigma level.
    pub fn with_sigma(mut self, sigma: SigmaLevel) -> Self {
        self.sigma = sigma;
        self
    }

    /// Set the kind of range.
    pub fn with_spread(mut self, spread: Spread) -> Self {
        self.spread = spread;
        self
    }

    /// Compute the H0 statistics of `models`.
    ///
    /// Returns `None` if no selected model provides H0 for the lens object.
    pub fn stats<F: Float>(&self, models: &[ModelSample<F>]) -> Option<HubbleStats<F>> {
        let samples = hubble_samples(models, self.object, self.selection);
        info!(
            "Computing H0 statistics over {} of {} models.",
            samples.len(),
            models.len()
        );
        HubbleStats::from_samples(&samples, self.sigma, self.spread)
    }
}

/// Default range of H0 histograms.
pub const HISTOGRAM_RANGE: (f64, f64) = (50., 90.);
/// Default number of bins of H0 histograms.
pub const HISTOGRAM_BINS: usize = 20;

/// Count `samples` in `bins` equal-width bins spanning `range`.
///
/// All bins are half-open except the last, which also counts samples equal to
/// the upper edge. Samples outside `range` are not counted.
pub fn histogram<F: Float>(samples: &[F], range: (f64, f64), bins: usize) -> Vec<usize> {
    let mut counts = vec![0; bins];
    let (lo, hi) = range;
    if bins == 0 || !(hi > lo) {
        return counts;
    }

    let width = (hi - lo) / bins as f64;
    let mut outside = 0;
    for x in samples.iter().filter_map(|x| x.to_f64()) {
        if !(lo..=hi).contains(&x) {
            outside += 1;
            continue;
        }
        let bin = (((x - lo) / width) as usize).min(bins - 1);
        counts[bin] += 1;
    }
    debug!("{} samples outside the histogram range {:?}.", outside, range);

    counts
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn ensemble() -> Vec<ModelSample<f64>> {
        let tags = [Some(true), Some(false), None];
        (0..30)
            .map(|i| ModelSample {
                accepted: tags[i % 3],
                h0: vec![Some(60. + i as f64), if i % 2 == 0 { None } else { Some(1.) }],
            })
            .collect_vec()
    }

    #[test]
    fn selection() {
        let models = ensemble();
        let accepted = hubble_samples(&models, 0, Selection::Accepted);
        assert_eq!(accepted.len(), 10);
        assert_eq!(accepted[..3], [60., 63., 66.]);
        assert_eq!(hubble_samples(&models, 0, Selection::Untagged)[0], 62.);
        assert_eq!(hubble_samples(&models, 1, Selection::Rejected).len(), 5);
        assert!(hubble_samples(&models, 2, Selection::Accepted).is_empty());
    }

    #[test]
    fn percentiles() {
        let samples = [7., 3., 1., 10., 9., 2., 5., 6., 4., 8.];
        let stats = HubbleStats::from_samples(&samples, SigmaLevel::One, Spread::Percentile).unwrap();
        assert_eq!(stats.median, 5.5);
        assert_eq!(stats.high, 9.);
        assert_eq!(stats.low, 2.);
        assert_eq!(stats.error(), 3.5);
        assert_eq!(stats.to_string(), "5.50 \t3.50");

        let all = HubbleStats::from_samples(&samples, SigmaLevel::All, Spread::Percentile).unwrap();
        assert_eq!((all.low, all.high), (1., 10.));
    }

    #[test]
    fn standard_deviation() {
        let samples = [2., 4., 4., 4., 5., 5., 7., 9.];
        let stats = HubbleStats::from_samples(&samples, SigmaLevel::Three, Spread::StdDev).unwrap();
        assert_abs_diff_eq!(stats.median, 4.5);
        assert_abs_diff_eq!(stats.high, 6.5, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.low, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn odd_count_and_single_sample() {
        let stats =
            HubbleStats::from_samples(&[70.], SigmaLevel::Two, Spread::Percentile).unwrap();
        assert_eq!((stats.median, stats.high, stats.low), (70., 70., 70.));

        let stats =
            HubbleStats::from_samples(&[3., 1., 2.], SigmaLevel::One, Spread::Percentile).unwrap();
        assert_eq!(stats.median, 2.);
    }

    #[test]
    fn no_samples() {
        assert_eq!(
            HubbleStats::<f64>::from_samples(&[], SigmaLevel::One, Spread::Percentile),
            None
        );
        let models = ensemble();
        assert_eq!(HubbleOptions::default().with_object(5).stats(&models), None);
    }

    #[test]
    fn options() {
        let models = ensemble();
        let stats = HubbleOptions::default()
            .with_selection(Selection::Accepted)
            .with_sigma(SigmaLevel::All)
            .stats(&models)
            .unwrap();
        assert_eq!((stats.low, stats.median, stats.high), (60., 73.5, 87.));

        let fraction = HubbleOptions::default()
            .with_sigma(SigmaLevel::Fraction(1.))
            .with_spread(Spread::Percentile)
            .stats(&models)
            .unwrap();
        assert_eq!(fraction, stats);
    }

    #[test]
    fn histogram_counts() {
        let samples = [50., 51.9, 52., 89.9, 90., 49.9, 90.1, 70.];
        let counts = histogram(&samples, HISTOGRAM_RANGE, HISTOGRAM_BINS);
        assert_eq!(counts.len(), 20);
        assert_eq!(counts[0], 2);
        assert_eq!(counts[1], 1);
        assert_eq!(counts[10], 1);
        assert_eq!(counts[19], 2);
        assert_eq!(counts.iter().sum::<usize>(), 6);

        assert!(histogram(&samples, (1., 1.), 4).iter().all(|&c| c == 0));
        assert!(histogram(&samples, HISTOGRAM_RANGE, 0).is_empty());
    }
}
