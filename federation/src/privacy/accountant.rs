use rand::Rng;
use rand_distr::StandardNormal;

use crate::{Result, Weights, error::ConfigErr};

/// The delta used when none is configured.
pub const DEFAULT_DELTA: f64 = 1e-5;

/// Bounded per-node influence of a single sample under the Gaussian mechanism.
///
/// # Arguments
/// * `sample_count` - The amount of samples held by the node.
///
/// # Returns
/// The L2 sensitivity, `2 / sample_count`.
pub fn sensitivity(sample_count: usize) -> f64 {
    2. / sample_count as f64
}

/// Analytic Gaussian-mechanism bound, `sqrt(2 ln(1.25 / delta)) / sigma`.
///
/// # Arguments
/// * `sigma` - The noise multiplier.
/// * `delta` - The probability of exceeding epsilon.
///
/// # Returns
/// The epsilon spent, `+inf` when `sigma` is zero.
pub fn epsilon(sigma: f64, delta: f64) -> f64 {
    if sigma == 0. {
        return f64::INFINITY;
    }

    (2. * (1.25 / delta).ln()).sqrt() / sigma
}

/// Computes the epsilon reached by each noise multiplier in `sigmas`.
///
/// # Arguments
/// * `sigmas` - The noise multipliers to evaluate.
/// * `delta` - The probability of exceeding epsilon.
///
/// # Returns
/// The `(sigma, epsilon)` points of the trade-off curve, in input order.
pub fn privacy_curve(sigmas: &[f64], delta: f64) -> Vec<(f64, f64)> {
    sigmas.iter().map(|&s| (s, epsilon(s, delta))).collect()
}

/// Gaussian mechanism applied to every local update before it leaves its node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrivacyAccountant {
    sigma: f64,
    delta: f64,
}

impl PrivacyAccountant {
    /// Creates a new `PrivacyAccountant`.
    ///
    /// # Arguments
    /// * `sigma` - The noise multiplier, must be finite and non-negative.
    /// * `delta` - The target delta, must lie in `(0, 1)`.
    ///
    /// # Returns
    /// A new accountant or a `ConfigErr` for out of range values.
    pub fn new(sigma: f64, delta: f64) -> Result<Self> {
        if !sigma.is_finite() || sigma < 0. {
            return Err(ConfigErr::NegativeSigma(sigma).into());
        }
        if !(delta > 0. && delta < 1.) {
            return Err(ConfigErr::InvalidDelta(delta).into());
        }

        Ok(Self { sigma, delta })
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Adds `N(0, (sigma * sensitivity)^2)` noise to every element of `weights`.
    ///
    /// # Arguments
    /// * `weights` - The local update to privatize in place.
    /// * `sample_count` - The amount of samples of the node releasing it.
    /// * `rng` - The node's random source.
    pub fn add_noise<R: Rng + ?Sized>(&self, weights: &mut Weights, sample_count: usize, rng: &mut R) {
        let effective_sigma = self.sigma * sensitivity(sample_count);

        weights.mapv_inplace(|w| {
            let z: f64 = rng.sample(StandardNormal);
            w + effective_sigma * z
        });
    }

    /// The privacy cost of one release by a node holding `sample_count` samples.
    ///
    /// The analytic bound doesn't depend on the node size, the sensitivity is already
    /// folded into the noise scale, but callers still pass the worst case node so the
    /// reported figure is attributable to it.
    ///
    /// # Arguments
    /// * `sample_count` - The amount of samples of the releasing node.
    ///
    /// # Returns
    /// The epsilon spent, `+inf` when `sigma` is zero.
    pub fn epsilon(&self, _sample_count: usize) -> f64 {
        epsilon(self.sigma, self.delta)
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn epsilon_for_half_sigma() {
        let accountant = PrivacyAccountant::new(0.5, DEFAULT_DELTA).unwrap();
        let expected = (2. * 125_000f64.ln()).sqrt() / 0.5;

        assert!((accountant.epsilon(10) - expected).abs() < 1e-12);
        assert!((accountant.epsilon(10) - 9.69).abs() < 0.01);
    }

    #[test]
    fn zero_sigma_is_unbounded() {
        let accountant = PrivacyAccountant::new(0., DEFAULT_DELTA).unwrap();
        assert_eq!(accountant.epsilon(100), f64::INFINITY);
    }

    #[test]
    fn epsilon_decreases_with_sigma() {
        let sigmas = [0.01, 0.05, 0.15, 0.5, 1., 4.];
        let curve = privacy_curve(&sigmas, DEFAULT_DELTA);

        for pair in curve.windows(2) {
            assert!(pair[0].1 > pair[1].1, "{pair:?}");
        }
    }

    #[test]
    fn invalid_parameters_rejected() {
        assert!(PrivacyAccountant::new(-0.1, DEFAULT_DELTA).is_err());
        assert!(PrivacyAccountant::new(f64::NAN, DEFAULT_DELTA).is_err());
        assert!(PrivacyAccountant::new(0.1, 0.).is_err());
        assert!(PrivacyAccountant::new(0.1, 1.).is_err());
    }

    #[test]
    fn noise_scales_with_sensitivity() {
        let accountant = PrivacyAccountant::new(1., DEFAULT_DELTA).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        let mut small = Weights::zeros((32, 32));
        let mut large = Weights::zeros((32, 32));
        accountant.add_noise(&mut small, 10, &mut rng);
        accountant.add_noise(&mut large, 10_000, &mut rng);

        let rms = |w: &Weights| (w.mapv(|x| x * x).sum() / w.len() as f64).sqrt();
        // sigma * 2 / n for each node
        assert!((rms(&small) - 0.2).abs() < 0.02);
        assert!((rms(&large) - 0.0002).abs() < 0.00002);
    }

    #[test]
    fn zero_sigma_leaves_weights_intact() {
        let accountant = PrivacyAccountant::new(0., DEFAULT_DELTA).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        let mut weights = Weights::from_elem((2, 3), 0.25);
        accountant.add_noise(&mut weights, 50, &mut rng);
        assert!(weights.iter().all(|&w| w == 0.25));
    }
}
