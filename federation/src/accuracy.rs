use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::Result;

const FLOOR: f64 = 0.60;
const STEEPNESS: f64 = 0.4;
const MIDPOINT: f64 = 8.;
const MIN_ACCURACY: f64 = 0.50;
const MAX_ACCURACY: f64 = 0.99;

/// Logistic stand-in for the evaluation loop.
///
/// The expected accuracy of round `r` is `0.60 + (target - 0.60) * sigmoid(0.4 * (r - 8))`,
/// observed through gaussian measurement noise and clipped to `[0.50, 0.99]`.
#[derive(Debug, Clone, Copy)]
pub struct AccuracyEstimator {
    target: f64,
    global_noise: Normal<f64>,
    node_noise: Normal<f64>,
}

impl AccuracyEstimator {
    /// Creates a new `AccuracyEstimator`.
    ///
    /// # Arguments
    /// * `target` - The accuracy the curve saturates at.
    ///
    /// # Returns
    /// A new estimator or a distribution error.
    pub fn new(target: f64) -> Result<Self> {
        Ok(Self {
            target,
            global_noise: Normal::new(0., 0.008)?,
            node_noise: Normal::new(0., 0.01)?,
        })
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    /// The noiseless accuracy expected at `round_num`.
    pub fn expected(&self, round_num: usize) -> f64 {
        let x = STEEPNESS * (round_num as f64 - MIDPOINT);
        let sigmoid = 1. / (1. + (-x).exp());
        FLOOR + (self.target - FLOOR) * sigmoid
    }

    /// Estimates the global model's accuracy after `round_num`.
    pub fn estimate<R: Rng + ?Sized>(&self, round_num: usize, rng: &mut R) -> f64 {
        let noisy = self.expected(round_num) + self.global_noise.sample(rng);
        noisy.clamp(MIN_ACCURACY, MAX_ACCURACY)
    }

    /// Estimates a single node's accuracy, with extra per-node jitter on top of the global estimate.
    pub fn estimate_node<R: Rng + ?Sized>(&self, round_num: usize, rng: &mut R) -> f64 {
        let noisy = self.estimate(round_num, rng) + self.node_noise.sample(rng);
        noisy.clamp(MIN_ACCURACY, MAX_ACCURACY)
    }
}
