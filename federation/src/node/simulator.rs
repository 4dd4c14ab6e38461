use rand::{Rng, rngs::StdRng};
use rand_distr::StandardNormal;

use crate::Weights;

const DECAY: f64 = 0.08;
const NOISE_GAIN: f64 = 0.15;

/// Produces a node's local update from the current global weights.
pub trait NodeTrainingSimulator: Send + Sync {
    /// Should emulate `local_epochs` iterations of local training.
    ///
    /// # Arguments
    /// * `sample_count` - The amount of samples held by the node.
    /// * `global` - The global weights broadcast this round.
    /// * `local_epochs` - The amount of local iterations.
    /// * `rng` - The node's random source for this round.
    ///
    /// # Returns
    /// The local weights, with the same shape as `global`.
    fn simulate(&self, sample_count: usize, global: &Weights, local_epochs: usize, rng: &mut StdRng) -> Weights;
}

/// Emulates heterogeneous client drift with a decay term plus sample-size scaled noise.
///
/// Each epoch computes `grad = -w * 0.08 + noise * 0.15` where `noise ~ N(0, 1 / n)`,
/// and steps `w -= learning_rate * grad`, so smaller nodes drift further.
#[derive(Debug, Clone, Copy)]
pub struct DriftSimulator {
    learning_rate: f64,
}

impl DriftSimulator {
    /// Creates a new `DriftSimulator`.
    ///
    /// # Arguments
    /// * `learning_rate` - The *length* of each local step.
    pub fn new(learning_rate: f64) -> Self {
        Self { learning_rate }
    }
}

impl NodeTrainingSimulator for DriftSimulator {
    fn simulate(&self, sample_count: usize, global: &Weights, local_epochs: usize, rng: &mut StdRng) -> Weights {
        let lr = self.learning_rate;
        let scale = 1. / (sample_count as f64).sqrt();
        let mut weights = global.clone();

        for _ in 0..local_epochs {
            weights.mapv_inplace(|w| {
                let noise: f64 = rng.sample(StandardNormal);
                let grad = -w * DECAY + noise * scale * NOISE_GAIN;
                w - lr * grad
            });
        }

        weights
    }
}
