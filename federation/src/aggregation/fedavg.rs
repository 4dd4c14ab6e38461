//! Federated averaging: `W' = sum_k (n_k / N) * W_k` with `N = sum_k n_k`.

use crate::{Weights, error::ConfigErr};

/// The result of one aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub weights: Weights,
    /// Mean L2 distance between each contribution and `weights`.
    pub divergence: f64,
}

/// Computes each node's FedAvg coefficient `n_k / N`.
///
/// # Arguments
/// * `sample_counts` - The amount of samples of each contributing node.
///
/// # Returns
/// The coefficients in input order, or a `ConfigErr` if there are no counts or any is zero.
pub fn weighting(sample_counts: &[usize]) -> Result<Vec<f64>, ConfigErr> {
    if sample_counts.is_empty() {
        return Err(ConfigErr::NoUpdates);
    }
    if let Some(pos) = sample_counts.iter().position(|&n| n == 0) {
        return Err(ConfigErr::ZeroSampleCount {
            node: format!("#{pos}"),
        });
    }

    let total: usize = sample_counts.iter().sum();
    Ok(sample_counts
        .iter()
        .map(|&n| n as f64 / total as f64)
        .collect())
}

/// Mean Frobenius distance between every local update and the aggregate.
///
/// # Arguments
/// * `updates` - The local updates that were aggregated.
/// * `global` - The aggregate.
pub fn divergence(updates: &[&Weights], global: &Weights) -> f64 {
    if updates.is_empty() {
        return 0.;
    }

    let total: f64 = updates
        .iter()
        .map(|w| (*w - global).mapv(|x| x * x).sum().sqrt())
        .sum();

    total / updates.len() as f64
}

/// Sample-weighted average of the local updates.
///
/// Excluded nodes are simply absent from the inputs, the weights renormalize over
/// whoever contributed.
///
/// # Arguments
/// * `updates` - The local weight tensors.
/// * `sample_counts` - The amount of samples behind each update.
///
/// # Returns
/// The aggregate and its divergence, or a `ConfigErr` on empty, mismatched or
/// differently shaped inputs.
pub fn aggregate(updates: &[&Weights], sample_counts: &[usize]) -> Result<Aggregate, ConfigErr> {
    if updates.len() != sample_counts.len() {
        return Err(ConfigErr::LengthMismatch {
            updates: updates.len(),
            counts: sample_counts.len(),
        });
    }

    let coefficients = weighting(sample_counts)?;
    let shape = updates[0].dim();

    if let Some(w) = updates.iter().find(|w| w.dim() != shape) {
        return Err(ConfigErr::ShapeMismatch {
            expected: shape,
            got: w.dim(),
        });
    }

    let mut weights = Weights::zeros(shape);
    for (w, coefficient) in updates.iter().zip(coefficients) {
        weights.scaled_add(coefficient, *w);
    }

    let divergence = divergence(updates, &weights);
    Ok(Aggregate {
        weights,
        divergence,
    })
}
