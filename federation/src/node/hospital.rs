use std::time::Duration;

use serde::Serialize;

use crate::Weights;

/// A single federated learning hospital node.
#[derive(Debug, Clone)]
pub struct HospitalNode {
    pub(crate) id: String,
    pub(crate) sample_count: usize,
    pub(crate) cloud: String,
    pub(crate) region: String,
    pub(crate) encryption_active: bool,
    pub(crate) latency: Option<Duration>,
    pub(crate) weights: Weights,
    pub(crate) last_loss: f64,
    pub(crate) rounds_participated: usize,
}

impl HospitalNode {
    /// Creates a new `HospitalNode` that hasn't participated in any round yet.
    ///
    /// # Arguments
    /// * `id` - The node's identity.
    /// * `sample_count` - The amount of local samples, fixed for the node's lifetime.
    /// * `cloud` - The cloud provider hosting the node.
    /// * `region` - The region within `cloud`.
    /// * `weights` - The initial local weights.
    pub fn new(
        id: String,
        sample_count: usize,
        cloud: String,
        region: String,
        weights: Weights,
    ) -> Self {
        Self {
            id,
            sample_count,
            cloud,
            region,
            encryption_active: true,
            latency: None,
            weights,
            last_loss: 1.,
            rounds_participated: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn last_loss(&self) -> f64 {
        self.last_loss
    }

    pub fn rounds_participated(&self) -> usize {
        self.rounds_participated
    }

    /// Records the outcome of this node's local update.
    ///
    /// # Arguments
    /// * `weights` - The freshly computed local weights.
    /// * `accuracy` - The node's locally observed accuracy.
    pub(crate) fn record_update(&mut self, weights: Weights, accuracy: f64) {
        self.weights = weights;
        self.last_loss = 1. - accuracy;
        self.rounds_participated += 1;
    }

    /// The static, read-only view of this node handed to reporting boundaries.
    pub fn descriptor(&self) -> NodeDescriptor {
        NodeDescriptor {
            id: self.id.clone(),
            cloud: self.cloud.clone(),
            region: self.region.clone(),
            encryption_active: self.encryption_active,
            sample_count: self.sample_count,
        }
    }

    /// Live participation figures for this node.
    ///
    /// # Arguments
    /// * `total_samples` - The amount of samples across the whole population.
    pub fn stats(&self, total_samples: usize) -> NodeStats {
        NodeStats {
            id: self.id.clone(),
            rounds_participated: self.rounds_participated,
            last_loss: self.last_loss,
            contribution: self.sample_count as f64 / total_samples as f64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeDescriptor {
    pub id: String,
    pub cloud: String,
    pub region: String,
    pub encryption_active: bool,
    pub sample_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeStats {
    pub id: String,
    pub rounds_participated: usize,
    pub last_loss: f64,
    /// The node's FedAvg weight when every node contributes, `n_k / N`.
    pub contribution: f64,
}
