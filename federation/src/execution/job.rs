use std::{sync::Arc, time::Duration};

use rand::{SeedableRng, rngs::StdRng};

use crate::{
    Weights, accuracy::AccuracyEstimator, node::NodeTrainingSimulator,
    privacy::PrivacyAccountant,
};

/// Everything a node needs to compute its local update for a round.
pub struct RoundContext {
    pub round_num: usize,
    pub global: Weights,
    pub simulator: Arc<dyn NodeTrainingSimulator>,
    /// `None` when differential privacy is disabled.
    pub privacy: Option<PrivacyAccountant>,
    pub estimator: AccuracyEstimator,
    pub local_epochs: usize,
}

/// A single node's share of the round.
#[derive(Debug, Clone)]
pub struct NodeJob {
    pub idx: usize,
    pub node_id: String,
    pub sample_count: usize,
    /// Seed of the node's child rng, drawn from the engine rng before fan-out.
    pub seed: u64,
    pub latency: Option<Duration>,
}

/// A finished local update.
#[derive(Debug, Clone)]
pub struct NodeUpdate {
    pub idx: usize,
    pub weights: Weights,
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Exclusion {
    TimedOut(Duration),
    Failed(String),
}

/// What a node brought to the round.
#[derive(Debug, Clone)]
pub enum NodeOutcome {
    Contributed(NodeUpdate),
    Excluded { idx: usize, reason: Exclusion },
}

impl NodeOutcome {
    pub fn idx(&self) -> usize {
        match self {
            NodeOutcome::Contributed(update) => update.idx,
            NodeOutcome::Excluded { idx, .. } => *idx,
        }
    }
}

impl RoundContext {
    /// Simulates local training, privatizes the result and estimates the node's accuracy.
    ///
    /// Every draw comes from the job's own rng, so the update doesn't depend on
    /// which thread runs it or when.
    ///
    /// # Arguments
    /// * `job` - The node's share of the round.
    ///
    /// # Returns
    /// The node's update.
    pub fn local_update(&self, job: &NodeJob) -> NodeUpdate {
        let mut rng = StdRng::seed_from_u64(job.seed);

        let mut weights =
            self.simulator
                .simulate(job.sample_count, &self.global, self.local_epochs, &mut rng);

        if let Some(privacy) = &self.privacy {
            privacy.add_noise(&mut weights, job.sample_count, &mut rng);
        }

        let accuracy = self.estimator.estimate_node(self.round_num, &mut rng);

        NodeUpdate {
            idx: job.idx,
            weights,
            accuracy,
        }
    }
}
