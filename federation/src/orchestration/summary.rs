use serde::Serialize;

use super::{FLRound, round::serialize_epsilon};
use crate::node::{NodeDescriptor, NodeStats};

/// Aggregate figures of a finished simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub final_accuracy: f64,
    pub best_accuracy: f64,
    pub best_round: usize,
    pub total_rounds: usize,
    pub converged: bool,
    pub final_divergence: f64,
    #[serde(serialize_with = "serialize_epsilon")]
    pub final_epsilon: f64,
    pub n_hospitals: usize,
    pub total_samples: usize,
}

impl Summary {
    /// Builds the summary of a round history.
    ///
    /// # Arguments
    /// * `history` - The recorded rounds, in order.
    /// * `n_hospitals` - The amount of nodes in the federation.
    /// * `total_samples` - The sum of every node's sample count.
    ///
    /// # Returns
    /// `None` if no round was recorded.
    pub fn from_history(history: &[FLRound], n_hospitals: usize, total_samples: usize) -> Option<Self> {
        let last = history.last()?;
        let best = history.iter().fold(&history[0], |best, r| {
            if r.global_accuracy > best.global_accuracy { r } else { best }
        });

        Some(Self {
            final_accuracy: last.global_accuracy,
            best_accuracy: best.global_accuracy,
            best_round: best.round_num,
            total_rounds: history.len(),
            converged: last.converged,
            final_divergence: last.weight_divergence,
            final_epsilon: last.privacy_epsilon,
            n_hospitals,
            total_samples,
        })
    }
}

/// Everything the presentation side needs, ready to be serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub history: Vec<FLRound>,
    pub nodes: Vec<NodeDescriptor>,
    pub stats: Vec<NodeStats>,
    pub summary: Option<Summary>,
}

impl SimulationReport {
    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::orchestration::RoundStatus;

    fn round(round_num: usize, accuracy: f64) -> FLRound {
        FLRound {
            round_num,
            global_accuracy: accuracy,
            global_loss: 1. - accuracy,
            node_accuracies: BTreeMap::new(),
            weight_divergence: 0.1 / round_num as f64,
            privacy_epsilon: 2.,
            status: RoundStatus::Normal,
            converged: round_num > 2,
            excluded: vec![],
        }
    }

    #[test]
    fn empty_history_has_no_summary() {
        assert_eq!(Summary::from_history(&[], 5, 100), None);
    }

    #[test]
    fn picks_earliest_best_round() {
        let history = [round(1, 0.6), round(2, 0.8), round(3, 0.8), round(4, 0.7)];
        let summary = Summary::from_history(&history, 5, 1000).unwrap();

        assert_eq!(summary.best_round, 2);
        assert_eq!(summary.best_accuracy, 0.8);
        assert_eq!(summary.final_accuracy, 0.7);
        assert_eq!(summary.total_rounds, 4);
        assert!(summary.converged);
        assert_eq!(summary.final_divergence, 0.025);
        assert_eq!(summary.total_samples, 1000);
    }
}
