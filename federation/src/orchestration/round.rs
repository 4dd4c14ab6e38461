use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

/// How a round's outcome came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    /// The aggregated candidate was accepted.
    Normal,
    /// The candidate regressed too much, the best version was restored.
    RollbackApplied,
    /// Every node was excluded, the global model was kept as is.
    NoParticipants,
}

impl RoundStatus {
    /// A human readable label of the secure aggregation outcome.
    pub fn label(&self) -> &'static str {
        match self {
            RoundStatus::Normal => "secure aggregation completed",
            RoundStatus::RollbackApplied => "regression detected, rolled back to best version",
            RoundStatus::NoParticipants => "no node contributed, global model kept",
        }
    }
}

/// The immutable record of a finished round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FLRound {
    pub round_num: usize,
    pub global_accuracy: f64,
    pub global_loss: f64,
    pub node_accuracies: BTreeMap<String, f64>,
    pub weight_divergence: f64,
    /// `+inf` when the noise multiplier is zero, serialized as `null`.
    #[serde(serialize_with = "serialize_epsilon")]
    pub privacy_epsilon: f64,
    pub status: RoundStatus,
    pub converged: bool,
    /// Ids of the nodes left out of this round's aggregation.
    pub excluded: Vec<String>,
}

impl FLRound {
    pub fn is_rollback(&self) -> bool {
        self.status == RoundStatus::RollbackApplied
    }
}

pub(super) fn serialize_epsilon<S: Serializer>(epsilon: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if epsilon.is_finite() {
        serializer.serialize_f64(*epsilon)
    } else {
        serializer.serialize_none()
    }
}
