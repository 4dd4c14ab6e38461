use std::sync::Arc;

use super::{NodeJob, NodeOutcome, RoundContext};

/// Runs the local updates of a single round.
///
/// The executor is picked once when the orchestrator is built, every round goes
/// through the same one.
pub trait Executor: Send + Sync {
    /// Should run every job and wait for all of them to finish or be excluded.
    ///
    /// # Arguments
    /// * `ctx` - The state shared by every node in this round.
    /// * `jobs` - One job per node, in node order.
    ///
    /// # Returns
    /// One outcome per job, in the same order as `jobs`.
    fn run(&self, ctx: Arc<RoundContext>, jobs: Vec<NodeJob>) -> Vec<NodeOutcome>;
}
