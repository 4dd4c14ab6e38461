use std::{sync::Arc, thread};

use log::debug;
use rayon::prelude::*;

use super::{Executor, NodeJob, NodeOutcome, RoundContext};

/// Runs every node on the rayon thread pool, no node is ever excluded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelExec;

impl ParallelExec {
    /// Creates a new `ParallelExec`.
    pub fn new() -> Self {
        Self
    }
}

impl Executor for ParallelExec {
    fn run(&self, ctx: Arc<RoundContext>, jobs: Vec<NodeJob>) -> Vec<NodeOutcome> {
        jobs.into_par_iter()
            .map(|job| {
                if let Some(latency) = job.latency {
                    thread::sleep(latency);
                }

                let update = ctx.local_update(&job);
                debug!(node_id = job.node_id.as_str(), accuracy = update.accuracy; "local update ready");
                NodeOutcome::Contributed(update)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{Weights, accuracy::AccuracyEstimator, node::DriftSimulator};

    #[test]
    fn keeps_job_order() {
        let ctx = Arc::new(RoundContext {
            round_num: 3,
            global: Weights::zeros((2, 8)),
            simulator: Arc::new(DriftSimulator::new(0.01)),
            privacy: None,
            estimator: AccuracyEstimator::new(0.86).unwrap(),
            local_epochs: 3,
        });

        let jobs: Vec<NodeJob> = (0..6)
            .map(|idx| NodeJob {
                idx,
                node_id: format!("n{idx}"),
                sample_count: 100 + idx,
                seed: idx as u64,
                latency: (idx % 2 == 0).then(|| Duration::from_millis(5)),
            })
            .collect();

        let outcomes = ParallelExec::new().run(ctx, jobs);

        assert_eq!(outcomes.len(), 6);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.idx(), i);
            assert!(matches!(outcome, NodeOutcome::Contributed(_)));
        }
    }
}
