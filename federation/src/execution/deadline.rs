use std::{io, sync::Arc, time::Duration};

use log::{debug, warn};
use tokio::{
    runtime::Runtime,
    task::{self, JoinSet},
    time,
};

use super::{Exclusion, Executor, NodeJob, NodeOutcome, RoundContext};

/// Runs every node as a blocking task bounded by a per-node deadline.
///
/// A node that misses the deadline is excluded from the round, the rest of the
/// round goes on without it.
pub struct DeadlineExec {
    runtime: Runtime,
    timeout: Duration,
}

impl DeadlineExec {
    /// Creates a new `DeadlineExec` with its own tokio runtime.
    ///
    /// # Arguments
    /// * `timeout` - How long each node has to produce its update.
    ///
    /// # Returns
    /// A new `DeadlineExec` or an io error if the runtime couldn't be built.
    pub fn new(timeout: Duration) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_time()
            .build()?;

        Ok(Self { runtime, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run_job(ctx: Arc<RoundContext>, job: NodeJob, timeout: Duration) -> NodeOutcome {
        let idx = job.idx;
        let node_id = job.node_id.clone();

        let work = async move {
            if let Some(latency) = job.latency {
                time::sleep(latency).await;
            }

            task::spawn_blocking(move || ctx.local_update(&job)).await
        };

        match time::timeout(timeout, work).await {
            Ok(Ok(update)) => {
                debug!(node_id = node_id.as_str(), accuracy = update.accuracy; "local update ready");
                NodeOutcome::Contributed(update)
            }
            Ok(Err(e)) => {
                warn!(node_id = node_id.as_str(); "local update failed: {e}");
                NodeOutcome::Excluded {
                    idx,
                    reason: Exclusion::Failed(e.to_string()),
                }
            }
            Err(_) => {
                warn!(node_id = node_id.as_str(), timeout_ms = timeout.as_millis() as u64; "node missed the deadline");
                NodeOutcome::Excluded {
                    idx,
                    reason: Exclusion::TimedOut(timeout),
                }
            }
        }
    }
}

impl Executor for DeadlineExec {
    fn run(&self, ctx: Arc<RoundContext>, jobs: Vec<NodeJob>) -> Vec<NodeOutcome> {
        let timeout = self.timeout;

        self.runtime.block_on(async move {
            let mut join_set = JoinSet::new();
            let n = jobs.len();

            for job in jobs {
                join_set.spawn(Self::run_job(ctx.clone(), job, timeout));
            }

            let mut outcomes = Vec::with_capacity(n);
            while let Some(res) = join_set.join_next().await {
                match res {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(e) => warn!("node task aborted: {e}"),
                }
            }

            outcomes.sort_by_key(NodeOutcome::idx);
            outcomes
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Weights, accuracy::AccuracyEstimator, node::DriftSimulator};

    fn ctx() -> Arc<RoundContext> {
        Arc::new(RoundContext {
            round_num: 1,
            global: Weights::zeros((2, 4)),
            simulator: Arc::new(DriftSimulator::new(0.01)),
            privacy: None,
            estimator: AccuracyEstimator::new(0.86).unwrap(),
            local_epochs: 3,
        })
    }

    fn job(idx: usize, latency_ms: Option<u64>) -> NodeJob {
        NodeJob {
            idx,
            node_id: format!("n{idx}"),
            sample_count: 300,
            seed: idx as u64,
            latency: latency_ms.map(Duration::from_millis),
        }
    }

    #[test]
    fn slow_node_is_excluded() {
        let exec = DeadlineExec::new(Duration::from_millis(100)).unwrap();
        let jobs = vec![job(0, None), job(1, Some(2_000)), job(2, Some(1))];

        let outcomes = exec.run(ctx(), jobs);

        assert_eq!(outcomes.len(), 3);
        assert!(matches!(outcomes[0], NodeOutcome::Contributed(_)));
        assert!(matches!(
            outcomes[1],
            NodeOutcome::Excluded {
                idx: 1,
                reason: Exclusion::TimedOut(_)
            }
        ));
        assert!(matches!(outcomes[2], NodeOutcome::Contributed(_)));
    }

    #[test]
    fn matches_parallel_results() {
        let exec = DeadlineExec::new(Duration::from_secs(5)).unwrap();
        let jobs: Vec<NodeJob> = (0..4).map(|i| job(i, None)).collect();

        let ctx = ctx();
        let outcomes = exec.run(ctx.clone(), jobs.clone());

        for (outcome, job) in outcomes.iter().zip(&jobs) {
            let NodeOutcome::Contributed(update) = outcome else {
                panic!("node {} was excluded", job.idx);
            };
            assert_eq!(update.weights, ctx.local_update(job).weights);
        }
    }
}
