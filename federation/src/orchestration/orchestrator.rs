use std::{collections::BTreeMap, sync::Arc, time::Duration};

use log::{debug, info, warn};
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::{FLRound, RoundStatus, SimulationReport, Summary};
use crate::{
    Result, Weights,
    accuracy::AccuracyEstimator,
    aggregation::{self, Aggregate},
    config::{EngineConfig, ExecutorSpec, InitSpec},
    convergence::ConvergenceMonitor,
    error::{ConfigErr, FederationErr},
    execution::{DeadlineExec, Executor, NodeJob, NodeOutcome, ParallelExec, RoundContext},
    initialization::{ConstParamGen, ParamGen, RandParamGen},
    node::{DriftSimulator, HospitalNode, NodeDescriptor, NodeStats, NodeTrainingSimulator, Population},
    privacy::PrivacyAccountant,
    registry::RegistryHandle,
};

/// Drives the federated rounds end to end and owns the global state.
///
/// Every random draw of the engine comes from a single seedable rng. Before each
/// fan-out the orchestrator hands every node a child seed in node order, so a fixed
/// seed reproduces the same history no matter how the executor schedules the nodes.
pub struct RoundOrchestrator {
    config: EngineConfig,
    rng: StdRng,
    nodes: Vec<HospitalNode>,
    global: Weights,
    simulator: Arc<dyn NodeTrainingSimulator>,
    privacy: Option<PrivacyAccountant>,
    estimator: AccuracyEstimator,
    monitor: ConvergenceMonitor,
    executor: Box<dyn Executor>,
    registry: RegistryHandle,
    history: Vec<FLRound>,
}

impl RoundOrchestrator {
    /// Creates a new `RoundOrchestrator`.
    ///
    /// Validates `config`, builds the node population and the initial global weights
    /// and starts the chosen executor.
    ///
    /// # Arguments
    /// * `config` - The engine configuration.
    ///
    /// # Returns
    /// A new orchestrator, or the configuration error found before anything ran.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let (nodes, global) = match config.init {
            InitSpec::Const { value } => build_state(&config, &ConstParamGen::new(value), &mut rng),
            InitSpec::Normal { mean, std_dev } => {
                build_state(&config, &RandParamGen::normal(mean, std_dev)?, &mut rng)
            }
            InitSpec::Uniform { low, high } => {
                build_state(&config, &RandParamGen::uniform(low, high)?, &mut rng)
            }
        };

        let privacy = if config.dp_enabled {
            Some(PrivacyAccountant::new(config.dp_sigma, config.dp_delta)?)
        } else {
            None
        };

        let executor: Box<dyn Executor> = match config.executor {
            ExecutorSpec::Parallel => Box::new(ParallelExec::new()),
            ExecutorSpec::Deadline { timeout_ms } => {
                Box::new(DeadlineExec::new(Duration::from_millis(timeout_ms))?)
            }
        };

        let total_samples: usize = nodes.iter().map(HospitalNode::sample_count).sum();
        info!(
            n_hospitals = nodes.len(),
            total_samples = total_samples,
            dp_enabled = config.dp_enabled;
            "federation ready"
        );

        Ok(Self {
            simulator: Arc::new(DriftSimulator::new(config.learning_rate)),
            estimator: AccuracyEstimator::new(config.target_accuracy)?,
            monitor: config.convergence.into(),
            config,
            rng,
            nodes,
            global,
            privacy,
            executor,
            registry: RegistryHandle::new(),
            history: Vec::new(),
        })
    }

    /// Replaces the local training emulation.
    pub fn with_simulator(mut self, simulator: impl NodeTrainingSimulator + 'static) -> Self {
        self.simulator = Arc::new(simulator);
        self
    }

    /// Runs a single round.
    ///
    /// # Arguments
    /// * `round_num` - Must be exactly one past the last recorded round, `1` on a fresh history.
    ///
    /// # Returns
    /// The recorded round, or an error if `round_num` is out of order.
    pub fn run_round(&mut self, round_num: usize) -> Result<FLRound> {
        let expected = self.history.last().map_or(1, |r| r.round_num + 1);
        if round_num != expected {
            return Err(FederationErr::RoundOutOfOrder {
                expected,
                got: round_num,
            });
        }

        info!(round = round_num; "round started");

        let jobs: Vec<NodeJob> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| NodeJob {
                idx,
                node_id: node.id.clone(),
                sample_count: node.sample_count,
                seed: self.rng.random(),
                latency: node.latency,
            })
            .collect();

        let ctx = Arc::new(RoundContext {
            round_num,
            global: self.global.clone(),
            simulator: self.simulator.clone(),
            privacy: self.privacy,
            estimator: self.estimator,
            local_epochs: self.config.local_epochs,
        });

        let mut updates = Vec::with_capacity(jobs.len());
        for outcome in self.executor.run(ctx, jobs) {
            match outcome {
                NodeOutcome::Contributed(update) => updates.push(update),
                NodeOutcome::Excluded { idx, reason } => {
                    warn!(round = round_num, node_id = self.nodes[idx].id.as_str(); "node excluded: {reason:?}");
                }
            }
        }

        let mut contributed = vec![false; self.nodes.len()];
        for update in &updates {
            contributed[update.idx] = true;
        }

        let excluded: Vec<String> = self
            .nodes
            .iter()
            .zip(&contributed)
            .filter(|(_, contributed)| !**contributed)
            .map(|(node, _)| node.id.clone())
            .collect();

        if updates.is_empty() {
            return Ok(self.record_idle_round(round_num, excluded));
        }

        let counts: Vec<usize> = updates
            .iter()
            .map(|u| self.nodes[u.idx].sample_count)
            .collect();
        let locals: Vec<&Weights> = updates.iter().map(|u| &u.weights).collect();

        let Aggregate {
            weights: candidate,
            divergence,
        } = aggregation::aggregate(&locals, &counts)?;

        let candidate_accuracy = self.estimator.estimate(round_num, &mut self.rng);
        debug!(round = round_num, accuracy = candidate_accuracy, divergence = divergence; "candidate aggregated");

        let (weights, accuracy, status) = {
            let registry = self.registry.read();
            match registry.get_best() {
                Some(best) if candidate_accuracy < best.accuracy - self.config.rollback_threshold => {
                    warn!(
                        round = round_num,
                        candidate = candidate_accuracy,
                        best = best.accuracy,
                        best_round = best.version_id;
                        "regression detected, rolling back"
                    );
                    (best.weights.clone(), best.accuracy, RoundStatus::RollbackApplied)
                }
                _ => (candidate, candidate_accuracy, RoundStatus::Normal),
            }
        };

        let privacy_epsilon = match self.privacy {
            Some(privacy) => counts
                .iter()
                .min()
                .map_or(0., |&n| privacy.epsilon(n)),
            None => 0.,
        };

        self.registry.write().save_version(round_num, &weights, accuracy);
        self.global = weights;

        let mut node_accuracies = BTreeMap::new();
        for update in updates {
            let node = &mut self.nodes[update.idx];
            node_accuracies.insert(node.id.clone(), update.accuracy);
            node.record_update(update.weights, update.accuracy);
        }

        let round = FLRound {
            round_num,
            global_accuracy: accuracy,
            global_loss: 1. - accuracy,
            node_accuracies,
            weight_divergence: divergence,
            privacy_epsilon,
            status,
            converged: self.monitor.is_converged(divergence, round_num),
            excluded,
        };

        info!(
            round = round_num,
            accuracy = round.global_accuracy,
            divergence = round.weight_divergence,
            converged = round.converged;
            "{}", status.label()
        );

        self.history.push(round.clone());
        Ok(round)
    }

    /// Records a round nobody contributed to, the current global model is kept.
    fn record_idle_round(&mut self, round_num: usize, excluded: Vec<String>) -> FLRound {
        let accuracy = match self.registry.latest() {
            Some(latest) => latest.accuracy,
            None => self.estimator.estimate(round_num, &mut self.rng),
        };

        warn!(round = round_num; "every node was excluded, keeping the global model");
        self.registry
            .write()
            .save_version(round_num, &self.global, accuracy);

        let round = FLRound {
            round_num,
            global_accuracy: accuracy,
            global_loss: 1. - accuracy,
            node_accuracies: BTreeMap::new(),
            weight_divergence: 0.,
            privacy_epsilon: 0.,
            status: RoundStatus::NoParticipants,
            converged: false,
            excluded,
        };

        self.history.push(round.clone());
        round
    }

    /// Runs up to `n_rounds` rounds on a fresh history and registry.
    ///
    /// Stops early once a round converges after the configured early stop round.
    /// Node and global weights carry over from any previous run.
    ///
    /// # Arguments
    /// * `n_rounds` - The round budget, must be at least one.
    ///
    /// # Returns
    /// The recorded history.
    pub fn run_simulation(&mut self, n_rounds: usize) -> Result<&[FLRound]> {
        if n_rounds == 0 {
            return Err(ConfigErr::ZeroRounds.into());
        }

        self.history.clear();
        self.registry.write().clear();

        for round_num in 1..=n_rounds {
            let round = self.run_round(round_num)?;

            if self.monitor.should_stop(round.converged, round_num) {
                info!(round = round_num; "converged, stopping early");
                break;
            }
        }

        Ok(&self.history)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The recorded rounds, in order.
    pub fn history(&self) -> &[FLRound] {
        &self.history
    }

    pub fn nodes(&self) -> &[HospitalNode] {
        &self.nodes
    }

    pub fn global_weights(&self) -> &Weights {
        &self.global
    }

    /// A shared handle to the model registry.
    pub fn registry(&self) -> RegistryHandle {
        self.registry.clone()
    }

    pub fn total_samples(&self) -> usize {
        self.nodes.iter().map(HospitalNode::sample_count).sum()
    }

    /// Static descriptors of every node, in node order.
    pub fn descriptors(&self) -> Vec<NodeDescriptor> {
        self.nodes.iter().map(HospitalNode::descriptor).collect()
    }

    /// Live participation figures of every node, in node order.
    pub fn node_stats(&self) -> Vec<NodeStats> {
        let total_samples = self.total_samples();
        self.nodes.iter().map(|n| n.stats(total_samples)).collect()
    }

    /// Summary of the recorded history, `None` before the first round.
    pub fn summary(&self) -> Option<Summary> {
        Summary::from_history(&self.history, self.nodes.len(), self.total_samples())
    }

    /// Collects history, nodes and summary into a serializable report.
    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            history: self.history.clone(),
            nodes: self.descriptors(),
            stats: self.node_stats(),
            summary: self.summary(),
        }
    }
}

/// Builds the node population and then the initial global weights, in that order.
fn build_state<P: ParamGen>(
    config: &EngineConfig,
    param_gen: &P,
    rng: &mut StdRng,
) -> (Vec<HospitalNode>, Weights) {
    let shape = config.shape();

    let nodes = match &config.nodes {
        Some(specs) => Population::from_specs(specs, shape, param_gen, rng),
        None => Population::synthetic(config.n_hospitals, shape, param_gen, rng),
    };
    let global = param_gen.sample(rng, shape);

    (nodes, global)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeSpec;

    fn config() -> EngineConfig {
        EngineConfig::default().with_seed(7).with_shape(4, 16)
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = RoundOrchestrator::new(config().with_hospitals(0));
        assert!(matches!(result, Err(FederationErr::Config(ConfigErr::NoNodes))));
    }

    #[test]
    fn round_numbers_must_follow() {
        let mut orchestrator = RoundOrchestrator::new(config()).unwrap();

        assert!(matches!(
            orchestrator.run_round(2),
            Err(FederationErr::RoundOutOfOrder { expected: 1, got: 2 })
        ));

        orchestrator.run_round(1).unwrap();
        assert!(orchestrator.run_round(1).is_err());
        assert!(orchestrator.run_round(2).is_ok());
        assert_eq!(orchestrator.history().len(), 2);
    }

    #[test]
    fn round_is_saved_in_registry() {
        let mut orchestrator = RoundOrchestrator::new(config()).unwrap();
        let round = orchestrator.run_round(1).unwrap();

        let latest = orchestrator.registry().latest().unwrap();
        assert_eq!(latest.version_id, 1);
        assert_eq!(latest.accuracy, round.global_accuracy);
        assert_eq!(&latest.weights, orchestrator.global_weights());
        assert_eq!(round.global_loss, 1. - round.global_accuracy);
        assert_eq!(round.node_accuracies.len(), 5);
    }

    #[test]
    fn every_node_participates() {
        let mut orchestrator = RoundOrchestrator::new(config()).unwrap();
        orchestrator.run_simulation(3).unwrap();

        for stats in orchestrator.node_stats() {
            assert_eq!(stats.rounds_participated, 3);
            assert!(stats.last_loss <= 0.5);
        }

        let share: f64 = orchestrator.node_stats().iter().map(|s| s.contribution).sum();
        assert!((share - 1.).abs() < 1e-9);
    }

    #[test]
    fn zero_rounds_rejected() {
        let mut orchestrator = RoundOrchestrator::new(config()).unwrap();
        assert!(matches!(
            orchestrator.run_simulation(0),
            Err(FederationErr::Config(ConfigErr::ZeroRounds))
        ));
        assert!(orchestrator.history().is_empty());
    }

    #[test]
    fn rerun_clears_history() {
        let mut orchestrator = RoundOrchestrator::new(config()).unwrap();
        orchestrator.run_simulation(4).unwrap();
        orchestrator.run_simulation(2).unwrap();

        assert_eq!(orchestrator.history().len(), 2);
        assert_eq!(orchestrator.registry().len(), 2);
        assert_eq!(orchestrator.history()[0].round_num, 1);
    }

    #[test]
    fn explicit_nodes_are_used() {
        let nodes = vec![NodeSpec::new("north", 200), NodeSpec::new("south", 600)];
        let orchestrator = RoundOrchestrator::new(config().with_nodes(nodes)).unwrap();

        let ids: Vec<&str> = orchestrator.nodes().iter().map(HospitalNode::id).collect();
        assert_eq!(ids, ["north", "south"]);
        assert_eq!(orchestrator.total_samples(), 800);
    }

    #[test]
    fn const_init_fills_global() {
        let config = config().with_init(InitSpec::Const { value: 0.25 });
        let orchestrator = RoundOrchestrator::new(config).unwrap();

        assert!(orchestrator.global_weights().iter().all(|&w| w == 0.25));
    }
}
