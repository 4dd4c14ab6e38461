use std::{collections::HashSet, fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{Result, error::ConfigErr, privacy::DEFAULT_DELTA};

/// How the initial global and local weights are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InitSpec {
    Const { value: f64 },
    Normal { mean: f64, std_dev: f64 },
    Uniform { low: f64, high: f64 },
}

impl InitSpec {
    /// Whether the distribution can be sampled: a finite, non-negative `std_dev`
    /// or a finite, non-empty `[low, high)` range.
    pub fn is_valid(&self) -> bool {
        match *self {
            InitSpec::Const { value } => value.is_finite(),
            InitSpec::Normal { mean, std_dev } => {
                mean.is_finite() && std_dev.is_finite() && std_dev >= 0.
            }
            InitSpec::Uniform { low, high } => low.is_finite() && high.is_finite() && low < high,
        }
    }
}

impl Default for InitSpec {
    fn default() -> Self {
        Self::Normal {
            mean: 0.,
            std_dev: 0.1,
        }
    }
}

/// Which executor fans the local updates out each round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutorSpec {
    /// Every node contributes, the rayon pool runs them in parallel.
    #[default]
    Parallel,
    /// Nodes that miss `timeout_ms` are excluded from the round.
    Deadline { timeout_ms: u64 },
}

/// Stopping criterion knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceConfig {
    pub divergence_threshold: f64,
    pub min_rounds: usize,
    pub early_stop_after: usize,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            divergence_threshold: 0.01,
            min_rounds: 10,
            early_stop_after: 15,
        }
    }
}

/// An explicitly declared hospital node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    pub sample_count: usize,
    #[serde(default = "NodeSpec::default_cloud")]
    pub cloud: String,
    #[serde(default = "NodeSpec::default_region")]
    pub region: String,
    #[serde(default = "NodeSpec::default_encryption")]
    pub encryption_active: bool,
    /// Artificial delay before the node's update becomes available.
    #[serde(default)]
    pub latency_ms: Option<u64>,
}

impl NodeSpec {
    /// Creates a new `NodeSpec` with the default cloud placement.
    ///
    /// # Arguments
    /// * `id` - The node's identity.
    /// * `sample_count` - The amount of local samples.
    pub fn new(id: impl Into<String>, sample_count: usize) -> Self {
        Self {
            id: id.into(),
            sample_count,
            cloud: Self::default_cloud(),
            region: Self::default_region(),
            encryption_active: Self::default_encryption(),
            latency_ms: None,
        }
    }

    /// Sets an artificial delay for this node's update.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency_ms = Some(u64::try_from(latency.as_millis()).unwrap_or(u64::MAX));
        self
    }

    fn default_cloud() -> String {
        "AWS".to_string()
    }

    fn default_region() -> String {
        "us-east-1".to_string()
    }

    fn default_encryption() -> bool {
        true
    }
}

/// Engine configuration, supplied once at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Size of the synthetic population, ignored when `nodes` is set.
    pub n_hospitals: usize,
    pub dp_enabled: bool,
    pub dp_sigma: f64,
    pub dp_delta: f64,
    pub learning_rate: f64,
    pub n_layers: usize,
    pub width: usize,
    pub local_epochs: usize,
    pub target_accuracy: f64,
    pub rollback_threshold: f64,
    pub convergence: ConvergenceConfig,
    pub init: InitSpec,
    pub executor: ExecutorSpec,
    pub nodes: Option<Vec<NodeSpec>>,
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            n_hospitals: 5,
            dp_enabled: true,
            dp_sigma: 0.15,
            dp_delta: DEFAULT_DELTA,
            learning_rate: 0.01,
            n_layers: 8,
            width: 64,
            local_epochs: 3,
            target_accuracy: 0.86,
            rollback_threshold: 0.05,
            convergence: ConvergenceConfig::default(),
            init: InitSpec::default(),
            executor: ExecutorSpec::default(),
            nodes: None,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Loads a configuration from a JSON file, missing fields take their defaults.
    ///
    /// # Arguments
    /// * `path` - The path of the JSON file.
    ///
    /// # Returns
    /// The parsed configuration or an io/json error.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn with_hospitals(mut self, n_hospitals: usize) -> Self {
        self.n_hospitals = n_hospitals;
        self
    }

    pub fn with_dp(mut self, enabled: bool, sigma: f64) -> Self {
        self.dp_enabled = enabled;
        self.dp_sigma = sigma;
        self
    }

    pub fn with_nodes(mut self, nodes: Vec<NodeSpec>) -> Self {
        self.nodes = Some(nodes);
        self
    }

    pub fn with_shape(mut self, n_layers: usize, width: usize) -> Self {
        self.n_layers = n_layers;
        self.width = width;
        self
    }

    pub fn with_executor(mut self, executor: ExecutorSpec) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_init(mut self, init: InitSpec) -> Self {
        self.init = init;
        self
    }

    pub fn with_rollback_threshold(mut self, threshold: f64) -> Self {
        self.rollback_threshold = threshold;
        self
    }

    pub fn with_convergence(mut self, convergence: ConvergenceConfig) -> Self {
        self.convergence = convergence;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// The `(layers, width)` shape shared by every weight tensor.
    pub fn shape(&self) -> (usize, usize) {
        (self.n_layers, self.width)
    }

    /// The configured per-node deadline, if any.
    pub fn node_timeout(&self) -> Option<Duration> {
        match self.executor {
            ExecutorSpec::Parallel => None,
            ExecutorSpec::Deadline { timeout_ms } => Some(Duration::from_millis(timeout_ms)),
        }
    }

    /// Checks every invariant the engine relies on.
    ///
    /// # Returns
    /// The first `ConfigErr` found.
    pub fn validate(&self) -> std::result::Result<(), ConfigErr> {
        match &self.nodes {
            Some(nodes) => {
                if nodes.is_empty() {
                    return Err(ConfigErr::NoNodes);
                }

                let mut seen = HashSet::with_capacity(nodes.len());
                for node in nodes {
                    if node.sample_count == 0 {
                        return Err(ConfigErr::ZeroSampleCount {
                            node: node.id.clone(),
                        });
                    }
                    if !seen.insert(node.id.as_str()) {
                        return Err(ConfigErr::DuplicateNodeId(node.id.clone()));
                    }
                }
            }
            None if self.n_hospitals == 0 => return Err(ConfigErr::NoNodes),
            None => {}
        }

        if !self.dp_sigma.is_finite() || self.dp_sigma < 0. {
            return Err(ConfigErr::NegativeSigma(self.dp_sigma));
        }
        if !(self.dp_delta > 0. && self.dp_delta < 1.) {
            return Err(ConfigErr::InvalidDelta(self.dp_delta));
        }
        if !(self.learning_rate > 0. && self.learning_rate.is_finite()) {
            return Err(ConfigErr::NonPositiveLearningRate(self.learning_rate));
        }
        if self.n_layers == 0 || self.width == 0 {
            return Err(ConfigErr::EmptyShape {
                layers: self.n_layers,
                width: self.width,
            });
        }
        if !(0.5..=0.99).contains(&self.target_accuracy) {
            return Err(ConfigErr::InvalidTarget(self.target_accuracy));
        }

        let thresholds = [
            ("rollback_threshold", self.rollback_threshold),
            (
                "divergence_threshold",
                self.convergence.divergence_threshold,
            ),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() || value < 0. {
                return Err(ConfigErr::NegativeThreshold { name, value });
            }
        }

        if !self.init.is_valid() {
            return Err(ConfigErr::InvalidInit(self.init));
        }

        if self.node_timeout() == Some(Duration::ZERO) {
            return Err(ConfigErr::ZeroTimeout);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(EngineConfig::default().validate(), Ok(()));
    }

    #[test]
    fn empty_population_rejected() {
        let config = EngineConfig::default().with_hospitals(0);
        assert_eq!(config.validate(), Err(ConfigErr::NoNodes));

        let config = EngineConfig::default().with_nodes(vec![]);
        assert_eq!(config.validate(), Err(ConfigErr::NoNodes));
    }

    #[test]
    fn zero_sample_count_rejected() {
        let config = EngineConfig::default()
            .with_nodes(vec![NodeSpec::new("a", 10), NodeSpec::new("b", 0)]);

        assert_eq!(
            config.validate(),
            Err(ConfigErr::ZeroSampleCount {
                node: "b".to_string()
            })
        );
    }

    #[test]
    fn duplicate_ids_rejected() {
        let config = EngineConfig::default()
            .with_nodes(vec![NodeSpec::new("a", 10), NodeSpec::new("a", 20)]);

        assert_eq!(
            config.validate(),
            Err(ConfigErr::DuplicateNodeId("a".to_string()))
        );
    }

    #[test]
    fn negative_sigma_rejected() {
        let config = EngineConfig::default().with_dp(true, -0.5);
        assert_eq!(config.validate(), Err(ConfigErr::NegativeSigma(-0.5)));
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = EngineConfig::default().with_executor(ExecutorSpec::Deadline { timeout_ms: 0 });
        assert_eq!(config.validate(), Err(ConfigErr::ZeroTimeout));
    }

    #[test]
    fn invalid_init_rejected() {
        let cases = [
            InitSpec::Normal {
                mean: 0.,
                std_dev: -1.,
            },
            InitSpec::Normal {
                mean: 0.,
                std_dev: f64::NAN,
            },
            InitSpec::Uniform { low: 1., high: -1. },
            InitSpec::Uniform { low: 0., high: 0. },
            InitSpec::Const {
                value: f64::INFINITY,
            },
        ];

        for init in cases {
            let config = EngineConfig::default().with_init(init);
            assert_eq!(config.validate(), Err(ConfigErr::InvalidInit(init)));
        }

        let zero_spread = EngineConfig::default().with_init(InitSpec::Normal {
            mean: 0.,
            std_dev: 0.,
        });
        assert_eq!(zero_spread.validate(), Ok(()));
    }

    #[test]
    fn huge_latency_saturates() {
        let spec = NodeSpec::new("a", 10).with_latency(Duration::MAX);
        assert_eq!(spec.latency_ms, Some(u64::MAX));

        let spec = NodeSpec::new("a", 10).with_latency(Duration::from_millis(250));
        assert_eq!(spec.latency_ms, Some(250));
    }

    #[test]
    fn partial_json_takes_defaults() {
        let json = r#"{
            "n_hospitals": 3,
            "dp_enabled": false,
            "executor": { "kind": "deadline", "timeout_ms": 250 },
            "nodes": [{ "id": "Hospital-A", "sample_count": 120 }]
        }"#;

        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.n_hospitals, 3);
        assert!(!config.dp_enabled);
        assert_eq!(config.dp_sigma, 0.15);
        assert_eq!(config.node_timeout(), Some(Duration::from_millis(250)));

        let nodes = config.nodes.unwrap();
        assert_eq!(nodes[0].cloud, "AWS");
        assert!(nodes[0].encryption_active);
        assert_eq!(nodes[0].latency_ms, None);
    }
}
