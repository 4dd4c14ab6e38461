use std::time::Duration;

use rand::Rng;

use super::HospitalNode;
use crate::{config::NodeSpec, initialization::ParamGen};

const MIN_SAMPLES: usize = 150;
const MAX_SAMPLES: usize = 800;

const CLOUDS: [(&str, [&str; 3]); 3] = [
    ("AWS", ["us-east-1", "us-west-2", "eu-central-1"]),
    ("GCP", ["us-central1", "europe-west1", "asia-east1"]),
    ("Azure", ["eastus", "westeurope", "southeastasia"]),
];

/// Builds the node collection owned by the orchestrator.
pub struct Population;

impl Population {
    /// Generates a heterogeneous synthetic population.
    ///
    /// Sample counts are uniform in `[150, 800)`, clouds are assigned round-robin and
    /// each node lands in a random region of its cloud.
    ///
    /// # Arguments
    /// * `n` - The amount of nodes.
    /// * `shape` - The shape of every weight tensor.
    /// * `param_gen` - Generator for the initial local weights.
    /// * `rng` - The engine's random source.
    ///
    /// # Returns
    /// The nodes in id order.
    pub fn synthetic<P, R>(n: usize, shape: (usize, usize), param_gen: &P, rng: &mut R) -> Vec<HospitalNode>
    where
        P: ParamGen,
        R: Rng + ?Sized,
    {
        (0..n)
            .map(|i| {
                let sample_count = rng.random_range(MIN_SAMPLES..MAX_SAMPLES);
                let (cloud, regions) = CLOUDS[i % CLOUDS.len()];
                let region = regions[rng.random_range(0..regions.len())];
                let weights = param_gen.sample(rng, shape);

                HospitalNode::new(
                    Self::node_id(i),
                    sample_count,
                    cloud.to_string(),
                    region.to_string(),
                    weights,
                )
            })
            .collect()
    }

    /// Builds the nodes declared in the configuration.
    ///
    /// # Arguments
    /// * `specs` - The validated node declarations.
    /// * `shape` - The shape of every weight tensor.
    /// * `param_gen` - Generator for the initial local weights.
    /// * `rng` - The engine's random source.
    ///
    /// # Returns
    /// The nodes in declaration order.
    pub fn from_specs<P, R>(
        specs: &[NodeSpec],
        shape: (usize, usize),
        param_gen: &P,
        rng: &mut R,
    ) -> Vec<HospitalNode>
    where
        P: ParamGen,
        R: Rng + ?Sized,
    {
        specs
            .iter()
            .map(|spec| {
                let mut node = HospitalNode::new(
                    spec.id.clone(),
                    spec.sample_count,
                    spec.cloud.clone(),
                    spec.region.clone(),
                    param_gen.sample(rng, shape),
                );
                node.encryption_active = spec.encryption_active;
                node.latency = spec.latency_ms.map(Duration::from_millis);
                node
            })
            .collect()
    }

    /// Spreadsheet-style node naming: `Hospital-A` ... `Hospital-Z`, `Hospital-AA` ...
    ///
    /// # Arguments
    /// * `index` - The zero based position of the node.
    pub fn node_id(mut index: usize) -> String {
        let mut label = Vec::new();

        loop {
            label.push(char::from(b'A' + (index % 26) as u8));
            if index < 26 {
                break;
            }
            index = index / 26 - 1;
        }

        let label: String = label.iter().rev().collect();
        format!("Hospital-{label}")
    }
}
