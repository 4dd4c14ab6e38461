pub mod accuracy;
pub mod aggregation;
pub mod config;
pub mod convergence;
pub mod error;
pub mod execution;
pub mod initialization;
pub mod node;
pub mod orchestration;
pub mod privacy;
pub mod registry;

/// A weight tensor of shape `(layers, width)`, shared by every node and the global model.
pub type Weights = ndarray::Array2<f64>;

pub use config::{EngineConfig, NodeSpec};
pub use error::{ConfigErr, FederationErr, Result};
pub use orchestration::{FLRound, RoundOrchestrator, RoundStatus, SimulationReport, Summary};
pub use registry::{ModelVersion, RegistryHandle};
