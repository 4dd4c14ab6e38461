mod hospital;
mod population;
mod simulator;

pub use hospital::{HospitalNode, NodeDescriptor, NodeStats};
pub use population::Population;
pub use simulator::{DriftSimulator, NodeTrainingSimulator};
