mod orchestrator;
mod round;
mod summary;

pub use orchestrator::RoundOrchestrator;
pub use round::{FLRound, RoundStatus};
pub use summary::{SimulationReport, Summary};
