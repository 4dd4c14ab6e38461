//! Local-update fan-out.
//!
//! An executor runs every node's local update for a round and hands back one
//! outcome per node. Collecting the outcomes is the round's barrier.

mod deadline;
mod executor;
mod job;
mod parallel;

pub use deadline::DeadlineExec;
pub use executor::Executor;
pub use job::{Exclusion, NodeJob, NodeOutcome, NodeUpdate, RoundContext};
pub use parallel::ParallelExec;
