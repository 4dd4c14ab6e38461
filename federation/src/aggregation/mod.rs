mod fedavg;

pub use fedavg::{Aggregate, aggregate, divergence, weighting};
