use crate::config::ConvergenceConfig;

/// Evaluates the stopping criterion after each round.
#[derive(Debug, Clone, Copy)]
pub struct ConvergenceMonitor {
    divergence_threshold: f64,
    min_rounds: usize,
    early_stop_after: usize,
}

impl ConvergenceMonitor {
    /// Whether a round with the given divergence counts as converged.
    ///
    /// # Arguments
    /// * `divergence` - The round's mean distance to the aggregate.
    /// * `round_num` - The round's number.
    pub fn is_converged(&self, divergence: f64, round_num: usize) -> bool {
        divergence < self.divergence_threshold && round_num >= self.min_rounds
    }

    /// Whether a converged round should end the simulation.
    pub fn should_stop(&self, converged: bool, round_num: usize) -> bool {
        converged && round_num > self.early_stop_after
    }
}

impl From<ConvergenceConfig> for ConvergenceMonitor {
    fn from(config: ConvergenceConfig) -> Self {
        Self {
            divergence_threshold: config.divergence_threshold,
            min_rounds: config.min_rounds,
            early_stop_after: config.early_stop_after,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> ConvergenceMonitor {
        ConvergenceConfig::default().into()
    }

    #[test]
    fn never_converged_before_min_rounds() {
        let monitor = monitor();

        for round in 1..10 {
            assert!(!monitor.is_converged(0., round));
        }
        assert!(monitor.is_converged(0., 10));
    }

    #[test]
    fn threshold_is_strict() {
        let monitor = monitor();

        assert!(monitor.is_converged(0.0099, 12));
        assert!(!monitor.is_converged(0.01, 12));
    }

    #[test]
    fn stops_only_after_early_stop_round() {
        let monitor = monitor();

        assert!(!monitor.should_stop(true, 15));
        assert!(monitor.should_stop(true, 16));
        assert!(!monitor.should_stop(false, 30));
    }
}
