use std::{
    env, fs,
    io::{self, Write},
};

use federation::{EngineConfig, RoundOrchestrator, privacy};
use log::{debug, info};

const DEFAULT_ROUNDS: usize = 20;
const CURVE_SIGMAS: [f64; 6] = [0.05, 0.1, 0.15, 0.25, 0.5, 1.];

fn main() -> io::Result<()> {
    env_logger::init();

    let config = match env::var("FL_CONFIG") {
        Ok(path) => {
            info!(path = path.as_str(); "loading configuration");
            EngineConfig::from_json_file(path)?
        }
        Err(_) => EngineConfig::default(),
    };

    let rounds = match env::var("FL_ROUNDS") {
        Ok(rounds) => rounds.parse().map_err(io::Error::other)?,
        Err(_) => DEFAULT_ROUNDS,
    };

    for (sigma, epsilon) in privacy::privacy_curve(&CURVE_SIGMAS, config.dp_delta) {
        debug!(sigma = sigma, epsilon = epsilon; "privacy trade-off");
    }

    let mut orchestrator = RoundOrchestrator::new(config)?;
    orchestrator.run_simulation(rounds)?;

    if let Some(summary) = orchestrator.summary() {
        info!(
            rounds = summary.total_rounds,
            best_round = summary.best_round,
            final_accuracy = summary.final_accuracy,
            converged = summary.converged;
            "simulation finished"
        );
    }

    let report = orchestrator.report();
    match env::var("FL_REPORT") {
        Ok(path) => {
            fs::write(&path, report.to_json_pretty()?)?;
            info!(path = path.as_str(); "report written");
        }
        Err(_) => {
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &report)?;
            writeln!(stdout)?;
        }
    }

    Ok(())
}
