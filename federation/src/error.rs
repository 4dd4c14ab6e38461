use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use rand_distr::{NormalError, uniform::Error as UniformError};

use crate::config::InitSpec;

/// The result type used in the entire federation crate.
pub type Result<T> = std::result::Result<T, FederationErr>;

/// Invalid engine configuration, always detected before any round executes.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigErr {
    NoNodes,
    ZeroSampleCount {
        node: String,
    },
    DuplicateNodeId(String),
    NegativeSigma(f64),
    InvalidDelta(f64),
    NonPositiveLearningRate(f64),
    EmptyShape {
        layers: usize,
        width: usize,
    },
    InvalidTarget(f64),
    NegativeThreshold {
        name: &'static str,
        value: f64,
    },
    ZeroRounds,
    ZeroTimeout,
    InvalidInit(InitSpec),
    NoUpdates,
    LengthMismatch {
        updates: usize,
        counts: usize,
    },
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
}

impl Display for ConfigErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigErr::NoNodes => write!(f, "the node set is empty"),
            ConfigErr::ZeroSampleCount { node } => {
                write!(f, "node {node} has a non-positive sample count")
            }
            ConfigErr::DuplicateNodeId(id) => write!(f, "node id {id} is used more than once"),
            ConfigErr::NegativeSigma(sigma) => {
                write!(f, "dp sigma must be finite and non-negative, got {sigma}")
            }
            ConfigErr::InvalidDelta(delta) => {
                write!(f, "dp delta must lie in (0, 1), got {delta}")
            }
            ConfigErr::NonPositiveLearningRate(lr) => {
                write!(f, "learning rate must be positive, got {lr}")
            }
            ConfigErr::EmptyShape { layers, width } => {
                write!(f, "weight shape must be non-empty, got {layers}x{width}")
            }
            ConfigErr::InvalidTarget(target) => {
                write!(f, "target accuracy must lie in [0.5, 0.99], got {target}")
            }
            ConfigErr::NegativeThreshold { name, value } => {
                write!(f, "{name} must be finite and non-negative, got {value}")
            }
            ConfigErr::ZeroRounds => write!(f, "the round budget must be at least one"),
            ConfigErr::ZeroTimeout => write!(f, "the per-node timeout must be positive"),
            ConfigErr::InvalidInit(init) => write!(f, "invalid weight initialization {init:?}"),
            ConfigErr::NoUpdates => write!(f, "there are no local updates to aggregate"),
            ConfigErr::LengthMismatch { updates, counts } => write!(
                f,
                "got {updates} local updates but {counts} sample counts"
            ),
            ConfigErr::ShapeMismatch { expected, got } => write!(
                f,
                "weight shape mismatch, expected {}x{} and got {}x{}",
                expected.0, expected.1, got.0, got.1
            ),
        }
    }
}

impl Error for ConfigErr {}

/// The federation crate's error type.
#[derive(Debug)]
pub enum FederationErr {
    Config(ConfigErr),
    Distribution(String),
    RoundOutOfOrder { expected: usize, got: usize },
    Json(serde_json::Error),
    Io(io::Error),
}

impl Display for FederationErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FederationErr::Config(e) => write!(f, "configuration error: {e}"),
            FederationErr::Distribution(msg) => write!(f, "invalid distribution: {msg}"),
            FederationErr::RoundOutOfOrder { expected, got } => {
                write!(f, "round {got} requested while round {expected} is next")
            }
            FederationErr::Json(e) => write!(f, "json error: {e}"),
            FederationErr::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for FederationErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FederationErr::Config(e) => Some(e),
            FederationErr::Json(e) => Some(e),
            FederationErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigErr> for FederationErr {
    fn from(value: ConfigErr) -> Self {
        Self::Config(value)
    }
}

impl From<NormalError> for FederationErr {
    fn from(value: NormalError) -> Self {
        Self::Distribution(value.to_string())
    }
}

impl From<UniformError> for FederationErr {
    fn from(value: UniformError) -> Self {
        Self::Distribution(value.to_string())
    }
}

impl From<serde_json::Error> for FederationErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<io::Error> for FederationErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<FederationErr> for io::Error {
    fn from(value: FederationErr) -> Self {
        match value {
            FederationErr::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidInput, other),
        }
    }
}
