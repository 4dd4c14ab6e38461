//! Differential privacy for local updates.
//!
//! Noise follows the Gaussian mechanism calibrated to a per-node sensitivity,
//! and the reported privacy cost is the analytic `(epsilon, delta)` bound.

mod accountant;

pub use accountant::{DEFAULT_DELTA, PrivacyAccountant, epsilon, privacy_curve, sensitivity};
