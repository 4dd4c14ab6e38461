use std::{collections::BTreeMap, time::SystemTime};

use crate::Weights;

/// An immutable snapshot of the global model after a round.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelVersion {
    pub version_id: usize,
    pub weights: Weights,
    pub accuracy: f64,
    pub created_at: SystemTime,
}

/// Versioned snapshots of the global model, keyed by round number.
///
/// Keeps track of the best version seen so far, which is the source of every rollback.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    versions: BTreeMap<usize, ModelVersion>,
    best: Option<usize>,
}

impl ModelRegistry {
    /// Creates a new empty `ModelRegistry`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a deep copy of `weights` under `version_id`.
    ///
    /// The best pointer only moves when `accuracy` strictly exceeds the current best.
    ///
    /// # Arguments
    /// * `version_id` - The round that produced this version.
    /// * `weights` - The weights to snapshot.
    /// * `accuracy` - The accuracy of this version.
    pub fn save_version(&mut self, version_id: usize, weights: &Weights, accuracy: f64) {
        let version = ModelVersion {
            version_id,
            weights: weights.clone(),
            accuracy,
            created_at: SystemTime::now(),
        };
        self.versions.insert(version_id, version);

        let improved = match self.get_best() {
            Some(best) => accuracy > best.accuracy,
            None => true,
        };

        if improved {
            self.best = Some(version_id);
        }
    }

    /// The most accurate version so far, if any.
    pub fn get_best(&self) -> Option<&ModelVersion> {
        self.best.and_then(|id| self.versions.get(&id))
    }

    /// The most recently saved version, if any.
    pub fn get_latest(&self) -> Option<&ModelVersion> {
        self.versions.values().next_back()
    }

    pub fn get(&self, version_id: usize) -> Option<&ModelVersion> {
        self.versions.get(&version_id)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Iterates over every version in round order.
    pub fn versions(&self) -> impl Iterator<Item = &ModelVersion> {
        self.versions.values()
    }

    /// Drops every version and the best pointer.
    pub fn clear(&mut self) {
        self.versions.clear();
        self.best = None;
    }
}
