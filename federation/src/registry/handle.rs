use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{ModelRegistry, ModelVersion};

/// A cheaply cloneable, shared view of a `ModelRegistry`.
///
/// The orchestrator is the only writer; any amount of readers may inspect the
/// registry concurrently between rounds.
#[derive(Debug, Clone, Default)]
pub struct RegistryHandle(Arc<RwLock<ModelRegistry>>);

impl RegistryHandle {
    /// Creates a new `RegistryHandle` over an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the registry for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, ModelRegistry> {
        self.0.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, ModelRegistry> {
        self.0.write()
    }

    /// A copy of the best version, if any.
    pub fn best(&self) -> Option<ModelVersion> {
        self.read().get_best().cloned()
    }

    /// A copy of the latest version, if any.
    pub fn latest(&self) -> Option<ModelVersion> {
        self.read().get_latest().cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::Weights;

    #[test]
    fn clones_share_the_registry() {
        let handle = RegistryHandle::new();
        let reader = handle.clone();

        handle.write().save_version(1, &Weights::zeros((1, 1)), 0.7);

        assert_eq!(reader.len(), 1);
        assert_eq!(reader.best().unwrap().version_id, 1);
    }

    #[test]
    fn concurrent_readers() {
        let handle = RegistryHandle::new();
        for round in 1..=5 {
            handle
                .write()
                .save_version(round, &Weights::zeros((2, 2)), round as f64 / 10.);
        }

        thread::scope(|s| {
            for _ in 0..4 {
                let reader = handle.clone();
                s.spawn(move || {
                    assert_eq!(reader.latest().unwrap().version_id, 5);
                    assert_eq!(reader.best().unwrap().version_id, 5);
                });
            }
        });
    }
}
