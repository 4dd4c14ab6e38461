mod handle;
mod model_registry;

pub use handle::RegistryHandle;
pub use model_registry::{ModelRegistry, ModelVersion};
