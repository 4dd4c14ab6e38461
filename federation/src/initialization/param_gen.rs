use rand::Rng;

use crate::Weights;

/// A `ParamGen` generates values for the initial state of a weight tensor.
pub trait ParamGen {
    /// Should sample a full tensor of the given shape.
    ///
    /// # Arguments
    /// * `rng` - The random source to draw from, untouched by deterministic generators.
    /// * `shape` - The `(layers, width)` shape of the tensor.
    ///
    /// # Returns
    /// A freshly generated weight tensor.
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R, shape: (usize, usize)) -> Weights;
}
