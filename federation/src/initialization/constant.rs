use rand::Rng;

use super::ParamGen;
use crate::Weights;

/// A parameter generator that always generates the same value.
#[derive(Debug, Clone, Copy)]
pub struct ConstParamGen {
    value: f64,
}

impl ConstParamGen {
    /// Creates a new `ConstParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `value` - The value to fill every tensor with.
    ///
    /// # Returns
    /// A new `ConstParamGen` instance.
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl ParamGen for ConstParamGen {
    fn sample<R: Rng + ?Sized>(&self, _rng: &mut R, shape: (usize, usize)) -> Weights {
        Weights::from_elem(shape, self.value)
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn fills_whole_shape() {
        let mut rng = StdRng::seed_from_u64(0);
        let weights = ConstParamGen::new(0.5).sample(&mut rng, (3, 4));

        assert_eq!(weights.dim(), (3, 4));
        assert!(weights.iter().all(|&w| w == 0.5));
    }

    #[test]
    fn leaves_rng_untouched() {
        let mut used = StdRng::seed_from_u64(7);
        let mut fresh = StdRng::seed_from_u64(7);

        ConstParamGen::new(1.).sample(&mut used, (2, 2));
        assert_eq!(used.random::<u64>(), fresh.random::<u64>());
    }
}
