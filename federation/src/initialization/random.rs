use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

use super::ParamGen;
use crate::{Result, Weights, config::InitSpec, error::ConfigErr};

/// A parameter generator that follows a certain probabilistic distribution.
#[derive(Debug, Clone, Copy)]
pub struct RandParamGen<D: Distribution<f64>> {
    distribution: D,
}

impl<D: Distribution<f64>> RandParamGen<D> {
    /// Creates a new `RandParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `distribution` - The distribution to sample the random numbers from.
    pub fn new(distribution: D) -> Self {
        Self { distribution }
    }
}

impl RandParamGen<Uniform<f64>> {
    /// Creates a new `RandParamGen` parameter generator with a uniform distribution.
    ///
    /// # Arguments
    /// * `low` - The inclusive lower limit.
    /// * `high` - The exclusive upper limit.
    ///
    /// # Returns
    /// An `InvalidInit` error if the range is empty or not finite.
    pub fn uniform(low: f64, high: f64) -> Result<Self> {
        let init = InitSpec::Uniform { low, high };
        if !init.is_valid() {
            return Err(ConfigErr::InvalidInit(init).into());
        }

        Ok(Self::new(Uniform::new(low, high)?))
    }
}

impl RandParamGen<Normal<f64>> {
    /// Creates a new `RandParamGen` parameter generator with a normal distribution.
    ///
    /// # Arguments
    /// * `mean` - The mean of the distribution.
    /// * `std_dev` - The standard deviation of the distribution.
    ///
    /// # Returns
    /// An `InvalidInit` error if `mean` or `std_dev` aren't finite or `std_dev` is negative.
    pub fn normal(mean: f64, std_dev: f64) -> Result<Self> {
        let init = InitSpec::Normal { mean, std_dev };
        if !init.is_valid() {
            return Err(ConfigErr::InvalidInit(init).into());
        }

        Ok(Self::new(Normal::new(mean, std_dev)?))
    }
}

impl<D: Distribution<f64>> ParamGen for RandParamGen<D> {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R, shape: (usize, usize)) -> Weights {
        Weights::from_shape_simple_fn(shape, || self.distribution.sample(rng))
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn seeded_rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn shape_is_respected() {
        let param_gen = RandParamGen::normal(0., 0.1).unwrap();
        let weights = param_gen.sample(&mut seeded_rng(), (8, 64));
        assert_eq!(weights.dim(), (8, 64));
    }

    #[test]
    fn same_seed_same_tensor() {
        let param_gen = RandParamGen::normal(0., 0.1).unwrap();

        let a = param_gen.sample(&mut seeded_rng(), (4, 4));
        let b = param_gen.sample(&mut seeded_rng(), (4, 4));
        assert_eq!(a, b);
    }

    #[test]
    fn uniform_stays_in_range() {
        let param_gen = RandParamGen::uniform(-1., 1.).unwrap();
        let weights = param_gen.sample(&mut seeded_rng(), (10, 10));
        assert!(weights.iter().all(|w| (-1.0..1.0).contains(w)));
    }

    #[test]
    fn invalid_distributions_are_rejected() {
        use crate::FederationErr;

        let negative = RandParamGen::normal(0., -1.);
        assert!(matches!(
            negative,
            Err(FederationErr::Config(ConfigErr::InvalidInit(_)))
        ));
        assert!(RandParamGen::normal(0., f64::NAN).is_err());
        assert!(RandParamGen::uniform(1., -1.).is_err());
        assert!(RandParamGen::uniform(0., f64::INFINITY).is_err());
    }
}
