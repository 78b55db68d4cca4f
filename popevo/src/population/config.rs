use crate::{Activation, BreedConfig, Interval};

use serde::{Deserialize, Serialize};

use std::num::NonZeroUsize;

/// Configuration data for population generation
/// and evolution.
///
/// # Note
/// `breeding.winners` must lie in `1..=population_size`,
/// and `activations` must hold one entry per layer after
/// the input layer. Breaking either rule is reported as an
/// error at construction or on the first evolution step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Layer widths, input layer first.
    pub topology: Vec<usize>,
    /// Activation of each non-input layer.
    pub activations: Vec<Activation>,
    /// Number of networks evolved side by side.
    pub population_size: NonZeroUsize,
    /// Interval initial parameters are drawn from.
    pub initial: Interval,
    pub breeding: BreedConfig,
}

impl EvolutionConfig {
    /// Returns a "zero-valued" default configuration.
    /// All values are 0, empty, or in the case of
    /// `NonZeroUsize`s, 1.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments.
    /// It is meant as a way to abbreviate configuration
    /// instantiation, or to fill in unused values.
    ///
    /// # Examples
    /// ```
    /// use popevo::{Activation, EvolutionConfig, Interval};
    ///
    /// let config = EvolutionConfig {
    ///     topology: vec![2, 4, 1],
    ///     activations: vec![Activation::Tanh, Activation::Sigmoid],
    ///     initial: Interval::uniform(-1.0, 1.0),
    ///     ..EvolutionConfig::zero()
    /// };
    /// ```
    pub const fn zero() -> EvolutionConfig {
        EvolutionConfig {
            topology: Vec::new(),
            activations: Vec::new(),
            population_size: NonZeroUsize::MIN,
            initial: Interval::zero(),
            breeding: BreedConfig::zero(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExecutionContext, Population};

    #[test]
    fn zero_config_holds_one_member() {
        let zero = EvolutionConfig::zero();
        assert_eq!(zero.population_size.get(), 1);
        assert_eq!(zero.breeding.winners, 0);

        let config = EvolutionConfig {
            topology: vec![1, 1],
            activations: vec![Activation::Identity],
            breeding: BreedConfig::new(1, Interval::zero()),
            ..EvolutionConfig::zero()
        };
        let mut ctx = ExecutionContext::seeded(0);
        let population = Population::new(config, &mut ctx).unwrap();
        assert_eq!(population.network().population_size(), 1);
    }
}
