//! A Population couples a [`PopulationNetwork`] with the
//! fitness of its members, and steps it through generations
//! using a fitness evaluator as the source of selective pressure.
mod config;
mod errors;
pub mod logging;

pub use config::EvolutionConfig;
pub use errors::PopulationError;

use crate::network::rank;
use crate::{ExecutionContext, FitnessEvaluator, NetworkError, PopulationNetwork};

use tracing::debug;

/// A population of networks under evolution.
#[derive(Clone, Debug)]
pub struct Population {
    network: PopulationNetwork,
    fitness: Option<Vec<f32>>,
    generation: usize,
    config: EvolutionConfig,
}

impl Population {
    /// Creates a randomly initialized population.
    ///
    /// # Errors
    /// Returns an error if the topology and activations don't
    /// describe a valid network, or if the configured winner
    /// count is not in `1..=population_size`.
    ///
    /// # Examples
    /// ```
    /// use popevo::{Activation, BreedConfig, EvolutionConfig, ExecutionContext, Interval, Population};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = EvolutionConfig {
    ///     topology: vec![2, 3, 1],
    ///     activations: vec![Activation::Tanh, Activation::Sigmoid],
    ///     population_size: NonZeroUsize::new(20).unwrap(),
    ///     initial: Interval::uniform(-1.0, 1.0),
    ///     breeding: BreedConfig::new(5, Interval::uniform(-0.1, 0.1)),
    /// };
    /// let mut ctx = ExecutionContext::seeded(1);
    /// let population = Population::new(config, &mut ctx).unwrap();
    /// assert_eq!(population.network().population_size(), 20);
    /// ```
    pub fn new(
        config: EvolutionConfig,
        context: &mut ExecutionContext,
    ) -> Result<Population, PopulationError> {
        let winners = config.breeding.winners;
        let size = config.population_size.get();
        if winners == 0 || winners > size {
            return Err(NetworkError::InvalidWinnerCount {
                winners,
                population: size,
            }
            .into());
        }
        let network = PopulationNetwork::random(
            &config.topology,
            &config.activations,
            config.population_size,
            &config.initial,
            context,
        )?;
        Ok(Population {
            network,
            fitness: None,
            generation: 0,
            config,
        })
    }

    /// Scores every member with `evaluator` and stores the result.
    ///
    /// # Errors
    /// Returns [`PopulationError::Evaluator`] if the evaluator fails,
    /// or a network error if it doesn't return one finite-or-infinite
    /// (non-NaN) value per member.
    ///
    /// # Examples
    /// ```
    /// # use popevo::{Activation, BreedConfig, EvolutionConfig, Interval};
    /// use popevo::{ExecutionContext, NetworkError, Population, PopulationNetwork};
    /// use ndarray::Array3;
    ///
    /// # let config = EvolutionConfig {
    /// #     topology: vec![1, 1],
    /// #     activations: vec![Activation::Identity],
    /// #     population_size: std::num::NonZeroUsize::new(4).unwrap(),
    /// #     initial: Interval::uniform(-1.0, 1.0),
    /// #     breeding: BreedConfig::new(1, Interval::zero()),
    /// # };
    /// let mut ctx = ExecutionContext::seeded(0);
    /// let mut population = Population::new(config, &mut ctx).unwrap();
    ///
    /// // Members whose output for 1.0 is closest to zero score best.
    /// let evaluator = |ctx: &ExecutionContext, network: &PopulationNetwork| {
    ///     let input = Array3::<f32>::ones((1, 1, network.population_size()));
    ///     let output = network.feed_forward(ctx, input.view())?;
    ///     Ok::<Vec<f32>, NetworkError>(output.iter().map(|y| -y.abs()).collect())
    /// };
    /// population.evaluate_fitness(&evaluator, &ctx).unwrap();
    /// assert!(population.champion().is_some());
    /// ```
    pub fn evaluate_fitness<E: FitnessEvaluator>(
        &mut self,
        evaluator: &E,
        context: &ExecutionContext,
    ) -> Result<(), PopulationError> {
        let fitness = evaluator
            .evaluate(context, &self.network)
            .map_err(|e| PopulationError::Evaluator(Box::new(e)))?;
        self.set_fitness(fitness)
    }

    /// Stores externally computed fitness values, one per member.
    ///
    /// # Errors
    /// Returns an error if the length doesn't match the population
    /// size or a value is NaN. Previously stored fitness is kept.
    pub fn set_fitness(&mut self, fitness: Vec<f32>) -> Result<(), PopulationError> {
        let population = self.network.population_size();
        if fitness.len() != population {
            return Err(NetworkError::ShapeMismatch {
                context: "fitness vector length",
                expected: population,
                found: fitness.len(),
            }
            .into());
        }
        if let Some(index) = fitness.iter().position(|f| f.is_nan()) {
            return Err(NetworkError::InvalidFitness { index }.into());
        }
        self.fitness = Some(fitness);
        Ok(())
    }

    /// Breeds the next generation from the current fitness values.
    ///
    /// Fitness is consumed: the new generation must be evaluated
    /// before it can evolve again.
    ///
    /// # Errors
    /// Returns [`PopulationError::MissingFitness`] if the current
    /// generation hasn't been evaluated, or any error raised by
    /// [`PopulationNetwork::breed`]. The population is unchanged on error.
    pub fn evolve(&mut self, context: &mut ExecutionContext) -> Result<(), PopulationError> {
        let fitness = self
            .fitness
            .as_deref()
            .ok_or(PopulationError::MissingFitness)?;
        self.network
            .breed(fitness, &self.config.breeding, context)?;
        self.fitness = None;
        self.generation += 1;
        debug!(generation = self.generation, "population evolved");
        Ok(())
    }

    /// Replaces the population with a freshly initialized one
    /// built from the same configuration.
    ///
    /// # Errors
    /// Propagates construction errors, see [`Population::new`].
    pub fn reset(&mut self, context: &mut ExecutionContext) -> Result<(), PopulationError> {
        *self = Population::new(self.config.clone(), context)?;
        Ok(())
    }

    /// Returns the index and fitness of the currently
    /// best-performing member, or `None` if the current
    /// generation hasn't been evaluated.
    ///
    /// Ties go to the lowest index.
    pub fn champion(&self) -> Option<(usize, f32)> {
        self.fitness
            .as_deref()
            .and_then(|f| rank(f).first().map(|(fitness, index)| (*index, *fitness)))
    }

    /// Fitness of the current generation, if evaluated.
    pub fn fitness(&self) -> Option<&[f32]> {
        self.fitness.as_deref()
    }

    /// Returns the current generation number.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn network(&self) -> &PopulationNetwork {
        &self.network
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }
}
