use super::{Layer, NetworkError, PopulationNetwork, Result};
use crate::tensor::{self, ExecutionContext, Interval};

use ndarray::{Array, ArrayView, ArrayViewMut2, Axis, Dimension};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What happens to the baseline mutation noise
/// of a slot that receives a crossover child.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildNoise {
    /// The child overwrites the noise, so children inherit their
    /// parents' values unperturbed. Mutation is then only visible
    /// in slots that no child reaches.
    #[default]
    Overwritten,
    /// The noise is added on top of the child's inherited values.
    Additive,
}

/// Parameters of a single breeding step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BreedConfig {
    /// Number of top-ranked members carried over unchanged.
    /// Must be in `1..=P`.
    pub winners: usize,
    /// Interval the mutation noise is drawn from.
    pub mutation: Interval,
    /// How mutation noise interacts with crossover children.
    pub child_noise: ChildNoise,
}

impl BreedConfig {
    /// Returns a "zero-valued" configuration: no winners,
    /// zero noise, historical child noise handling.
    ///
    /// # Note
    /// Breeding with zero winners always fails; this is meant
    /// to abbreviate configuration instantiation.
    ///
    /// # Examples
    /// ```
    /// use popevo::{BreedConfig, Interval};
    ///
    /// let config = BreedConfig {
    ///     winners: 500,
    ///     mutation: Interval::uniform(-0.05, 0.05),
    ///     ..BreedConfig::zero()
    /// };
    /// ```
    pub const fn zero() -> BreedConfig {
        BreedConfig {
            winners: 0,
            mutation: Interval::zero(),
            child_noise: ChildNoise::Overwritten,
        }
    }

    pub const fn new(winners: usize, mutation: Interval) -> BreedConfig {
        BreedConfig {
            winners,
            mutation,
            child_noise: ChildNoise::Overwritten,
        }
    }
}

/// Ranks population members by fitness, best first.
///
/// Returns `(fitness, index)` pairs in descending fitness order;
/// members with equal fitness keep ascending index order.
///
/// # Examples
/// ```
/// use popevo::rank;
///
/// let ranking = rank(&[1.0, 4.0, 2.0, 4.0]);
/// assert_eq!(ranking, vec![(4.0, 1), (4.0, 3), (2.0, 2), (1.0, 0)]);
/// ```
pub fn rank(fitness: &[f32]) -> Vec<(f32, usize)> {
    let mut ranking: Vec<(f32, usize)> = fitness.iter().copied().zip(0..).collect();
    // Stable, so ties stay in index order. Adding zero folds -0.0
    // into 0.0, which total_cmp would otherwise rank lower.
    ranking.sort_by(|a, b| (b.0 + 0.0).total_cmp(&(a.0 + 0.0)));
    ranking
}

/// Returns the indices of the `n` fittest members, best first.
///
/// # Examples
/// ```
/// use popevo::top_n;
///
/// assert_eq!(top_n(&[0.3, -1.0, 0.9, 0.3], 3), vec![2, 0, 3]);
/// ```
pub fn top_n(fitness: &[f32], n: usize) -> Vec<usize> {
    rank(fitness).into_iter().take(n).map(|(_, i)| i).collect()
}

/// Combines two parent tensors elementwise: the child takes
/// `parent1`'s value where `mask` is `true`, `parent2`'s elsewhere.
///
/// # Errors
/// Returns [`NetworkError::ShapeMismatch`] if the shapes differ.
///
/// # Examples
/// ```
/// use ndarray::array;
/// use popevo::crossover;
///
/// let p1 = array![[1.0, 1.0], [1.0, 1.0]];
/// let p2 = array![[2.0, 2.0], [2.0, 2.0]];
/// let mask = array![[true, false], [false, false]];
/// let child = crossover(p1.view(), p2.view(), mask.view()).unwrap();
/// assert_eq!(child, array![[1.0, 2.0], [2.0, 2.0]]);
/// ```
pub fn crossover<D: Dimension>(
    parent1: ArrayView<'_, f32, D>,
    parent2: ArrayView<'_, f32, D>,
    mask: ArrayView<'_, bool, D>,
) -> Result<Array<f32, D>> {
    tensor::select(mask, parent1, parent2)
}

impl PopulationNetwork {
    /// Replaces the population with its next generation.
    ///
    /// The `config.winners` fittest members are copied unchanged into
    /// slots `0..winners`, in ranking order. Every other slot receives
    /// a child of two parents drawn uniformly from the winners, each
    /// weight and bias inherited from one parent or the other with
    /// equal chance. Before any of this, every slot is filled with
    /// noise drawn from `config.mutation`; see [`ChildNoise`] for
    /// how children treat it.
    ///
    /// Random draws happen in a fixed order, so a seeded context
    /// reproduces a generation exactly.
    ///
    /// # Errors
    /// Returns [`NetworkError::EmptyNetwork`] for a network without
    /// layers, [`NetworkError::InvalidWinnerCount`] unless
    /// `0 < winners <= P`, [`NetworkError::ShapeMismatch`] if
    /// `fitness` doesn't have one value per member, and
    /// [`NetworkError::InvalidFitness`] if a fitness is NaN.
    /// The network is left untouched on error.
    ///
    /// # Examples
    /// ```
    /// use popevo::{Activation, BreedConfig, ExecutionContext, Interval, PopulationNetwork};
    /// use ndarray::Axis;
    /// use std::num::NonZeroUsize;
    ///
    /// let mut ctx = ExecutionContext::seeded(0);
    /// let mut network = PopulationNetwork::random(
    ///     &[2, 3, 1],
    ///     &[Activation::Tanh, Activation::Tanh],
    ///     NonZeroUsize::new(4).unwrap(),
    ///     &Interval::uniform(-1.0, 1.0),
    ///     &mut ctx,
    /// ).unwrap();
    /// let best = network.member(1).unwrap();
    ///
    /// let config = BreedConfig::new(2, Interval::uniform(-0.05, 0.05));
    /// network.breed(&[1.0, 4.0, 2.0, 3.0], &config, &mut ctx).unwrap();
    ///
    /// // The fittest member now lives in slot 0.
    /// assert_eq!(network.member(0).unwrap().layers, best.layers);
    /// ```
    pub fn breed(
        &mut self,
        fitness: &[f32],
        config: &BreedConfig,
        context: &mut ExecutionContext,
    ) -> Result<()> {
        if self.layers.is_empty() {
            return Err(NetworkError::EmptyNetwork);
        }
        let population = self.population_size;
        if config.winners == 0 || config.winners > population {
            return Err(NetworkError::InvalidWinnerCount {
                winners: config.winners,
                population,
            });
        }
        if fitness.len() != population {
            return Err(NetworkError::ShapeMismatch {
                context: "fitness vector length",
                expected: population,
                found: fitness.len(),
            });
        }
        if let Some(index) = fitness.iter().position(|f| f.is_nan()) {
            return Err(NetworkError::InvalidFitness { index });
        }

        let ranking = rank(fitness);
        let winners: Vec<usize> = ranking[..config.winners].iter().map(|(_, i)| *i).collect();
        let offspring = Breeder::new(&self.layers, &winners, population, config).generate(context)?;

        debug!(
            population,
            winners = config.winners,
            best_fitness = ranking[0].0,
            best_member = ranking[0].1,
            "bred new generation"
        );
        self.layers = offspring;
        Ok(())
    }
}

/// Auxiliary type for breeding. Reads the current generation
/// and builds the next one in fresh tensors.
struct Breeder<'a> {
    parents: &'a [Layer],
    winners: &'a [usize],
    population: usize,
    config: &'a BreedConfig,
}

impl<'a> Breeder<'a> {
    fn new(
        parents: &'a [Layer],
        winners: &'a [usize],
        population: usize,
        config: &'a BreedConfig,
    ) -> Breeder<'a> {
        Breeder {
            parents,
            winners,
            population,
            config,
        }
    }

    /// Builds every layer of the next generation.
    fn generate(&self, context: &mut ExecutionContext) -> Result<Vec<Layer>> {
        let mut offspring = self.baseline_noise(context);
        self.copy_winners(&mut offspring);
        let pairs = self.choose_pairs(context);
        self.add_children(&mut offspring, &pairs, context)?;
        Ok(offspring)
    }

    /// Fills every slot of every layer with mutation noise.
    fn baseline_noise(&self, context: &mut ExecutionContext) -> Vec<Layer> {
        self.parents
            .iter()
            .map(|layer| Layer {
                weights: context.sample(layer.weights.raw_dim(), &self.config.mutation),
                biases: context.sample(layer.biases.raw_dim(), &self.config.mutation),
                activation: layer.activation,
            })
            .collect()
    }

    /// Copies the winners, in ranking order, into the leading slots.
    fn copy_winners(&self, offspring: &mut [Layer]) {
        for (slot, &winner) in self.winners.iter().enumerate() {
            for (child, parent) in offspring.iter_mut().zip(self.parents) {
                child
                    .weights
                    .index_axis_mut(Axis(2), slot)
                    .assign(&parent.weights.index_axis(Axis(2), winner));
                child
                    .biases
                    .index_axis_mut(Axis(2), slot)
                    .assign(&parent.biases.index_axis(Axis(2), winner));
            }
        }
    }

    /// Draws two parents from the winners for each remaining slot.
    fn choose_pairs(&self, context: &mut ExecutionContext) -> Vec<(usize, usize)> {
        (self.winners.len()..self.population)
            .map(|_| {
                let first = self.winners[context.pick(self.winners.len())];
                let second = self.winners[context.pick(self.winners.len())];
                (first, second)
            })
            .collect()
    }

    /// Writes one crossover child per pair, layer by layer.
    fn add_children(
        &self,
        offspring: &mut [Layer],
        pairs: &[(usize, usize)],
        context: &mut ExecutionContext,
    ) -> Result<()> {
        let first_child_slot = self.winners.len();
        for (child, parent) in offspring.iter_mut().zip(self.parents) {
            let (rows, columns, _) = parent.weights.dim();
            for (k, &(p1, p2)) in pairs.iter().enumerate() {
                let slot = first_child_slot + k;
                let weight_mask = context.coin_mask((rows, columns));
                let bias_mask = context.coin_mask((rows, 1));

                let weights = crossover(
                    parent.weights.index_axis(Axis(2), p1),
                    parent.weights.index_axis(Axis(2), p2),
                    weight_mask.view(),
                )?;
                let biases = crossover(
                    parent.biases.index_axis(Axis(2), p1),
                    parent.biases.index_axis(Axis(2), p2),
                    bias_mask.view(),
                )?;

                self.place(child.weights.index_axis_mut(Axis(2), slot), &weights);
                self.place(child.biases.index_axis_mut(Axis(2), slot), &biases);
            }
        }
        Ok(())
    }

    fn place(&self, mut slot: ArrayViewMut2<'_, f32>, child: &ndarray::Array2<f32>) {
        match self.config.child_noise {
            ChildNoise::Overwritten => slot.assign(child),
            ChildNoise::Additive => slot += child,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Activation;
    use ndarray::{array, Array2};
    use std::num::NonZeroUsize;

    fn network(members: usize, seed: u64) -> (PopulationNetwork, ExecutionContext) {
        let mut ctx = ExecutionContext::seeded(seed);
        let network = PopulationNetwork::random(
            &[2, 3, 1],
            &[Activation::Tanh, Activation::Tanh],
            NonZeroUsize::new(members).unwrap(),
            &Interval::uniform(-1.0, 1.0),
            &mut ctx,
        )
        .unwrap();
        (network, ctx)
    }

    fn slot(network: &PopulationNetwork, index: usize) -> Vec<(Array2<f32>, Array2<f32>)> {
        network.member(index).unwrap().layers
    }

    #[test]
    fn ranking_is_stable_and_descending() {
        let ranking = rank(&[2.0, 5.0, 2.0, -1.0, 5.0, 2.0]);
        let order: Vec<usize> = ranking.iter().map(|(_, i)| *i).collect();
        assert_eq!(order, vec![1, 4, 0, 2, 5, 3]);
        assert!(ranking.windows(2).all(|w| w[0].0 >= w[1].0));
    }

    #[test]
    fn signed_zeros_tie() {
        assert_eq!(top_n(&[-0.0, 0.0], 2), vec![0, 1]);
        assert_eq!(top_n(&[0.0, -0.0, 1.0], 3), vec![2, 0, 1]);
    }

    #[test]
    fn signed_zero_winners_follow_index_order() {
        let (mut network, mut ctx) = network(4, 13);
        let before = network.clone();
        let config = BreedConfig::new(2, Interval::uniform(-0.1, 0.1));
        network
            .breed(&[-1.0, -0.0, -2.0, 0.0], &config, &mut ctx)
            .unwrap();
        assert_eq!(slot(&network, 0), slot(&before, 1));
        assert_eq!(slot(&network, 1), slot(&before, 3));
    }

    #[test]
    fn ranking_orders_infinities() {
        assert_eq!(
            top_n(&[0.0, f32::NEG_INFINITY, f32::INFINITY], 3),
            vec![2, 0, 1]
        );
    }

    #[test]
    fn crossover_follows_mask() {
        let p1 = Array2::from_elem((3, 4), 1.0);
        let p2 = Array2::from_elem((3, 4), -1.0);
        let mut ctx = ExecutionContext::seeded(8);
        let mask: Array2<bool> = ctx.coin_mask((3, 4));
        let child = crossover(p1.view(), p2.view(), mask.view()).unwrap();
        for ((r, c), value) in child.indexed_iter() {
            if mask[[r, c]] {
                assert_eq!(*value, p1[[r, c]]);
            } else {
                assert_eq!(*value, p2[[r, c]]);
            }
        }
        assert!(crossover(p1.view(), p2.view(), array![[true]].view()).is_err());
    }

    #[test]
    fn scenario_winners_take_leading_slots() {
        let (mut network, mut ctx) = network(4, 17);
        let before = network.clone();
        let config = BreedConfig::new(2, Interval::uniform(-0.05, 0.05));
        network.breed(&[1.0, 4.0, 2.0, 3.0], &config, &mut ctx).unwrap();

        assert_eq!(slot(&network, 0), slot(&before, 1));
        assert_eq!(slot(&network, 1), slot(&before, 3));
        assert_eq!(network.population_size(), 4);
        assert_eq!(network.topology(), before.topology());
    }

    #[test]
    fn winners_match_ranking_for_any_seed() {
        let fitness = [0.5, -2.0, 0.5, 3.0, 1.0, 3.0, -0.1, 0.0];
        let ranked = top_n(&fitness, 5);
        assert_eq!(ranked, vec![3, 5, 4, 0, 2]);
        for seed in 0..10 {
            let (mut network, mut ctx) = network(8, seed);
            let before = network.clone();
            network
                .breed(&fitness, &BreedConfig::new(5, Interval::normal(-0.3, 0.3)), &mut ctx)
                .unwrap();
            for (slot_index, original) in ranked.iter().enumerate() {
                assert_eq!(slot(&network, slot_index), slot(&before, *original));
            }
        }
    }

    #[test]
    fn all_winners_preserve_population() {
        let (mut network, mut ctx) = network(5, 3);
        let before = network.clone();
        let config = BreedConfig::new(5, Interval::uniform(-1.0, 1.0));
        network
            .breed(&[5.0, 4.0, 3.0, 2.0, 1.0], &config, &mut ctx)
            .unwrap();
        assert_eq!(network, before);

        // Any other ranking permutes the members without altering them.
        let fitness = [0.0, 3.0, 1.0, 4.0, 2.0];
        network.breed(&fitness, &config, &mut ctx).unwrap();
        for (slot_index, original) in top_n(&fitness, 5).into_iter().enumerate() {
            assert_eq!(slot(&network, slot_index), slot(&before, original));
        }
    }

    #[test]
    fn invalid_winner_counts_leave_network_untouched() {
        let (mut network, mut ctx) = network(4, 5);
        let before = network.clone();
        for winners in [0, 5, 100] {
            let config = BreedConfig::new(winners, Interval::uniform(-1.0, 1.0));
            assert!(matches!(
                network.breed(&[1.0, 2.0, 3.0, 4.0], &config, &mut ctx),
                Err(NetworkError::InvalidWinnerCount { population: 4, .. })
            ));
            assert_eq!(network, before);
        }
    }

    #[test]
    fn bad_fitness_is_rejected() {
        let (mut network, mut ctx) = network(4, 5);
        let before = network.clone();
        let config = BreedConfig::new(2, Interval::uniform(-1.0, 1.0));
        assert!(matches!(
            network.breed(&[1.0, 2.0, 3.0], &config, &mut ctx),
            Err(NetworkError::ShapeMismatch { expected: 4, found: 3, .. })
        ));
        assert!(matches!(
            network.breed(&[1.0, f32::NAN, 3.0, 0.0], &config, &mut ctx),
            Err(NetworkError::InvalidFitness { index: 1 })
        ));
        assert_eq!(network, before);
    }

    #[test]
    fn empty_network_cannot_breed() {
        let mut network =
            PopulationNetwork::new(&[2], &[], NonZeroUsize::new(3).unwrap()).unwrap();
        let mut ctx = ExecutionContext::seeded(0);
        assert!(matches!(
            network.breed(&[1.0, 2.0, 3.0], &BreedConfig::new(1, Interval::zero()), &mut ctx),
            Err(NetworkError::EmptyNetwork)
        ));
    }

    #[test]
    fn children_inherit_elementwise_from_winners() {
        let (mut network, mut ctx) = network(6, 21);
        let before = network.clone();
        let config = BreedConfig::new(2, Interval::uniform(10.0, 20.0));
        network
            .breed(&[0.0, 1.0, 5.0, 2.0, 3.0, 4.0], &config, &mut ctx)
            .unwrap();
        let winners = [2, 5];

        // With overwritten noise every child value comes from a winner,
        // never from the (out of range) noise interval.
        for (child, parent) in network.layers().iter().zip(before.layers()) {
            for slot_index in 2..6 {
                let weights = child.weights().index_axis(Axis(2), slot_index);
                for ((r, c), value) in weights.indexed_iter() {
                    assert!(
                        winners
                            .iter()
                            .any(|w| parent.weights()[[r, c, *w]] == *value),
                        "slot {} weight ({}, {}) not inherited",
                        slot_index,
                        r,
                        c
                    );
                }
                let biases = child.biases().index_axis(Axis(2), slot_index);
                for ((r, c), value) in biases.indexed_iter() {
                    assert!(winners
                        .iter()
                        .any(|w| parent.biases()[[r, c, *w]] == *value));
                }
            }
        }
    }

    #[test]
    fn child_noise_modes() {
        // A single winner is both parents of every child.
        let fitness = [3.0, 1.0, 2.0];
        let mutation = Interval::uniform(1.0, 1.0);
        for (mode, offset) in [(ChildNoise::Overwritten, 0.0), (ChildNoise::Additive, 1.0)] {
            let (mut network, mut ctx) = network(3, 2);
            let before = network.clone();
            let config = BreedConfig {
                winners: 1,
                mutation,
                child_noise: mode,
            };
            network.breed(&fitness, &config, &mut ctx).unwrap();

            // The elite is never perturbed.
            assert_eq!(slot(&network, 0), slot(&before, 0));
            for slot_index in 1..3 {
                for ((w, b), (pw, pb)) in slot(&network, slot_index)
                    .into_iter()
                    .zip(slot(&before, 0))
                {
                    assert_eq!(w, pw.mapv(|v| v + offset));
                    assert_eq!(b, pb.mapv(|v| v + offset));
                }
            }
        }
    }

    #[test]
    fn breeding_is_reproducible() {
        let fitness = [0.1, 0.7, 0.3, 0.9, 0.2, 0.4];
        let config = BreedConfig::new(3, Interval::normal(-0.1, 0.1));
        let run = || {
            let (mut network, mut ctx) = network(6, 99);
            network.breed(&fitness, &config, &mut ctx).unwrap();
            network
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn pairs_only_use_winners() {
        let (network, mut ctx) = network(10, 4);
        let winners = [7, 2, 9];
        let config = BreedConfig::new(3, Interval::zero());
        let breeder = Breeder::new(network.layers(), &winners, 10, &config);
        let pairs = breeder.choose_pairs(&mut ctx);
        assert_eq!(pairs.len(), 7);
        assert!(pairs
            .iter()
            .all(|(a, b)| winners.contains(a) && winners.contains(b)));
    }

    #[test]
    fn breed_config_roundtrip() {
        let config = BreedConfig {
            winners: 500,
            mutation: Interval::normal(-0.05, 0.05),
            child_noise: ChildNoise::Additive,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: BreedConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
