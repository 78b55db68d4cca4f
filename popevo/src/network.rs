//! A `PopulationNetwork` holds `P` independent feed-forward
//! networks that share one topology. Every layer stores the
//! parameters of all members in a single tensor whose trailing
//! axis is the member index, so a forward pass evaluates the
//! whole population at once.
//!
//! Networks are read through shared references by any number
//! of consumers, and only ever modified by [`PopulationNetwork::breed`].
mod breeding;
mod bytes;
mod errors;
mod layer;

pub use breeding::{crossover, rank, top_n, BreedConfig, ChildNoise};
pub use bytes::ByteSize;
pub use errors::NetworkError;
pub use layer::{Layer, Member};

use crate::tensor::{self, ExecutionContext, Interval};
use crate::Activation;

use ndarray::{Array, Array3, ArrayView, Axis, Dimension, Ix3, Ix4};
use tracing::trace;

use std::fmt;
use std::num::NonZeroUsize;

/// Result type of network operations.
pub(crate) type Result<T> = std::result::Result<T, NetworkError>;

/// A population of fixed-topology feed-forward networks.
#[derive(Clone, Debug, PartialEq)]
pub struct PopulationNetwork {
    topology: Vec<usize>,
    layers: Vec<Layer>,
    population_size: usize,
}

impl PopulationNetwork {
    /// Creates a population with all weights and biases set to zero.
    ///
    /// `topology` lists the layer widths, input first; one activation
    /// is needed per layer after the input.
    ///
    /// # Errors
    /// Returns [`NetworkError::ShapeMismatch`] if
    /// `activations.len() != topology.len() - 1`.
    ///
    /// # Examples
    /// ```
    /// use popevo::{Activation, PopulationNetwork};
    /// use std::num::NonZeroUsize;
    ///
    /// let network = PopulationNetwork::new(
    ///     &[2, 5, 1],
    ///     &[Activation::Tanh, Activation::Sigmoid],
    ///     NonZeroUsize::new(100).unwrap(),
    /// ).unwrap();
    /// assert_eq!(network.population_size(), 100);
    /// assert_eq!(network.layer_count(), 2);
    /// assert!(network.layers().iter().all(|l| l.weights().iter().all(|w| *w == 0.0)));
    ///
    /// assert!(PopulationNetwork::new(&[2, 5, 1], &[Activation::Tanh], NonZeroUsize::MIN).is_err());
    /// ```
    pub fn new(
        topology: &[usize],
        activations: &[Activation],
        population_size: NonZeroUsize,
    ) -> Result<PopulationNetwork> {
        Self::build(topology, activations, population_size, |shape| {
            Array3::zeros(shape)
        })
    }

    /// Creates a single zero-valued network.
    pub fn single(topology: &[usize], activations: &[Activation]) -> Result<PopulationNetwork> {
        Self::new(topology, activations, NonZeroUsize::MIN)
    }

    /// Creates a population with every weight and bias drawn
    /// independently from `interval`.
    ///
    /// # Errors
    /// Returns [`NetworkError::ShapeMismatch`] if
    /// `activations.len() != topology.len() - 1`.
    ///
    /// # Examples
    /// ```
    /// use popevo::{Activation, ExecutionContext, Interval, PopulationNetwork};
    /// use std::num::NonZeroUsize;
    ///
    /// let mut ctx = ExecutionContext::seeded(0);
    /// let network = PopulationNetwork::random(
    ///     &[2, 5, 5, 2],
    ///     &[Activation::Tanh; 3],
    ///     NonZeroUsize::new(50).unwrap(),
    ///     &Interval::uniform(-2.8, 2.8),
    ///     &mut ctx,
    /// ).unwrap();
    /// assert!(network
    ///     .layers()
    ///     .iter()
    ///     .flat_map(|l| l.weights().iter().chain(l.biases().iter()))
    ///     .all(|v| (-2.8..2.8).contains(v)));
    /// ```
    pub fn random(
        topology: &[usize],
        activations: &[Activation],
        population_size: NonZeroUsize,
        interval: &Interval,
        context: &mut ExecutionContext,
    ) -> Result<PopulationNetwork> {
        Self::build(topology, activations, population_size, |shape| {
            context.sample(shape, interval)
        })
    }

    /// Assembles a population from existing layers.
    ///
    /// # Errors
    /// Returns an error if there are no layers, if consecutive
    /// layer widths don't chain, or if the layers disagree on
    /// population size.
    pub fn from_layers(layers: Vec<Layer>) -> Result<PopulationNetwork> {
        let first = layers.first().ok_or(NetworkError::EmptyNetwork)?;
        let population_size = first.population_size();
        let mut topology = vec![first.inputs()];
        for layer in &layers {
            let previous = *topology.last().unwrap_or(&0);
            if layer.inputs() != previous {
                return Err(NetworkError::ShapeMismatch {
                    context: "layer input width",
                    expected: previous,
                    found: layer.inputs(),
                });
            }
            if layer.population_size() != population_size {
                return Err(NetworkError::ShapeMismatch {
                    context: "layer population axis",
                    expected: population_size,
                    found: layer.population_size(),
                });
            }
            topology.push(layer.outputs());
        }
        Ok(PopulationNetwork {
            topology,
            layers,
            population_size,
        })
    }

    fn build<F>(
        topology: &[usize],
        activations: &[Activation],
        population_size: NonZeroUsize,
        mut fill: F,
    ) -> Result<PopulationNetwork>
    where
        F: FnMut((usize, usize, usize)) -> Array3<f32>,
    {
        if topology.is_empty() {
            return Err(NetworkError::ShapeMismatch {
                context: "topology length",
                expected: 1,
                found: 0,
            });
        }
        if activations.len() != topology.len() - 1 {
            return Err(NetworkError::ShapeMismatch {
                context: "activation count",
                expected: topology.len() - 1,
                found: activations.len(),
            });
        }

        let population = population_size.get();
        let layers = topology
            .windows(2)
            .zip(activations)
            .map(|(widths, activation)| {
                let (previous, current) = (widths[0], widths[1]);
                Layer {
                    weights: fill((current, previous, population)),
                    biases: fill((current, 1, population)),
                    activation: *activation,
                }
            })
            .collect();

        Ok(PopulationNetwork {
            topology: topology.to_vec(),
            layers,
            population_size: population,
        })
    }

    /// Evaluates every member of the population on its own inputs.
    ///
    /// `input` is `[n0, 1, P]` (one sample per member) or
    /// `[n0, 1, P, B]` (`B` samples per member). The result has the
    /// same rank, with the leading axis replaced by the output width.
    ///
    /// # Errors
    /// Returns [`NetworkError::EmptyNetwork`] if the network has no
    /// layers, and [`NetworkError::ShapeMismatch`] if the input is
    /// not shaped as described above.
    ///
    /// # Examples
    /// ```
    /// use ndarray::Array4;
    /// use popevo::{Activation, ExecutionContext, Interval, PopulationNetwork};
    /// use std::num::NonZeroUsize;
    ///
    /// let mut ctx = ExecutionContext::seeded(1);
    /// let network = PopulationNetwork::random(
    ///     &[2, 3, 1],
    ///     &[Activation::Tanh, Activation::Tanh],
    ///     NonZeroUsize::new(8).unwrap(),
    ///     &Interval::uniform(-1.0, 1.0),
    ///     &mut ctx,
    /// ).unwrap();
    ///
    /// // Four samples for each of the eight members.
    /// let input = Array4::<f32>::ones((2, 1, 8, 4));
    /// let output = network.feed_forward(&ctx, input.view()).unwrap();
    /// assert_eq!(output.shape(), &[1, 1, 8, 4]);
    /// ```
    pub fn feed_forward<D: Dimension>(
        &self,
        context: &ExecutionContext,
        input: ArrayView<'_, f32, D>,
    ) -> Result<Array<f32, D>> {
        if self.layers.is_empty() {
            return Err(NetworkError::EmptyNetwork);
        }
        let rank = input.ndim();
        let batched = match rank {
            3 => input.into_dimensionality::<Ix3>()?.insert_axis(Axis(3)),
            4 => input.into_dimensionality::<Ix4>()?,
            _ => {
                return Err(NetworkError::ShapeMismatch {
                    context: "population input rank",
                    expected: 4,
                    found: rank,
                })
            }
        };
        let (width, columns, members, samples) = batched.dim();
        self.check_input(width, columns)?;
        if members != self.population_size {
            return Err(NetworkError::ShapeMismatch {
                context: "population axis",
                expected: self.population_size,
                found: members,
            });
        }
        trace!(members, samples, "population forward pass");

        let mut layers = self.layers.iter();
        let mut value = match layers.next() {
            Some(first) => tensor::population_affine(
                context,
                &first.weights,
                &first.biases,
                batched,
                first.activation,
            ),
            None => return Err(NetworkError::EmptyNetwork),
        };
        for layer in layers {
            value = tensor::population_affine(
                context,
                &layer.weights,
                &layer.biases,
                value.view(),
                layer.activation,
            );
        }

        let output = if rank == 3 {
            value.index_axis_move(Axis(3), 0).into_dyn()
        } else {
            value.into_dyn()
        };
        Ok(output.into_dimensionality::<D>()?)
    }

    /// Evaluates a batch of samples against a single member.
    ///
    /// `input` is `[n0, 1, B]`; the result is `[nL, 1, B]`. The
    /// values are identical to those the batched pass computes
    /// for the same member.
    ///
    /// # Errors
    /// Returns [`NetworkError::EmptyNetwork`] if the network has no
    /// layers, [`NetworkError::MemberOutOfRange`] for an invalid
    /// `index`, and [`NetworkError::ShapeMismatch`] for a badly
    /// shaped input.
    ///
    /// # Examples
    /// ```
    /// use ndarray::Array3;
    /// use popevo::{Activation, ExecutionContext, Interval, PopulationNetwork};
    /// use std::num::NonZeroUsize;
    ///
    /// let mut ctx = ExecutionContext::seeded(1);
    /// let network = PopulationNetwork::random(
    ///     &[2, 4, 2],
    ///     &[Activation::ReLU, Activation::Sigmoid],
    ///     NonZeroUsize::new(16).unwrap(),
    ///     &Interval::normal(-1.0, 1.0),
    ///     &mut ctx,
    /// ).unwrap();
    ///
    /// let grid = Array3::<f32>::from_elem((2, 1, 100), 0.5);
    /// let surface = network.feed_forward_single(&ctx, grid.view(), 3).unwrap();
    /// assert_eq!(surface.shape(), &[2, 1, 100]);
    /// ```
    pub fn feed_forward_single(
        &self,
        _context: &ExecutionContext,
        input: ArrayView<'_, f32, Ix3>,
        index: usize,
    ) -> Result<Array3<f32>> {
        if self.layers.is_empty() {
            return Err(NetworkError::EmptyNetwork);
        }
        if index >= self.population_size {
            return Err(NetworkError::MemberOutOfRange {
                index,
                population: self.population_size,
            });
        }
        let (width, columns, samples) = input.dim();
        self.check_input(width, columns)?;
        trace!(index, samples, "single member forward pass");

        let mut value = input.index_axis(Axis(1), 0).to_owned();
        for layer in &self.layers {
            let (weights, bias) = layer.member(index);
            value = tensor::affine(weights, bias, value.view(), layer.activation);
        }
        Ok(value.insert_axis(Axis(1)))
    }

    fn check_input(&self, width: usize, columns: usize) -> Result<()> {
        if width != self.topology[0] {
            return Err(NetworkError::ShapeMismatch {
                context: "input width",
                expected: self.topology[0],
                found: width,
            });
        }
        if columns != 1 {
            return Err(NetworkError::ShapeMismatch {
                context: "input column axis",
                expected: 1,
                found: columns,
            });
        }
        Ok(())
    }

    /// Returns the number of networks in the population.
    pub fn population_size(&self) -> usize {
        self.population_size
    }

    /// Returns the number of parameterised layers (excluding the input).
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Returns the layer widths, input first.
    pub fn topology(&self) -> &[usize] {
        &self.topology
    }

    /// Returns the activation of every layer.
    pub fn activations(&self) -> Vec<Activation> {
        self.layers.iter().map(Layer::activation).collect()
    }

    /// Returns the number of bytes held by all weight and bias tensors.
    ///
    /// # Examples
    /// ```
    /// use popevo::{Activation, PopulationNetwork};
    /// use std::num::NonZeroUsize;
    ///
    /// let network = PopulationNetwork::new(
    ///     &[2, 3, 1],
    ///     &[Activation::Tanh, Activation::Tanh],
    ///     NonZeroUsize::new(10).unwrap(),
    /// ).unwrap();
    /// // (2·3 + 3 + 3·1 + 1) parameters per member, 4 bytes each.
    /// assert_eq!(network.byte_footprint(), 13 * 10 * 4);
    /// assert_eq!(network.byte_footprint_display().to_string(), "520 B");
    /// ```
    pub fn byte_footprint(&self) -> usize {
        self.layers.iter().map(Layer::bytes).sum()
    }

    /// Returns the byte footprint in a human-readable form.
    pub fn byte_footprint_display(&self) -> ByteSize {
        ByteSize(self.byte_footprint())
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    /// Copies out the parameters of one member.
    ///
    /// # Errors
    /// Returns [`NetworkError::MemberOutOfRange`] for an invalid `index`.
    pub fn member(&self, index: usize) -> Result<Member> {
        if index >= self.population_size {
            return Err(NetworkError::MemberOutOfRange {
                index,
                population: self.population_size,
            });
        }
        Ok(Member {
            index,
            layers: self
                .layers
                .iter()
                .map(|layer| {
                    let (weights, bias) = layer.member(index);
                    (weights.to_owned(), bias.to_owned())
                })
                .collect(),
        })
    }
}

impl fmt::Display for PopulationNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PopulationNetwork[{:?}, {:?}, P: {}, {}]",
            self.topology,
            self.activations(),
            self.population_size,
            self.byte_footprint_display(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array4, Axis};
    use proptest::prelude::*;

    fn population(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn random_network(
        topology: &[usize],
        activations: &[Activation],
        members: usize,
        seed: u64,
    ) -> PopulationNetwork {
        let mut ctx = ExecutionContext::seeded(seed);
        PopulationNetwork::random(
            topology,
            activations,
            population(members),
            &Interval::uniform(-1.5, 1.5),
            &mut ctx,
        )
        .unwrap()
    }

    #[test]
    fn activation_count_must_match() {
        for (topology, activations) in [
            (vec![2, 3, 1], vec![Activation::Tanh]),
            (vec![2, 3, 1], vec![Activation::Tanh; 3]),
            (vec![2], vec![Activation::Tanh]),
            (vec![], vec![]),
        ] {
            let mut ctx = ExecutionContext::seeded(0);
            assert!(matches!(
                PopulationNetwork::new(&topology, &activations, population(3)),
                Err(NetworkError::ShapeMismatch { .. })
            ));
            assert!(matches!(
                PopulationNetwork::random(
                    &topology,
                    &activations,
                    population(3),
                    &Interval::uniform(-1.0, 1.0),
                    &mut ctx
                ),
                Err(NetworkError::ShapeMismatch { .. })
            ));
        }
    }

    #[test]
    fn layer_shapes_chain() {
        let network = PopulationNetwork::new(
            &[2, 5, 5, 2],
            &[Activation::Tanh; 3],
            population(7),
        )
        .unwrap();
        assert_eq!(network.topology(), &[2, 5, 5, 2]);
        assert_eq!(network.layer_count(), 3);
        let shapes: Vec<_> = network
            .layers()
            .iter()
            .map(|l| (l.weights().dim(), l.biases().dim()))
            .collect();
        assert_eq!(
            shapes,
            vec![
                ((5, 2, 7), (5, 1, 7)),
                ((5, 5, 7), (5, 1, 7)),
                ((2, 5, 7), (2, 1, 7)),
            ]
        );
    }

    #[test]
    fn degenerate_interval_is_all_zero() {
        for seed in 0..5 {
            let mut ctx = ExecutionContext::seeded(seed);
            let network = PopulationNetwork::random(
                &[2, 3, 1],
                &[Activation::Tanh, Activation::Tanh],
                population(6),
                &Interval::uniform(0.0, 0.0),
                &mut ctx,
            )
            .unwrap();
            let zeros = PopulationNetwork::new(
                &[2, 3, 1],
                &[Activation::Tanh, Activation::Tanh],
                population(6),
            )
            .unwrap();
            assert_eq!(network, zeros);
        }
    }

    #[test]
    fn input_only_topology_is_empty() {
        let network = PopulationNetwork::new(&[3], &[], population(2)).unwrap();
        let ctx = ExecutionContext::seeded(0);
        assert_eq!(network.layer_count(), 0);
        assert!(matches!(
            network.feed_forward(&ctx, Array3::<f32>::zeros((3, 1, 2)).view()),
            Err(NetworkError::EmptyNetwork)
        ));
        assert!(matches!(
            network.feed_forward_single(&ctx, Array3::<f32>::zeros((3, 1, 2)).view(), 0),
            Err(NetworkError::EmptyNetwork)
        ));
    }

    #[test]
    fn feed_forward_computes_layers() {
        // One member, 2 -> 1 identity layer followed by a ReLU layer.
        let first = Layer::new(
            Array3::from_shape_vec((1, 2, 1), vec![2.0, -1.0]).unwrap(),
            Array3::from_elem((1, 1, 1), 0.5),
            Activation::Identity,
        )
        .unwrap();
        let second = Layer::new(
            Array3::from_elem((1, 1, 1), -1.0),
            Array3::zeros((1, 1, 1)),
            Activation::ReLU,
        )
        .unwrap();
        let network = PopulationNetwork::from_layers(vec![first, second]).unwrap();
        assert_eq!(network.topology(), &[2, 1, 1]);

        let ctx = ExecutionContext::seeded(0);
        let input = Array4::from_shape_vec((2, 1, 1, 2), vec![1.0, 0.0, 4.0, 1.0]).unwrap();
        let output = network.feed_forward(&ctx, input.view()).unwrap();
        // Sample 0: 2·1 - 4 + 0.5 = -1.5 -> 1.5; sample 1: 0 - 1 + 0.5 = -0.5 -> 0.5.
        assert_eq!(output.into_raw_vec(), vec![1.5, 0.5]);
    }

    #[test]
    fn feed_forward_keeps_rank() {
        let network = random_network(&[2, 4, 3], &[Activation::Tanh, Activation::Sigmoid], 5, 9);
        let ctx = ExecutionContext::seeded(0);
        let single = network
            .feed_forward(&ctx, Array3::<f32>::ones((2, 1, 5)).view())
            .unwrap();
        assert_eq!(single.shape(), &[3, 1, 5]);
        let batch = network
            .feed_forward(&ctx, Array4::<f32>::ones((2, 1, 5, 6)).view())
            .unwrap();
        assert_eq!(batch.shape(), &[3, 1, 5, 6]);
        for sample in batch.axis_iter(Axis(3)) {
            assert_eq!(sample, single);
        }
    }

    #[test]
    fn feed_forward_rejects_bad_inputs() {
        let network = random_network(&[2, 4, 3], &[Activation::Tanh, Activation::Sigmoid], 5, 9);
        let ctx = ExecutionContext::seeded(0);
        let wrong_width = Array3::<f32>::ones((3, 1, 5));
        let wrong_population = Array3::<f32>::ones((2, 1, 4));
        let wrong_columns = Array4::<f32>::ones((2, 2, 5, 1));
        let wrong_rank = ndarray::Array2::<f32>::ones((2, 5));
        for result in [
            network.feed_forward(&ctx, wrong_width.view()).map(|_| ()),
            network.feed_forward(&ctx, wrong_population.view()).map(|_| ()),
            network.feed_forward(&ctx, wrong_columns.view()).map(|_| ()),
            network.feed_forward(&ctx, wrong_rank.view()).map(|_| ()),
        ] {
            assert!(matches!(result, Err(NetworkError::ShapeMismatch { .. })));
        }
        assert!(matches!(
            network.feed_forward_single(&ctx, wrong_width.view(), 0),
            Err(NetworkError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            network.feed_forward_single(&ctx, Array3::<f32>::ones((2, 1, 3)).view(), 5),
            Err(NetworkError::MemberOutOfRange { index: 5, population: 5 })
        ));
    }

    #[test]
    fn sequential_and_parallel_agree() {
        let network = random_network(&[3, 8, 8, 2], &[Activation::LeakyReLU; 3], 32, 4);
        let mut ctx = ExecutionContext::seeded(5);
        let input: Array4<f32> = ctx.sample((3, 1, 32, 10), &Interval::uniform(0.0, 1.0));
        let parallel = network.feed_forward(&ctx, input.view()).unwrap();
        let sequential = network
            .feed_forward(&ctx.clone().with_parallelism(false), input.view())
            .unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn member_copies_slices() {
        let network = random_network(&[2, 3, 1], &[Activation::Tanh, Activation::Tanh], 4, 2);
        let member = network.member(2).unwrap();
        assert_eq!(member.layers.len(), 2);
        assert_eq!(
            member.layers[0].0,
            network.layers()[0].weights().index_axis(Axis(2), 2)
        );
        assert_eq!(
            member.layers[1].1,
            network.layers()[1].biases().index_axis(Axis(2), 2)
        );
        assert!(network.member(4).is_err());
    }

    #[test]
    fn from_layers_rejects_broken_chains() {
        let a = Layer::new(Array3::zeros((3, 2, 4)), Array3::zeros((3, 1, 4)), Activation::Tanh)
            .unwrap();
        let b = Layer::new(Array3::zeros((1, 2, 4)), Array3::zeros((1, 1, 4)), Activation::Tanh)
            .unwrap();
        let c = Layer::new(Array3::zeros((1, 3, 5)), Array3::zeros((1, 1, 5)), Activation::Tanh)
            .unwrap();
        assert!(PopulationNetwork::from_layers(vec![a.clone(), b]).is_err());
        assert!(PopulationNetwork::from_layers(vec![a, c]).is_err());
        assert!(matches!(
            PopulationNetwork::from_layers(vec![]),
            Err(NetworkError::EmptyNetwork)
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn single_member_matches_batched(
            topology in prop::collection::vec(1usize..6, 2..5),
            members in 1usize..6,
            samples in 1usize..8,
            seed in any::<u64>(),
        ) {
            let activations: Vec<Activation> = (0..topology.len() - 1)
                .map(|i| Activation::ALL[(seed as usize).wrapping_add(i) % Activation::ALL.len()])
                .collect();
            let network = random_network(&topology, &activations, members, seed);
            let mut ctx = ExecutionContext::seeded(seed ^ 0x5eed);
            let input: Array3<f32> = ctx.sample((topology[0], 1, samples), &Interval::uniform(-1.0, 1.0));

            for index in 0..members {
                let single = network.feed_forward_single(&ctx, input.view(), index).unwrap();

                // The same samples, fed to every member of the population.
                let broadcast = input
                    .view()
                    .insert_axis(Axis(2))
                    .broadcast((topology[0], 1, members, samples))
                    .unwrap()
                    .to_owned();
                let batched = network.feed_forward(&ctx, broadcast.view()).unwrap();
                let sliced = batched.index_axis(Axis(2), index);
                for (a, b) in single.iter().zip(sliced.iter()) {
                    prop_assert!((a - b).abs() <= 1e-6, "{} vs {}", a, b);
                }

                // And exactly equal against a one-member population holding that member.
                let member = network.member(index).unwrap();
                let layers = member
                    .layers
                    .into_iter()
                    .zip(&activations)
                    .map(|((w, b), activation)| {
                        Layer::new(w.insert_axis(Axis(2)), b.insert_axis(Axis(2)), *activation).unwrap()
                    })
                    .collect();
                let alone = PopulationNetwork::from_layers(layers).unwrap();
                let alone_output = alone
                    .feed_forward(&ctx, input.view().insert_axis(Axis(2)))
                    .unwrap();
                prop_assert_eq!(
                    single.iter().copied().collect::<Vec<_>>(),
                    alone_output.iter().copied().collect::<Vec<_>>()
                );
            }
        }
    }
}
