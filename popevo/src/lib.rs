//! Population-parallel neuroevolution of fixed-topology
//! feed-forward neural networks.
//!
//! A [`PopulationNetwork`] stores `P` independent networks of the
//! same topology in stacked tensors, so a whole population is
//! evaluated with one call to [`feed_forward`]. Networks learn
//! purely by selection: [`breed`] keeps the fittest members,
//! refills the rest with uniform crossover children, and injects
//! mutation noise. No gradients are ever computed.
//!
//! All randomness and parallel dispatch go through an explicit
//! [`ExecutionContext`]; a seeded context makes a run reproducible.
//! Generational bookkeeping is provided by [`Population`] and the
//! [`logging`] module.
//!
//! [`feed_forward`]: PopulationNetwork::feed_forward
//! [`breed`]: PopulationNetwork::breed
//!
//! # Example usage: Evolution of an XOR approximator
//! ```
//! use popevo::{
//!     Activation, BreedConfig, EvolutionConfig, ExecutionContext, Interval, NetworkError,
//!     Population, PopulationNetwork,
//! };
//! use ndarray::{array, Axis};
//! use std::num::NonZeroUsize;
//!
//! // Allowed error margin for network answers.
//! const ERROR_MARGIN: f32 = 0.3;
//!
//! fn evaluate_xor(
//!     ctx: &ExecutionContext,
//!     network: &PopulationNetwork,
//! ) -> Result<Vec<f32>, NetworkError> {
//!     let inputs = array![[0.0, 0.0, 1.0, 1.0], [0.0, 1.0, 0.0, 1.0]];
//!     let targets: [f32; 4] = [0.0, 1.0, 1.0, 0.0];
//!     let population = network.population_size();
//!
//!     // [2, 1, P, 4]: every member sees all four cases.
//!     let batch = inputs
//!         .insert_axis(Axis(1))
//!         .insert_axis(Axis(2))
//!         .broadcast((2, 1, population, 4))
//!         .unwrap()
//!         .to_owned();
//!     let outputs = network.feed_forward(ctx, batch.view())?;
//!
//!     Ok((0..population)
//!         .map(|p| {
//!             let errors: f32 = targets
//!                 .iter()
//!                 .enumerate()
//!                 .map(|(b, t)| (outputs[[0, 0, p, b]] - t).abs())
//!                 .filter(|e| *e >= ERROR_MARGIN)
//!                 .sum();
//!             (4.0 - errors).powf(2.0)
//!         })
//!         .collect())
//! }
//!
//! fn main() {
//!     let config = EvolutionConfig {
//!         topology: vec![2, 4, 1],
//!         activations: vec![Activation::Tanh, Activation::Sigmoid],
//!         population_size: NonZeroUsize::new(150).unwrap(),
//!         initial: Interval::uniform(-2.0, 2.0),
//!         breeding: BreedConfig::new(30, Interval::normal(-0.1, 0.1)),
//!     };
//!
//!     let mut ctx = ExecutionContext::seeded(42);
//!     let mut population = Population::new(config, &mut ctx).unwrap();
//!     for _ in 0..100 {
//!         population.evaluate_fitness(&evaluate_xor, &ctx).unwrap();
//!         if let Some((index, fitness)) = population.champion() {
//!             if (fitness - 16.0).abs() < f32::EPSILON {
//!                 println!("Solution found!: {:?}", population.network().member(index));
//!                 break;
//!             }
//!         }
//!         if let Err(e) = population.evolve(&mut ctx) {
//!             eprintln!("{}", e);
//!             break;
//!         }
//!     }
//! }
//! ```
mod activation;
mod evaluator;
mod network;
mod population;
pub mod tensor;

pub use activation::{Activation, LEAKY_RELU_SLOPE};
pub use evaluator::FitnessEvaluator;
pub use network::{
    crossover, rank, top_n, BreedConfig, ByteSize, ChildNoise, Layer, Member, NetworkError,
    PopulationNetwork,
};
pub use population::{logging, EvolutionConfig, Population, PopulationError};
pub use tensor::{BackendConfig, ExecutionContext, Interval, Sampling};
