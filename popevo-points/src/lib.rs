//! # popevo-points
//! A labelled-point classification task for [`popevo`] populations.
//!
//! Provides a [`LabeledPoints`] fitness evaluator, which scores every
//! member of a population against a set of class-tagged points in one
//! forward pass, and helpers to inspect a single evolved member:
//! - [`classify`]: maps network outputs to class indices.
//! - [`grid_positions`] and [`render_member`]: classify a regular grid
//!   over the unit square, e.g. to draw decision regions.
//!
//! # Example usage: Evolving a two-class classifier
//! ```
//! use popevo::{Activation, BreedConfig, EvolutionConfig, ExecutionContext, Interval, Population};
//! use popevo_points::{grid_positions, render_member, LabeledPoint, LabeledPoints};
//! use std::num::NonZeroUsize;
//!
//! let points = LabeledPoints::new(
//!     vec![
//!         LabeledPoint::new(vec![0.2, 0.8], 0),
//!         LabeledPoint::new(vec![0.1, 0.3], 0),
//!         LabeledPoint::new(vec![0.8, 0.2], 1),
//!         LabeledPoint::new(vec![0.9, 0.6], 1),
//!     ],
//!     2,
//! ).unwrap();
//!
//! let config = EvolutionConfig {
//!     topology: vec![2, 6, 2],
//!     activations: vec![Activation::Tanh, Activation::Sigmoid],
//!     population_size: NonZeroUsize::new(64).unwrap(),
//!     initial: Interval::uniform(-1.0, 1.0),
//!     breeding: BreedConfig::new(16, Interval::normal(-0.05, 0.05)),
//! };
//! let mut ctx = ExecutionContext::seeded(11);
//! let mut population = Population::new(config, &mut ctx).unwrap();
//! for _ in 0..20 {
//!     population.evaluate_fitness(&points, &ctx).unwrap();
//!     population.evolve(&mut ctx).unwrap();
//! }
//! population.evaluate_fitness(&points, &ctx).unwrap();
//!
//! let (champion, _) = population.champion().unwrap();
//! let grid = grid_positions(16);
//! let regions = render_member(population.network(), &ctx, champion, grid.view(), 64).unwrap();
//! assert_eq!(regions.len(), 256);
//! ```
mod errors;
mod grid;
mod points;

pub use errors::PointsError;
pub use grid::{grid_positions, render_member};
pub use points::{classify, one_hot, LabeledPoint, LabeledPoints};
