//! Adapter between the population network and `ndarray`.
//!
//! All randomness and all parallel dispatch go through an
//! [`ExecutionContext`], which the caller constructs and passes
//! explicitly. Nothing in this crate reads process-wide state.
use crate::network::NetworkError;
use crate::Activation;

use ndarray::{
    Array, Array2, Array4, ArrayView, ArrayView2, ArrayView4, Axis, Dimension, ShapeBuilder, Zip,
};
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand::distributions::Standard;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Base distribution of a randomly drawn parameter tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sampling {
    /// Uniform samples in `[0, 1)`.
    Uniform,
    /// Standard normal samples.
    Normal,
}

/// An interval used to scale and shift random samples:
/// every value is drawn as `sample * (max - min) + min`.
///
/// # Note
/// With [`Sampling::Normal`] the interval is only a scale
/// and an offset. Values are not clipped to `[min, max]`,
/// and a sizeable fraction of them falls outside it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
    pub sampling: Sampling,
}

impl Interval {
    pub const fn new(min: f32, max: f32, sampling: Sampling) -> Interval {
        Interval { min, max, sampling }
    }

    /// A uniform interval `[min, max)`.
    pub const fn uniform(min: f32, max: f32) -> Interval {
        Interval::new(min, max, Sampling::Uniform)
    }

    /// A standard normal scaled by `max - min` and shifted by `min`.
    pub const fn normal(min: f32, max: f32) -> Interval {
        Interval::new(min, max, Sampling::Normal)
    }

    /// Returns the degenerate uniform interval `[0, 0]`,
    /// which always samples zero.
    pub const fn zero() -> Interval {
        Interval::uniform(0.0, 0.0)
    }

    /// Returns `max - min`.
    pub fn width(&self) -> f32 {
        self.max - self.min
    }
}

/// Configuration of an [`ExecutionContext`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Seed of the context's random number generator.
    /// If `None`, the generator is seeded from system entropy.
    pub seed: Option<u64>,
    /// Whether whole-population operations are spread
    /// over the rayon thread pool.
    pub parallel: bool,
}

impl BackendConfig {
    /// Returns an unseeded, sequential configuration.
    pub const fn zero() -> BackendConfig {
        BackendConfig {
            seed: None,
            parallel: false,
        }
    }
}

/// Execution state shared by every tensor operation of a run:
/// the random number generator and the parallelism switch.
///
/// Contexts are never global; create one at startup and hand
/// it to the operations that need it.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    rng: ChaCha8Rng,
    parallel: bool,
}

impl ExecutionContext {
    /// Returns a parallel context with a deterministic generator.
    ///
    /// # Examples
    /// ```
    /// use popevo::{ExecutionContext, Interval};
    ///
    /// let mut a = ExecutionContext::seeded(7);
    /// let mut b = ExecutionContext::seeded(7);
    /// let interval = Interval::uniform(-1.0, 1.0);
    /// assert_eq!(a.sample((3, 2), &interval), b.sample((3, 2), &interval));
    /// ```
    pub fn seeded(seed: u64) -> ExecutionContext {
        ExecutionContext {
            rng: ChaCha8Rng::seed_from_u64(seed),
            parallel: true,
        }
    }

    /// Returns a parallel context seeded from system entropy.
    pub fn from_entropy() -> ExecutionContext {
        ExecutionContext {
            rng: ChaCha8Rng::from_entropy(),
            parallel: true,
        }
    }

    /// Builds a context from its configuration.
    pub fn from_config(config: &BackendConfig) -> ExecutionContext {
        let context = match config.seed {
            Some(seed) => ExecutionContext::seeded(seed),
            None => ExecutionContext::from_entropy(),
        };
        context.with_parallelism(config.parallel)
    }

    /// Enables or disables parallel dispatch.
    pub fn with_parallelism(mut self, parallel: bool) -> ExecutionContext {
        self.parallel = parallel;
        self
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Direct access to the context's generator.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Draws a tensor of the given shape from `interval`.
    pub fn sample<Sh, D>(&mut self, shape: Sh, interval: &Interval) -> Array<f32, D>
    where
        Sh: ShapeBuilder<Dim = D>,
        D: Dimension,
    {
        let samples: Array<f32, D> = match interval.sampling {
            Sampling::Uniform => Array::random_using(shape, Standard, &mut self.rng),
            Sampling::Normal => Array::random_using(shape, StandardNormal, &mut self.rng),
        };
        let (scale, offset) = (interval.width(), interval.min);
        samples.mapv_into(|s| s * scale + offset)
    }

    /// Draws a boolean tensor whose elements are
    /// independently `true` with probability one half.
    pub fn coin_mask<Sh, D>(&mut self, shape: Sh) -> Array<bool, D>
    where
        Sh: ShapeBuilder<Dim = D>,
        D: Dimension,
    {
        Array::random_using(shape, Standard, &mut self.rng)
    }

    /// Picks an index uniformly from `0..upper`.
    ///
    /// # Panics
    /// Panics if `upper` is zero.
    pub fn pick(&mut self, upper: usize) -> usize {
        self.rng.gen_range(0..upper)
    }
}

/// Elementwise select: takes `on_true` where `mask` is set,
/// `on_false` elsewhere.
///
/// # Errors
/// Returns an error if the three shapes differ.
///
/// # Examples
/// ```
/// use ndarray::array;
/// use popevo::tensor::select;
///
/// let mask = array![[true, false], [false, true]];
/// let a = array![[1.0, 2.0], [3.0, 4.0]];
/// let b = array![[-1.0, -2.0], [-3.0, -4.0]];
/// let c = select(mask.view(), a.view(), b.view()).unwrap();
/// assert_eq!(c, array![[1.0, -2.0], [-3.0, 4.0]]);
/// ```
pub fn select<D: Dimension>(
    mask: ArrayView<'_, bool, D>,
    on_true: ArrayView<'_, f32, D>,
    on_false: ArrayView<'_, f32, D>,
) -> Result<Array<f32, D>, NetworkError> {
    let branches = [
        ("select true branch", on_true.shape()),
        ("select false branch", on_false.shape()),
    ];
    for (context, shape) in branches {
        if shape != mask.shape() {
            return Err(NetworkError::ShapeMismatch {
                context,
                expected: mask.len(),
                found: shape.iter().product(),
            });
        }
    }
    Ok(Zip::from(mask)
        .and(on_true)
        .and(on_false)
        .map_collect(|&m, &a, &b| if m { a } else { b }))
}

/// Evaluates one layer for one population member:
/// `activation(weights · inputs + bias)`, with the
/// `[rows, 1]` bias broadcast over the sample columns.
///
/// Both forward passes go through this function, so
/// batched and single-member results agree exactly.
pub(crate) fn affine(
    weights: ArrayView2<'_, f32>,
    bias: ArrayView2<'_, f32>,
    inputs: ArrayView2<'_, f32>,
    activation: Activation,
) -> Array2<f32> {
    let mut output = weights.dot(&inputs);
    output += &bias;
    activation.apply_inplace(&mut output);
    output
}

/// Evaluates one layer across the whole population.
///
/// `weights` is `[rows, cols, P]`, `biases` is `[rows, 1, P]` and
/// `inputs` is `[cols, 1, P, B]`; the result is `[rows, 1, P, B]`.
/// Member `p`'s parameters only ever touch member `p`'s inputs.
/// Shapes are assumed to have been validated by the caller.
pub(crate) fn population_affine(
    context: &ExecutionContext,
    weights: &ndarray::Array3<f32>,
    biases: &ndarray::Array3<f32>,
    inputs: ArrayView4<'_, f32>,
    activation: Activation,
) -> Array4<f32> {
    let (rows, _, members) = weights.dim();
    let samples = inputs.len_of(Axis(3));
    let mut output = Array4::zeros((rows, 1, members, samples));

    let zip = Zip::from(output.axis_iter_mut(Axis(2)))
        .and(inputs.axis_iter(Axis(2)))
        .and(weights.axis_iter(Axis(2)))
        .and(biases.axis_iter(Axis(2)));
    let kernel = move |mut out: ndarray::ArrayViewMut3<'_, f32>,
                       input: ndarray::ArrayView3<'_, f32>,
                       w: ArrayView2<'_, f32>,
                       b: ArrayView2<'_, f32>| {
        let value = affine(w, b, input.index_axis(Axis(1), 0), activation);
        out.index_axis_mut(Axis(1), 0).assign(&value);
    };

    if context.is_parallel() {
        zip.par_for_each(kernel);
    } else {
        zip.for_each(kernel);
    }
    output
}
