use crate::{classify, PointsError};
use popevo::{ExecutionContext, PopulationNetwork};

use ndarray::{Array2, ArrayView2, Axis};
use tracing::debug;

/// Returns the positions of a `size` by `size` grid spanning
/// the unit square, as columns of a `[2, size²]` array.
///
/// Points are laid out row-major: point `row * size + column`
/// sits at `(column / (size - 1), row / (size - 1))`. A grid of
/// size 1 holds the single point `(0, 0)`.
///
/// # Examples
/// ```
/// use ndarray::array;
/// use popevo_points::grid_positions;
///
/// assert_eq!(
///     grid_positions(2),
///     array![[0.0, 1.0, 0.0, 1.0], [0.0, 0.0, 1.0, 1.0]],
/// );
/// ```
pub fn grid_positions(size: usize) -> Array2<f32> {
    let scale = if size > 1 { (size - 1) as f32 } else { 1.0 };
    Array2::from_shape_fn((2, size * size), |(axis, point)| {
        let (row, column) = (point / size, point % size);
        let coordinate = if axis == 0 { column } else { row };
        coordinate as f32 / scale
    })
}

/// Classifies every column of `grid` with a single member,
/// evaluating `batch` positions per forward pass.
///
/// # Errors
/// Returns [`PointsError::InvalidBatchSize`] for a zero batch,
/// and propagates network errors for an invalid member or a grid
/// that doesn't match the network's input width.
///
/// # Examples
/// ```
/// use popevo::{Activation, ExecutionContext, Interval, PopulationNetwork};
/// use popevo_points::{grid_positions, render_member};
/// use std::num::NonZeroUsize;
///
/// let mut ctx = ExecutionContext::seeded(3);
/// let network = PopulationNetwork::random(
///     &[2, 8, 3],
///     &[Activation::ReLU, Activation::Sigmoid],
///     NonZeroUsize::new(16).unwrap(),
///     &Interval::uniform(-1.0, 1.0),
///     &mut ctx,
/// ).unwrap();
///
/// let grid = grid_positions(10);
/// let classes = render_member(&network, &ctx, 5, grid.view(), 32).unwrap();
/// assert_eq!(classes.len(), 100);
/// assert!(classes.iter().all(|c| *c < 3));
/// ```
pub fn render_member(
    network: &PopulationNetwork,
    context: &ExecutionContext,
    member: usize,
    grid: ArrayView2<'_, f32>,
    batch: usize,
) -> Result<Vec<usize>, PointsError> {
    if batch == 0 {
        return Err(PointsError::InvalidBatchSize);
    }
    let mut classes = Vec::with_capacity(grid.ncols());
    for chunk in grid.axis_chunks_iter(Axis(1), batch) {
        let output = network.feed_forward_single(context, chunk.insert_axis(Axis(1)), member)?;
        classes.extend(classify(output.view()));
    }
    debug!(member, points = classes.len(), "rendered member");
    Ok(classes)
}
