use crate::PointsError;
use popevo::{ExecutionContext, FitnessEvaluator, PopulationNetwork};

use ndarray::{Array1, Array2, ArrayView, Axis, Dimension};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// A point in input space, tagged with the class it belongs to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabeledPoint {
    pub position: Vec<f32>,
    pub class: usize,
}

impl LabeledPoint {
    pub fn new(position: Vec<f32>, class: usize) -> LabeledPoint {
        LabeledPoint { position, class }
    }
}

/// A set of labelled points used as a classification task.
///
/// As a [`FitnessEvaluator`], every member is shown every point
/// in a single forward pass, and scores the negated squared error
/// between its outputs and the one-hot encoding of each point's
/// class. A perfect classifier scores `0`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLabeledPoints")]
pub struct LabeledPoints {
    points: Vec<LabeledPoint>,
    classes: usize,
}

/// Unchecked form of [`LabeledPoints`] as it appears in files.
#[derive(Deserialize)]
struct RawLabeledPoints {
    points: Vec<LabeledPoint>,
    classes: usize,
}

impl TryFrom<RawLabeledPoints> for LabeledPoints {
    type Error = PointsError;

    fn try_from(raw: RawLabeledPoints) -> Result<LabeledPoints, PointsError> {
        LabeledPoints::new(raw.points, raw.classes)
    }
}

impl LabeledPoints {
    /// Collects points into a task with `classes` classes.
    ///
    /// # Errors
    /// Returns an error if there are no points, if their
    /// dimensions differ, or if any class is not below `classes`.
    ///
    /// # Examples
    /// ```
    /// use popevo_points::{LabeledPoint, LabeledPoints};
    ///
    /// let points = LabeledPoints::new(
    ///     vec![
    ///         LabeledPoint::new(vec![0.1, 0.2], 0),
    ///         LabeledPoint::new(vec![0.9, 0.7], 1),
    ///     ],
    ///     2,
    /// ).unwrap();
    /// assert_eq!(points.dimension(), 2);
    ///
    /// assert!(LabeledPoints::new(vec![LabeledPoint::new(vec![0.5], 3)], 2).is_err());
    /// ```
    pub fn new(points: Vec<LabeledPoint>, classes: usize) -> Result<LabeledPoints, PointsError> {
        let dimension = points.first().ok_or(PointsError::NoPoints)?.position.len();
        for point in &points {
            if point.position.len() != dimension {
                return Err(PointsError::DimensionMismatch {
                    expected: dimension,
                    found: point.position.len(),
                });
            }
            if point.class >= classes {
                return Err(PointsError::ClassOutOfRange {
                    class: point.class,
                    classes,
                });
            }
        }
        Ok(LabeledPoints { points, classes })
    }

    pub fn points(&self) -> &[LabeledPoint] {
        &self.points
    }

    pub fn classes(&self) -> usize {
        self.classes
    }

    /// Width of each point's position.
    pub fn dimension(&self) -> usize {
        self.points.first().map_or(0, |p| p.position.len())
    }

    /// Point positions as columns, `[dimension, points]`.
    pub fn positions(&self) -> Array2<f32> {
        Array2::from_shape_fn((self.dimension(), self.points.len()), |(d, b)| {
            self.points[b].position[d]
        })
    }

    /// One-hot class encodings as columns, `[classes, points]`.
    pub fn targets(&self) -> Array2<f32> {
        Array2::from_shape_fn((self.classes, self.points.len()), |(c, b)| {
            if self.points[b].class == c {
                1.0
            } else {
                0.0
            }
        })
    }

    fn check_network(&self, network: &PopulationNetwork) -> Result<(), PointsError> {
        let topology = network.topology();
        let (inputs, outputs) = (topology[0], topology[topology.len() - 1]);
        if inputs != self.dimension() {
            return Err(PointsError::DimensionMismatch {
                expected: inputs,
                found: self.dimension(),
            });
        }
        if outputs != self.classes {
            return Err(PointsError::ClassCountMismatch {
                expected: self.classes,
                found: outputs,
            });
        }
        Ok(())
    }
}

impl FitnessEvaluator for LabeledPoints {
    type Error = PointsError;

    fn evaluate(
        &self,
        context: &ExecutionContext,
        network: &PopulationNetwork,
    ) -> Result<Vec<f32>, PointsError> {
        self.check_network(network)?;
        let population = network.population_size();
        let count = self.points.len();
        let positions = self.positions();

        // Every member sees the same points: [n0, 1, P, B].
        let input = positions
            .view()
            .insert_axis(Axis(1))
            .insert_axis(Axis(2))
            .broadcast((self.dimension(), 1, population, count))
            .ok_or(PointsError::DimensionMismatch {
                expected: self.dimension(),
                found: positions.nrows(),
            })?
            .to_owned();
        trace!(population, points = count, "evaluating labelled points");
        let output = network.feed_forward(context, input.view())?;

        let targets = self.targets();
        Ok(output
            .index_axis(Axis(1), 0)
            .axis_iter(Axis(1))
            .map(|member| {
                let error: f32 = member
                    .iter()
                    .zip(targets.iter())
                    .map(|(y, t)| (y - t).powi(2))
                    .sum();
                -error
            })
            .collect())
    }
}

/// Returns the one-hot encoding of `class` among `classes`.
///
/// # Errors
/// Returns [`PointsError::ClassOutOfRange`] unless `class < classes`.
///
/// # Examples
/// ```
/// use ndarray::array;
/// use popevo_points::one_hot;
///
/// assert_eq!(one_hot(2, 4).unwrap(), array![0.0, 0.0, 1.0, 0.0]);
/// assert!(one_hot(4, 4).is_err());
/// ```
pub fn one_hot(class: usize, classes: usize) -> Result<Array1<f32>, PointsError> {
    if class >= classes {
        return Err(PointsError::ClassOutOfRange { class, classes });
    }
    let mut encoding = Array1::zeros(classes);
    encoding[class] = 1.0;
    Ok(encoding)
}

/// Maps network outputs to class indices: the argmax along the
/// leading (output) axis, one class per lane, in row-major order
/// over the remaining axes. The first maximum wins ties.
///
/// # Examples
/// ```
/// use ndarray::array;
/// use popevo_points::classify;
///
/// // Three classes, two samples: [classes, 1, samples].
/// let outputs = array![[[0.1, 0.8]], [[0.7, 0.8]], [[0.2, 0.1]]];
/// assert_eq!(classify(outputs.view()), vec![1, 0]);
/// ```
pub fn classify<D: Dimension>(outputs: ArrayView<'_, f32, D>) -> Vec<usize> {
    outputs
        .lanes(Axis(0))
        .into_iter()
        .map(|lane| {
            let mut best = 0;
            for (class, value) in lane.iter().enumerate() {
                if *value > lane[best] {
                    best = class;
                }
            }
            best
        })
        .collect()
}
