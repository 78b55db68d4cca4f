use super::{NetworkError, Result};
use crate::Activation;

use ndarray::{Array2, Array3, ArrayView2, Axis};

/// One fully-connected layer of every network in a population.
///
/// The trailing axis of both tensors indexes the population member:
/// weights are `[outputs, inputs, P]`, biases are `[outputs, 1, P]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    pub(crate) weights: Array3<f32>,
    pub(crate) biases: Array3<f32>,
    pub(crate) activation: Activation,
}

impl Layer {
    /// Creates a layer from explicit parameter tensors.
    ///
    /// # Errors
    /// Returns an error if the bias tensor is not
    /// `[outputs, 1, P]` for weights `[outputs, inputs, P]`.
    ///
    /// # Examples
    /// ```
    /// use ndarray::Array3;
    /// use popevo::{Activation, Layer};
    ///
    /// let layer = Layer::new(
    ///     Array3::zeros((3, 2, 10)),
    ///     Array3::zeros((3, 1, 10)),
    ///     Activation::Tanh,
    /// ).unwrap();
    /// assert_eq!((layer.inputs(), layer.outputs(), layer.population_size()), (2, 3, 10));
    ///
    /// assert!(Layer::new(
    ///     Array3::zeros((3, 2, 10)),
    ///     Array3::zeros((3, 1, 9)),
    ///     Activation::Tanh,
    /// ).is_err());
    /// ```
    pub fn new(weights: Array3<f32>, biases: Array3<f32>, activation: Activation) -> Result<Layer> {
        let (outputs, _, population) = weights.dim();
        let checks = [
            ("bias rows", outputs, biases.len_of(Axis(0))),
            ("bias columns", 1, biases.len_of(Axis(1))),
            ("bias population axis", population, biases.len_of(Axis(2))),
        ];
        for (context, expected, found) in checks {
            if expected != found {
                return Err(NetworkError::ShapeMismatch {
                    context,
                    expected,
                    found,
                });
            }
        }
        Ok(Layer {
            weights,
            biases,
            activation,
        })
    }

    /// Weight tensor, `[outputs, inputs, P]`.
    pub fn weights(&self) -> &Array3<f32> {
        &self.weights
    }

    /// Bias tensor, `[outputs, 1, P]`.
    pub fn biases(&self) -> &Array3<f32> {
        &self.biases
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Width of the previous layer.
    pub fn inputs(&self) -> usize {
        self.weights.len_of(Axis(1))
    }

    /// Width of this layer.
    pub fn outputs(&self) -> usize {
        self.weights.len_of(Axis(0))
    }

    pub fn population_size(&self) -> usize {
        self.weights.len_of(Axis(2))
    }

    /// Returns the weight matrix and bias column of one member.
    ///
    /// # Panics
    /// Panics if `index` is not a valid member index.
    pub fn member(&self, index: usize) -> (ArrayView2<'_, f32>, ArrayView2<'_, f32>) {
        (
            self.weights.index_axis(Axis(2), index),
            self.biases.index_axis(Axis(2), index),
        )
    }

    /// Number of bytes held by the layer's parameters.
    pub fn bytes(&self) -> usize {
        (self.weights.len() + self.biases.len()) * std::mem::size_of::<f32>()
    }
}

/// The parameters of a single population member,
/// one `(weights, bias)` pair per layer.
#[derive(Clone, Debug, PartialEq)]
pub struct Member {
    pub index: usize,
    pub layers: Vec<(Array2<f32>, Array2<f32>)>,
}
