use ndarray::{ArrayBase, DataMut, Dimension};
use serde::{Deserialize, Serialize};

use std::fmt;

/// Slope of [`LeakyReLU`] for negative inputs.
///
/// [`LeakyReLU`]: Activation::LeakyReLU
pub const LEAKY_RELU_SLOPE: f32 = 0.1;

/// The activation function applied elementwise
/// to the output of a network layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activation {
    Identity,
    ReLU,
    LeakyReLU,
    Sigmoid,
    Tanh,
}

type Scalar = fn(f32) -> f32;

// Indexed by discriminant: (function, derivative).
const TABLE: [(Scalar, Scalar); 5] = [
    (identity, identity_derivative),
    (relu, relu_derivative),
    (leaky_relu, leaky_relu_derivative),
    (sigmoid, sigmoid_derivative),
    (tanh, tanh_derivative),
];

impl Activation {
    /// All available activations.
    pub const ALL: [Activation; 5] = [
        Activation::Identity,
        Activation::ReLU,
        Activation::LeakyReLU,
        Activation::Sigmoid,
        Activation::Tanh,
    ];

    /// Returns the scalar function of this activation.
    ///
    /// # Examples
    /// ```
    /// use popevo::Activation;
    ///
    /// let f = Activation::LeakyReLU.function();
    /// assert_eq!(f(2.0), 2.0);
    /// assert_eq!(f(-2.0), -0.2);
    /// ```
    pub fn function(self) -> fn(f32) -> f32 {
        TABLE[self as usize].0
    }

    /// Returns the derivative of this activation.
    ///
    /// Evolution never needs it; it is provided so that
    /// layers can be inspected with the same tags a
    /// gradient-based trainer would use.
    pub fn derivative_function(self) -> fn(f32) -> f32 {
        TABLE[self as usize].1
    }

    /// Applies the activation to a single value.
    pub fn apply(self, x: f32) -> f32 {
        (self.function())(x)
    }

    /// Evaluates the activation's derivative at `x`.
    pub fn derivative(self, x: f32) -> f32 {
        (self.derivative_function())(x)
    }

    /// Applies the activation to every element of `values`.
    ///
    /// # Examples
    /// ```
    /// use ndarray::array;
    /// use popevo::Activation;
    ///
    /// let mut values = array![[-1.0, 0.5], [2.0, -3.0]];
    /// Activation::ReLU.apply_inplace(&mut values);
    /// assert_eq!(values, array![[0.0, 0.5], [2.0, 0.0]]);
    /// ```
    pub fn apply_inplace<S, D>(self, values: &mut ArrayBase<S, D>)
    where
        S: DataMut<Elem = f32>,
        D: Dimension,
    {
        values.mapv_inplace(self.function());
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self as &dyn fmt::Debug).fmt(f)
    }
}

fn identity(x: f32) -> f32 {
    x
}

fn identity_derivative(_: f32) -> f32 {
    1.0
}

fn relu(x: f32) -> f32 {
    x.max(0.0)
}

fn relu_derivative(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else {
        0.0
    }
}

fn leaky_relu(x: f32) -> f32 {
    if x > 0.0 {
        x
    } else {
        LEAKY_RELU_SLOPE * x
    }
}

fn leaky_relu_derivative(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else {
        LEAKY_RELU_SLOPE
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn sigmoid_derivative(x: f32) -> f32 {
    let s = sigmoid(x);
    s * (1.0 - s)
}

fn tanh(x: f32) -> f32 {
    x.tanh()
}

fn tanh_derivative(x: f32) -> f32 {
    1.0 - x.tanh().powi(2)
}
