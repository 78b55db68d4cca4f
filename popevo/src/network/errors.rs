use ndarray::ShapeError;
use thiserror::Error;

/// Errors reported by population network operations.
///
/// A failed operation never modifies the network it was called on.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Two dimensions that must agree do not.
    #[error("shape mismatch in {context}: expected {expected}, found {found}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },
    /// The operation needs at least one layer.
    #[error("the network does not possess any layers")]
    EmptyNetwork,
    /// Breeding was requested with a winner count outside `1..=population`.
    #[error("cannot select {winners} winners from a population of {population}")]
    InvalidWinnerCount { winners: usize, population: usize },
    /// A population member index is out of range.
    #[error("member {index} out of range for a population of {population}")]
    MemberOutOfRange { index: usize, population: usize },
    /// A fitness value cannot be ranked.
    #[error("fitness of member {index} is NaN")]
    InvalidFitness { index: usize },
    /// An internal tensor reshape failed.
    #[error("tensor shape error: {0}")]
    Tensor(#[from] ShapeError),
}
