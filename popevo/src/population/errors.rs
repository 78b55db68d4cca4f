use crate::NetworkError;

use thiserror::Error;

/// Errors raised while driving a population through generations.
#[derive(Debug, Error)]
pub enum PopulationError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("attempted evolution without evaluating the population")]
    MissingFitness,
    #[error("fitness evaluation failed: {0}")]
    Evaluator(#[source] Box<dyn std::error::Error + Send + Sync>),
}
