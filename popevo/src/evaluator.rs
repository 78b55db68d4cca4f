use crate::{ExecutionContext, NetworkError, PopulationNetwork};

/// An interface for scoring every member of a population at once.
///
/// Evaluators usually build one input tensor, run a single
/// [`feed_forward`] over the whole population, and reduce the
/// outputs to one fitness value per member. Higher is better.
///
/// Any closure `Fn(&ExecutionContext, &PopulationNetwork) -> Result<Vec<f32>, NetworkError>`
/// is an evaluator.
///
/// [`feed_forward`]: PopulationNetwork::feed_forward
pub trait FitnessEvaluator {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns one fitness value per population member.
    fn evaluate(
        &self,
        context: &ExecutionContext,
        network: &PopulationNetwork,
    ) -> Result<Vec<f32>, Self::Error>;
}

impl<F> FitnessEvaluator for F
where
    F: Fn(&ExecutionContext, &PopulationNetwork) -> Result<Vec<f32>, NetworkError>,
{
    type Error = NetworkError;

    fn evaluate(
        &self,
        context: &ExecutionContext,
        network: &PopulationNetwork,
    ) -> Result<Vec<f32>, NetworkError> {
        self(context, network)
    }
}
