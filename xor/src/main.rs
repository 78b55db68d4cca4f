use popevo::logging::{EvolutionLogger, ReportingLevel, Stats};
use popevo::{
    Activation, BackendConfig, BreedConfig, EvolutionConfig, ExecutionContext, Interval,
    NetworkError, Population, PopulationError, PopulationNetwork,
};
use popevo_points::{render_member, LabeledPoint, LabeledPoints};

use ndarray::{array, Array4, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use std::error::Error;
use std::num::NonZeroUsize;

const ERROR_MARGIN: f32 = 0.3;
const SOLVED: f32 = 16.0;

/// Settings of a benchmark run, read from a RON file.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct RunConfig {
    evolution: EvolutionConfig,
    backend: BackendConfig,
    generations: usize,
    runs: usize,
}

impl Default for RunConfig {
    fn default() -> RunConfig {
        RunConfig {
            evolution: EvolutionConfig {
                topology: vec![2, 4, 1],
                activations: vec![Activation::Tanh, Activation::Sigmoid],
                population_size: NonZeroUsize::new(150).unwrap(),
                initial: Interval::uniform(-2.0, 2.0),
                breeding: BreedConfig::new(30, Interval::normal(-0.1, 0.1)),
            },
            backend: BackendConfig {
                seed: Some(0),
                parallel: false,
            },
            generations: 100,
            runs: 200,
        }
    }
}

fn evaluate_xor(
    ctx: &ExecutionContext,
    network: &PopulationNetwork,
) -> Result<Vec<f32>, NetworkError> {
    let cases = array![[0.0, 0.0, 1.0, 1.0], [0.0, 1.0, 0.0, 1.0]];
    let targets: [f32; 4] = [0.0, 1.0, 1.0, 0.0];
    let population = network.population_size();

    let mut input = Array4::<f32>::zeros((2, 1, population, 4));
    input.assign(&cases.insert_axis(Axis(1)).insert_axis(Axis(2)));
    let outputs = network.feed_forward(ctx, input.view())?;

    Ok(outputs
        .index_axis(Axis(0), 0)
        .index_axis(Axis(0), 0)
        .outer_iter()
        .map(|answers| {
            let mut errors = [0.0, 0.0, 0.0, 0.0];
            for (i, (answer, target)) in answers.iter().zip(&targets).enumerate() {
                errors[i] = (answer - target).abs();
                if errors[i] < ERROR_MARGIN {
                    errors[i] = 0.0;
                }
            }
            (4.0 - errors.iter().copied().sum::<f32>()).powf(2.0)
        })
        .collect())
}

fn solved(population: &Population) -> bool {
    population
        .champion()
        .map_or(false, |(_, fitness)| (fitness - SOLVED).abs() < f32::EPSILON)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .compact()
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ron::from_str(&std::fs::read_to_string(path)?)?,
        None => RunConfig::default(),
    };
    info!(?config, "starting xor benchmark");

    stress_test(&config)?;
    points_demo(&config.backend)?;
    Ok(())
}

/// Evolves XOR solvers from many seeds at once and reports
/// how many generations the successful runs needed.
fn stress_test(config: &RunConfig) -> Result<(), PopulationError> {
    let base_seed = config.backend.seed.unwrap_or(0);
    let generations = (0..config.runs)
        .into_par_iter()
        .map(|run| -> Result<Option<usize>, PopulationError> {
            let mut ctx = ExecutionContext::seeded(base_seed.wrapping_add(run as u64))
                .with_parallelism(config.backend.parallel);
            let mut population = Population::new(config.evolution.clone(), &mut ctx)?;
            for _ in 0..config.generations {
                population.evaluate_fitness(&evaluate_xor, &ctx)?;
                if solved(&population) {
                    return Ok(Some(population.generation()));
                }
                population.evolve(&mut ctx)?;
            }
            population.evaluate_fitness(&evaluate_xor, &ctx)?;
            Ok(solved(&population).then(|| population.generation()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let successes: Vec<f32> = generations.iter().flatten().map(|g| *g as f32).collect();
    let failure_rate =
        generations.iter().filter(|g| g.is_none()).count() as f32 * 100.0 / config.runs as f32;
    if successes.is_empty() {
        warn!(runs = config.runs, "no run solved xor");
    } else {
        println!(
            "Successful run generation count {:?}, {}% failure rate over {} iterations",
            Stats::from(successes.into_iter()),
            failure_rate,
            config.runs
        );
    }
    Ok(())
}

/// Evolves a classifier for a small two-class point set,
/// logging the champion of every generation.
fn points_demo(backend: &BackendConfig) -> Result<(), Box<dyn Error>> {
    let points = LabeledPoints::new(
        vec![
            LabeledPoint::new(vec![0.1, 0.1], 0),
            LabeledPoint::new(vec![0.9, 0.9], 0),
            LabeledPoint::new(vec![0.2, 0.8], 1),
            LabeledPoint::new(vec![0.8, 0.2], 1),
            LabeledPoint::new(vec![0.3, 0.3], 0),
            LabeledPoint::new(vec![0.7, 0.7], 0),
        ],
        2,
    )?;
    let config = EvolutionConfig {
        topology: vec![2, 8, 2],
        activations: vec![Activation::LeakyReLU, Activation::Sigmoid],
        population_size: NonZeroUsize::new(500).unwrap(),
        initial: Interval::uniform(-1.0, 1.0),
        breeding: BreedConfig::new(50, Interval::normal(-0.05, 0.05)),
    };

    let mut ctx = ExecutionContext::from_config(backend);
    let mut population = Population::new(config, &mut ctx)?;
    let mut logger = EvolutionLogger::new(ReportingLevel::Champion);
    for _ in 0..50 {
        population.evaluate_fitness(&points, &ctx)?;
        logger.log(&population)?;
        population.evolve(&mut ctx)?;
    }
    population.evaluate_fitness(&points, &ctx)?;
    logger.log(&population)?;

    if let Some(log) = logger.iter().last() {
        println!("{}", log);
    }
    if let Some((champion, _)) = population.champion() {
        let predicted = render_member(
            population.network(),
            &ctx,
            champion,
            points.positions().view(),
            points.points().len(),
        )?;
        let correct = predicted
            .iter()
            .zip(points.points())
            .filter(|(class, point)| **class == point.class)
            .count();
        println!(
            "Champion {} classifies {}/{} points correctly",
            champion,
            correct,
            points.points().len()
        );
    }
    Ok(())
}
