use super::{Population, PopulationError};
use crate::{ByteSize, Member, PopulationNetwork};

use std::fmt;

/// Defines different possible reporting levels for logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportingLevel {
    /// Clones the entire population network.
    AllMembers,
    /// Clones only the parameters of the population champion.
    Champion,
    /// Clones no parameters.
    NoMembers,
}

/// A snapshot of a population.
#[derive(Clone, Debug)]
pub struct Log {
    pub generation_number: usize,
    pub generation_sample: GenerationMemberRecord,
    pub population_size: usize,
    pub champion: usize,
    pub fitness: Stats,
    pub byte_footprint: ByteSize,
}

impl fmt::Display for Log {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Log {{\n\
            \tgeneration_number: {:?}\n\
            \tpopulation_size: {:?}\n\
            \tchampion: {:?}\n\
            \tfitness: {:?}\n\
            \tbyte_footprint: {}\n\
            }}",
            &self.generation_number,
            &self.population_size,
            &self.champion,
            &self.fitness,
            &self.byte_footprint,
        )
    }
}

/// A struct for reporting basic statistical data.
#[derive(Clone, Debug, PartialEq)]
pub struct Stats {
    pub maximum: f32,
    pub minimum: f32,
    pub mean: f32,
    pub median: f32,
}

impl Stats {
    /// Returns statistics about numbers in a sequence.
    ///
    /// # Panics
    /// Panics if the sequence is empty.
    ///
    /// # Examples
    /// ```
    /// use popevo::logging::Stats;
    ///
    /// let stats = Stats::from([-2.0, -1.0, 0.5, 1.0, 1.5].iter().copied());
    /// assert_eq!(stats.maximum, 1.5);
    /// assert_eq!(stats.minimum, -2.0);
    /// assert_eq!(stats.mean, 0.0);
    /// assert_eq!(stats.median, 0.5);
    /// ```
    pub fn from(data: impl Iterator<Item = f32>) -> Stats {
        let mut data: Vec<f32> = data.collect();
        assert!(!data.is_empty(), "no statistics for an empty sequence");
        data.sort_by(f32::total_cmp);

        let mid = data.len() / 2;
        let median = if data.len() % 2 == 0 {
            (data[mid - 1] + data[mid]) / 2.0
        } else {
            data[mid]
        };
        Stats {
            maximum: data[data.len() - 1],
            minimum: data[0],
            mean: data.iter().sum::<f32>() / data.len() as f32,
            median,
        }
    }
}

/// A reporting-level dependant store
/// of parameters from a population.
#[derive(Clone, Debug)]
pub enum GenerationMemberRecord {
    /// The whole population network.
    Population(PopulationNetwork),
    /// Only the population champion.
    Champion(Member),
    /// Empty.
    None,
}

/// A log of the evolution of a population over time.
#[derive(Clone, Debug)]
pub struct EvolutionLogger {
    reporting_level: ReportingLevel,
    logs: Vec<Log>,
}

impl EvolutionLogger {
    /// Returns a logger with the appropiate reporting level.
    ///
    /// # Examples
    /// ```
    /// use popevo::logging::{EvolutionLogger, ReportingLevel};
    ///
    /// let logger = EvolutionLogger::new(ReportingLevel::NoMembers);
    /// ```
    pub fn new(reporting_level: ReportingLevel) -> EvolutionLogger {
        EvolutionLogger {
            reporting_level,
            logs: vec![],
        }
    }

    /// Store a snapshot of an evaluated population.
    ///
    /// # Errors
    /// Returns [`PopulationError::MissingFitness`] if the
    /// population's current generation hasn't been evaluated.
    ///
    /// # Examples
    /// ```
    /// use popevo::logging::{EvolutionLogger, ReportingLevel};
    /// use popevo::{Activation, BreedConfig, EvolutionConfig, ExecutionContext, Interval, Population};
    ///
    /// let config = EvolutionConfig {
    ///     topology: vec![1, 1],
    ///     activations: vec![Activation::Identity],
    ///     breeding: BreedConfig::new(1, Interval::zero()),
    ///     ..EvolutionConfig::zero()
    /// };
    /// let mut ctx = ExecutionContext::seeded(0);
    /// let mut population = Population::new(config, &mut ctx).unwrap();
    /// let mut logger = EvolutionLogger::new(ReportingLevel::NoMembers);
    ///
    /// // Unevaluated generations can't be logged.
    /// assert!(logger.log(&population).is_err());
    ///
    /// population.set_fitness(vec![1.0]).unwrap();
    /// logger.log(&population).unwrap();
    /// assert_eq!(logger.iter().count(), 1);
    /// ```
    pub fn log(&mut self, population: &Population) -> Result<(), PopulationError> {
        let fitness = population.fitness().ok_or(PopulationError::MissingFitness)?;
        let (champion, _) = population
            .champion()
            .ok_or(PopulationError::MissingFitness)?;
        let network = population.network();
        self.logs.push(Log {
            generation_number: population.generation(),
            generation_sample: match self.reporting_level {
                ReportingLevel::AllMembers => GenerationMemberRecord::Population(network.clone()),
                ReportingLevel::Champion => {
                    GenerationMemberRecord::Champion(network.member(champion)?)
                }
                ReportingLevel::NoMembers => GenerationMemberRecord::None,
            },
            population_size: network.population_size(),
            champion,
            fitness: Stats::from(fitness.iter().copied()),
            byte_footprint: network.byte_footprint_display(),
        });
        Ok(())
    }

    /// Iterate over all logged snapshots.
    ///
    /// # Examples
    /// ```
    /// use popevo::logging::{EvolutionLogger, ReportingLevel};
    ///
    /// let logger = EvolutionLogger::new(ReportingLevel::AllMembers);
    /// // Log some stuff... then
    /// for log in logger.iter() {
    ///     println!("{}", log);
    /// }
    /// ```
    pub fn iter(&self) -> impl Iterator<Item = &Log> {
        self.logs.iter()
    }
}
