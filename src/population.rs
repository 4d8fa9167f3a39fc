//! Population management for the genetic search.

use rand::Rng;

use crate::config::Config;
use crate::individual::Individual;
use crate::problem::Problem;

/// A fixed-size set of candidate solutions for one generation.
pub struct Population {
    pub individuals: Vec<Individual>,
}

impl Population {
    /// Create a population from existing individuals.
    pub fn new(individuals: Vec<Individual>) -> Self {
        Population { individuals }
    }

    /// Initialize the population with `size` random individuals.
    pub fn random<R: Rng>(
        size: usize,
        problem: &Problem,
        config: &Config,
        use_time_windows: bool,
        rng: &mut R,
    ) -> Self {
        let individuals = (0..size)
            .map(|_| Individual::random(problem, config, use_time_windows, rng))
            .collect();
        Population::new(individuals)
    }

    /// Get the population size.
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    /// Check if the population is empty.
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// Best individual by rank. The earliest one wins ties.
    pub fn best(&self) -> Option<&Individual> {
        self.individuals
            .iter()
            .reduce(|best, candidate| if candidate < best { candidate } else { best })
    }

    /// Tournament selection: best of `size` individuals drawn with replacement.
    pub fn tournament<R: Rng>(&self, size: usize, rng: &mut R) -> Option<&Individual> {
        if self.individuals.is_empty() {
            return None;
        }

        let mut best = &self.individuals[rng.gen_range(0..self.individuals.len())];
        for _ in 1..size.max(1) {
            let candidate = &self.individuals[rng.gen_range(0..self.individuals.len())];
            if candidate < best {
                best = candidate;
            }
        }

        Some(best)
    }

    /// Select two parents by tournament.
    pub fn select_parents<R: Rng>(&self, size: usize, rng: &mut R) -> Option<(&Individual, &Individual)> {
        let first = self.tournament(size, rng)?;
        let second = self.tournament(size, rng)?;
        Some((first, second))
    }
}
