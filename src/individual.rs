//! Individual representation for the genetic search population.

use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Ordering;

use crate::config::{Config, Heuristic};
use crate::problem::Problem;
use crate::solution::{Rank, Route, Solution, CAPACITY_EPSILON};

/// One customer sequence per vehicle slot; index `i` is served by slot `i`.
pub type Chromosome = Vec<Vec<usize>>;

/// An individual in the genetic search population.
#[derive(Clone)]
pub struct Individual {
    /// Route genes, aligned with the problem's vehicle slots
    pub chromosome: Chromosome,
    /// The decoded, scheduled solution
    pub solution: Solution,
    /// Cached ordering key
    pub rank: Rank,
}

impl Individual {
    /// Decode a chromosome into scheduled routes.
    pub fn new(chromosome: Chromosome, problem: &Problem, config: &Config, use_time_windows: bool) -> Self {
        let routes = chromosome
            .iter()
            .zip(problem.slots.iter())
            .filter(|(customers, _)| !customers.is_empty())
            .map(|(customers, slot)| {
                Route::for_slot(customers, slot.clone(), problem, config, use_time_windows)
            })
            .collect();

        let solution = Solution::from_routes(Heuristic::Genetic, routes, problem);
        let rank = solution.rank();

        Individual {
            chromosome,
            solution,
            rank,
        }
    }

    /// Shuffle the stops and fill slots first-fit by capacity.
    ///
    /// Stops that fit no slot are left out.
    pub fn random<R: Rng>(problem: &Problem, config: &Config, use_time_windows: bool, rng: &mut R) -> Self {
        let mut stops: Vec<usize> = problem.customers().collect();
        stops.shuffle(rng);

        let mut chromosome: Chromosome = vec![Vec::new(); problem.slots.len()];
        let mut loads = vec![0.0; problem.slots.len()];

        for node in stops {
            let demand = problem.demand(node);
            let slot = problem
                .slots
                .iter()
                .zip(loads.iter())
                .position(|(slot, load)| load + demand <= slot.capacity + CAPACITY_EPSILON);

            if let Some(index) = slot {
                chromosome[index].push(node);
                loads[index] += demand;
            }
        }

        Individual::new(chromosome, problem, config, use_time_windows)
    }

    /// Get the total distance of the decoded solution.
    pub fn cost(&self) -> f64 {
        self.solution.cost()
    }

    /// Check if every decoded route is feasible.
    pub fn is_feasible(&self) -> bool {
        self.solution.is_feasible()
    }
}

impl PartialEq for Individual {
    fn eq(&self, other: &Self) -> bool {
        self.rank == other.rank
    }
}

impl Eq for Individual {}

impl PartialOrd for Individual {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Individual {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank.cmp(&other.rank)
    }
}
