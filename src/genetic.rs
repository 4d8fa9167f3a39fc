//! Genetic search over per-slot route chromosomes.
//!
//! Each generation keeps the incumbent unchanged, then fills the rest of
//! the population with offspring of tournament-selected parents: route-wise
//! crossover followed by an occasional swap mutation.

use log::{debug, info, warn};
use rand::Rng;
use std::collections::HashSet;

use crate::config::{Config, Heuristic};
use crate::error::OptimizeError;
use crate::individual::{Chromosome, Individual};
use crate::population::Population;
use crate::problem::{Problem, DEPOT};
use crate::solution::{SearchOutcome, Solution, CAPACITY_EPSILON};
use crate::utils::CancellationToken;

/// Implements the genetic operators and the generation loop.
pub struct Genetic<'a> {
    problem: &'a Problem,
    config: &'a Config,
    use_time_windows: bool,
}

impl<'a> Genetic<'a> {
    pub fn new(problem: &'a Problem, config: &'a Config, use_time_windows: bool) -> Self {
        Genetic {
            problem,
            config,
            use_time_windows,
        }
    }

    /// Run the search and return the best solution seen.
    pub fn solve<R: Rng>(&self, rng: &mut R, cancel: &CancellationToken) -> Result<Solution, OptimizeError> {
        self.run(rng, cancel).map(|outcome| outcome.solution)
    }

    /// Run the search, recording the incumbent rank after every generation.
    pub fn run<R: Rng>(&self, rng: &mut R, cancel: &CancellationToken) -> Result<SearchOutcome, OptimizeError> {
        let heuristic = Heuristic::Genetic;
        if self.problem.is_degenerate() {
            return Ok(SearchOutcome {
                solution: Solution::new(heuristic),
                history: Vec::new(),
            });
        }

        let params = &self.config.genetic;
        let stops = self.problem.customer_count();
        let size = params.population_size(stops);
        let generations = params.generations(stops);

        info!(
            "Running {} on {} stops: population {}, {} generations",
            heuristic, stops, size, generations
        );

        let mut population = Population::random(size, self.problem, self.config, self.use_time_windows, rng);
        let mut best = match population.best() {
            Some(individual) => individual.clone(),
            None => {
                return Ok(SearchOutcome {
                    solution: Solution::new(heuristic),
                    history: Vec::new(),
                })
            }
        };
        let mut history = Vec::with_capacity(generations);

        for generation in 0..generations {
            if cancel.is_cancelled() {
                return Err(OptimizeError::Cancelled { heuristic });
            }

            let mut next = Vec::with_capacity(size);
            next.push(best.clone());

            while next.len() < size {
                let Some((first, second)) = population.select_parents(params.tournament_size, rng) else {
                    break;
                };

                let mut chromosome = if rng.gen_bool(params.crossover_rate.clamp(0.0, 1.0)) {
                    self.crossover(first, second, rng)
                } else {
                    first.chromosome.clone()
                };

                if rng.gen_bool(params.mutation_rate.clamp(0.0, 1.0)) {
                    Self::mutate(&mut chromosome, rng);
                }

                next.push(Individual::new(chromosome, self.problem, self.config, self.use_time_windows));
            }

            population = Population::new(next);

            if let Some(candidate) = population.best() {
                if candidate.rank < best.rank {
                    best = candidate.clone();
                }
            }

            debug!(
                "Generation {}: best {:.3} km, {} unserved, {} infeasible",
                generation, best.rank.distance, best.rank.unserved, best.rank.infeasible
            );
            history.push(best.rank);
        }

        let solution = best.solution;
        if !solution.is_feasible() {
            warn!(
                "{} returned {} infeasible routes",
                heuristic,
                solution.infeasible_count()
            );
        }
        info!(
            "{} finished: {} routes, {:.2} km, {} stops unserved",
            heuristic,
            solution.routes.len(),
            solution.distance,
            solution.unserved.len()
        );

        Ok(SearchOutcome { solution, history })
    }

    /// Route-wise crossover: child route `i` is parent route `i` from a
    /// randomly chosen parent, then the child is repaired.
    pub fn crossover<R: Rng>(&self, first: &Individual, second: &Individual, rng: &mut R) -> Chromosome {
        let length = first.chromosome.len().max(second.chromosome.len());

        let child: Chromosome = (0..length)
            .map(|i| match (first.chromosome.get(i), second.chromosome.get(i)) {
                (Some(a), Some(b)) => {
                    if rng.gen_bool(0.5) {
                        a.clone()
                    } else {
                        b.clone()
                    }
                }
                (Some(a), None) => a.clone(),
                (None, Some(b)) => b.clone(),
                (None, None) => Vec::new(),
            })
            .collect();

        self.repair(child)
    }

    /// Drop repeated stops (first occurrence wins), then insert missing
    /// stops at their cheapest position in a route with spare capacity.
    pub fn repair(&self, mut chromosome: Chromosome) -> Chromosome {
        let problem = self.problem;
        chromosome.resize(problem.slots.len(), Vec::new());

        let mut seen = HashSet::new();
        for route in chromosome.iter_mut() {
            route.retain(|&node| seen.insert(node));
        }

        let mut loads: Vec<f64> = chromosome
            .iter()
            .map(|route| route.iter().map(|&node| problem.demand(node)).sum())
            .collect();

        let missing: Vec<usize> = problem.customers().filter(|node| !seen.contains(node)).collect();

        for node in missing {
            let demand = problem.demand(node);
            let mut best: Option<(usize, usize, f64)> = None;

            for (index, (route, slot)) in chromosome.iter().zip(problem.slots.iter()).enumerate() {
                if loads[index] + demand > slot.capacity + CAPACITY_EPSILON {
                    continue;
                }
                for position in 0..=route.len() {
                    let cost = self.insertion_cost(route, position, node);
                    if best.map_or(true, |(_, _, c)| cost < c) {
                        best = Some((index, position, cost));
                    }
                }
            }

            if let Some((index, position, _)) = best {
                chromosome[index].insert(position, node);
                loads[index] += demand;
            }
        }

        chromosome
    }

    fn insertion_cost(&self, route: &[usize], position: usize, node: usize) -> f64 {
        let before = if position == 0 { DEPOT } else { route[position - 1] };
        let after = route.get(position).copied().unwrap_or(DEPOT);

        self.problem.distance(before, node) + self.problem.distance(node, after)
            - self.problem.distance(before, after)
    }

    /// Swap two stops inside one random route with at least two stops.
    pub fn mutate<R: Rng>(chromosome: &mut Chromosome, rng: &mut R) {
        let candidates: Vec<usize> = chromosome
            .iter()
            .enumerate()
            .filter(|(_, route)| route.len() >= 2)
            .map(|(index, _)| index)
            .collect();

        if candidates.is_empty() {
            return;
        }

        let route = &mut chromosome[candidates[rng.gen_range(0..candidates.len())]];
        let i = rng.gen_range(0..route.len());
        let mut j = rng.gen_range(0..route.len() - 1);
        if j >= i {
            j += 1;
        }
        route.swap(i, j);
    }
}
