//! Ant-colony construction.
//!
//! Every iteration a fixed number of ants build complete solutions slot by
//! slot, sampling the next stop in proportion to
//! `pheromone(i,j)^alpha * (1/d(i,j))^beta`. Pheromone then evaporates and
//! the iteration-best solution reinforces its edges by `Q / cost`.

use log::{debug, info, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::config::{AntColonyParams, Config, Heuristic};
use crate::error::OptimizeError;
use crate::problem::{Problem, VehicleSlot, DEPOT};
use crate::solution::{Route, SearchOutcome, Solution, CAPACITY_EPSILON};
use crate::utils::CancellationToken;

/// Directed desirability weights between nodes.
#[derive(Debug, Clone)]
pub struct PheromoneMatrix {
    size: usize,
    values: Vec<f64>,
    floor: f64,
}

impl PheromoneMatrix {
    /// Create a uniform matrix over `size` nodes.
    pub fn new(size: usize, initial: f64, floor: f64) -> Self {
        PheromoneMatrix {
            size,
            values: vec![initial.max(floor); size * size],
            floor,
        }
    }

    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.values[from * self.size + to]
    }

    /// Multiply every entry by `1 - rho`, keeping it above the floor.
    pub fn evaporate(&mut self, rho: f64) {
        let factor = 1.0 - rho;
        let floor = self.floor;
        for value in self.values.iter_mut() {
            *value = (*value * factor).max(floor);
        }
    }

    /// Add `amount` to every edge of a node sequence.
    pub fn deposit(&mut self, nodes: &[usize], amount: f64) {
        for pair in nodes.windows(2) {
            self.values[pair[0] * self.size + pair[1]] += amount;
        }
    }
}

/// Ant-colony driver.
pub struct AntColony<'a> {
    problem: &'a Problem,
    config: &'a Config,
    use_time_windows: bool,
}

impl<'a> AntColony<'a> {
    pub fn new(problem: &'a Problem, config: &'a Config, use_time_windows: bool) -> Self {
        AntColony {
            problem,
            config,
            use_time_windows,
        }
    }

    /// Run the colony and return the best solution seen.
    pub fn solve<R: Rng>(&self, rng: &mut R, cancel: &CancellationToken) -> Result<Solution, OptimizeError> {
        self.run(rng, cancel).map(|outcome| outcome.solution)
    }

    /// Run the colony, recording the incumbent rank after every iteration.
    ///
    /// Ants of one iteration run in parallel, each with its own generator
    /// seeded from `rng`, so a fixed seed gives a fixed result.
    pub fn run<R: Rng>(&self, rng: &mut R, cancel: &CancellationToken) -> Result<SearchOutcome, OptimizeError> {
        let heuristic = Heuristic::AntColony;
        if self.problem.is_degenerate() {
            return Ok(SearchOutcome {
                solution: Solution::new(heuristic),
                history: Vec::new(),
            });
        }

        let params: &AntColonyParams = &self.config.ant_colony;
        info!(
            "Running {} on {} stops: {} ants, {} iterations",
            heuristic,
            self.problem.customer_count(),
            params.ants,
            params.iterations
        );

        let mut pheromones = PheromoneMatrix::new(
            self.problem.node_count(),
            params.initial_pheromone,
            params.min_pheromone,
        );
        let mut best: Option<Solution> = None;
        let mut history = Vec::with_capacity(params.iterations);

        for iteration in 0..params.iterations {
            if cancel.is_cancelled() {
                return Err(OptimizeError::Cancelled { heuristic });
            }

            let seeds: Vec<u64> = (0..params.ants.max(1)).map(|_| rng.gen()).collect();
            let solutions: Vec<Solution> = seeds
                .par_iter()
                .map(|&seed| {
                    let mut ant_rng = ChaCha8Rng::seed_from_u64(seed);
                    self.construct(&pheromones, &mut ant_rng)
                })
                .collect();

            let iteration_best = solutions
                .into_iter()
                .reduce(|best, candidate| if candidate.rank() < best.rank() { candidate } else { best });

            let Some(iteration_best) = iteration_best else {
                break;
            };

            pheromones.evaporate(params.rho);
            let amount = params.q / iteration_best.cost().max(1e-6);
            for route in &iteration_best.routes {
                pheromones.deposit(&route.nodes(), amount);
            }

            let improved = best
                .as_ref()
                .map_or(true, |incumbent| iteration_best.rank() < incumbent.rank());
            if improved {
                best = Some(iteration_best);
            }

            if let Some(incumbent) = &best {
                let rank = incumbent.rank();
                debug!(
                    "Iteration {}: best {:.3} km, {} unserved, {} infeasible",
                    iteration, rank.distance, rank.unserved, rank.infeasible
                );
                history.push(rank);
            }
        }

        let solution = best.unwrap_or_else(|| Solution::new(heuristic));
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

    /// Build one ant's solution.
    pub fn construct<R: Rng>(&self, pheromones: &PheromoneMatrix, rng: &mut R) -> Solution {
        let mut visited = vec![false; self.problem.node_count()];
        visited[DEPOT] = true;
        let mut remaining = self.problem.customer_count();
        let mut routes = Vec::new();

        for slot in &self.problem.slots {
            if remaining == 0 {
                break;
            }

            let customers = self.construct_route(slot, pheromones, &mut visited, rng);
            if customers.is_empty() {
                continue;
            }
            remaining -= customers.len();

            routes.push(Route::for_slot(
                &customers,
                slot.clone(),
                self.problem,
                self.config,
                self.use_time_windows,
            ));
        }

        Solution::from_routes(Heuristic::AntColony, routes, self.problem)
    }

    fn construct_route<R: Rng>(
        &self,
        slot: &VehicleSlot,
        pheromones: &PheromoneMatrix,
        visited: &mut [bool],
        rng: &mut R,
    ) -> Vec<usize> {
        let problem = self.problem;
        let config = self.config;
        let params = &config.ant_colony;
        let depot_close = problem.depot_window(config).end;

        let mut customers = Vec::new();
        let mut current = DEPOT;
        let mut time = problem.depot_window(config).start;
        let mut load = 0.0;

        loop {
            let mut candidates: Vec<(usize, f64, f64)> = Vec::new();

            for node in problem.customers() {
                if visited[node] || load + problem.demand(node) > slot.capacity + CAPACITY_EPSILON {
                    continue;
                }

                let arrival = time + problem.travel_time(current, node, config);
                let mut start = arrival;
                if self.use_time_windows {
                    let window = problem.time_window(node, config);
                    if arrival > window.end {
                        continue;
                    }
                    start = arrival.max(window.start);
                }

                let departure = start + problem.service_time(node, config);
                if departure + problem.travel_time(node, DEPOT, config) > depot_close {
                    continue;
                }

                let distance = problem.distance(current, node);
                let visibility = if distance > 0.0 { 1.0 / distance } else { 1.0 };
                let score = pheromones.get(current, node).powf(params.alpha) * visibility.powf(params.beta);

                candidates.push((node, score, departure));
            }

            let Some((node, departure)) = Self::roulette(&candidates, rng) else {
                break;
            };

            visited[node] = true;
            load += problem.demand(node);
            time = departure;
            current = node;
            customers.push(node);
        }

        customers
    }

    /// Sample a candidate proportionally to its score.
    fn roulette<R: Rng>(candidates: &[(usize, f64, f64)], rng: &mut R) -> Option<(usize, f64)> {
        let (last, _, last_departure) = *candidates.last()?;

        let total: f64 = candidates.iter().map(|(_, score, _)| score).sum();
        if !total.is_finite() || total <= 0.0 {
            let (node, _, departure) = candidates[rng.gen_range(0..candidates.len())];
            return Some((node, departure));
        }

        let target = rng.gen::<f64>() * total;
        let mut cumulative = 0.0;
        for &(node, score, departure) in candidates {
            cumulative += score;
            if target <= cumulative {
                return Some((node, departure));
            }
        }

        Some((last, last_departure))
    }
}
