//! # Fleet Routing
//!
//! Route construction and improvement for a capacity-constrained delivery
//! fleet leaving a single depot, with optional stop time windows and a
//! depot operating window.
//!
//! Five interchangeable heuristics build a [`Solution`]: savings-merge
//! (Clarke-Wright, with a weighted variant), nearest-neighbor, genetic
//! search, ant colony, and an external solver service that falls back to
//! savings-merge when it is unavailable. Savings routes are refined by
//! intra-route local search, and routes are bound to vehicles by best-fit
//! assignment.

pub mod ant_colony;
pub mod assignment;
pub mod config;
pub mod distance;
pub mod error;
pub mod genetic;
pub mod individual;
pub mod local_search;
pub mod nearest_neighbor;
pub mod population;
pub mod problem;
pub mod remote;
pub mod savings;
pub mod solution;
pub mod utils;

pub use crate::config::{Config, Heuristic, OptimizeOptions};
pub use crate::error::{OptimizeError, RemoteSolverError};
pub use crate::problem::{Depot, Problem, Stop, TimeWindow, Vehicle};
pub use crate::solution::{Route, RouteStop, Solution, SolutionMetrics};
pub use crate::utils::CancellationToken;

use log::{info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::time::{Duration, Instant};

use crate::ant_colony::AntColony;
use crate::genetic::Genetic;
use crate::nearest_neighbor::NearestNeighbor;
use crate::remote::{HttpTransport, RemoteSolver, SolverTransport};
use crate::savings::{Savings, SavingsVariant};

/// Result of one heuristic inside a comparison run.
#[derive(Debug)]
pub struct HeuristicOutcome {
    pub heuristic: Heuristic,
    pub result: Result<Solution, OptimizeError>,
    /// Present when the heuristic succeeded
    pub metrics: Option<SolutionMetrics>,
    pub elapsed: Duration,
}

/// All outcomes of a comparison run, in [`Heuristic::COMPARISON`] order.
#[derive(Debug)]
pub struct Comparison {
    pub outcomes: Vec<HeuristicOutcome>,
    /// Index of the outcome with the highest coverage, then lowest distance
    pub best: Option<usize>,
}

impl Comparison {
    /// The selected outcome.
    pub fn best_outcome(&self) -> Option<&HeuristicOutcome> {
        self.best.and_then(|index| self.outcomes.get(index))
    }

    /// The selected solution.
    pub fn best_solution(&self) -> Option<&Solution> {
        self.best_outcome().and_then(|outcome| outcome.result.as_ref().ok())
    }
}

/// Runs heuristics on one problem.
pub struct RouteOptimizer {
    pub problem: Problem,
    pub config: Config,
    cancel: CancellationToken,
}

impl RouteOptimizer {
    /// Create an optimizer for the given problem and configuration.
    pub fn new(problem: Problem, config: Config) -> Self {
        RouteOptimizer {
            problem,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Share a cancellation token with the caller.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels runs of this optimizer.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the selected heuristic.
    pub fn run(&self, options: OptimizeOptions) -> Result<Solution, OptimizeError> {
        self.run_seeded(options, self.config.seed, None)
    }

    /// Run the selected heuristic, sending remote requests through `transport`.
    pub fn run_with_transport(
        &self,
        options: OptimizeOptions,
        transport: &dyn SolverTransport,
    ) -> Result<Solution, OptimizeError> {
        self.run_seeded(options, self.config.seed, Some(transport))
    }

    /// Run every heuristic in parallel and pick the best result.
    pub fn compare(&self, use_time_windows: bool) -> Comparison {
        self.compare_inner(use_time_windows, None)
    }

    /// Same as [`RouteOptimizer::compare`] with an explicit remote transport.
    pub fn compare_with_transport(&self, use_time_windows: bool, transport: &dyn SolverTransport) -> Comparison {
        self.compare_inner(use_time_windows, Some(transport))
    }

    fn compare_inner(&self, use_time_windows: bool, transport: Option<&dyn SolverTransport>) -> Comparison {
        info!(
            "Comparing {} heuristics on {} stops",
            Heuristic::COMPARISON.len(),
            self.problem.customer_count()
        );

        let outcomes: Vec<HeuristicOutcome> = Heuristic::COMPARISON[..]
            .par_iter()
            .enumerate()
            .map(|(index, &heuristic)| {
                let options = OptimizeOptions::new(heuristic).with_time_windows(use_time_windows);
                let seed = self.config.seed.map(|s| s.wrapping_add(index as u64));

                let start = Instant::now();
                let result = self.run_seeded(options, seed, transport);
                let elapsed = start.elapsed();

                let metrics = result
                    .as_ref()
                    .ok()
                    .map(|solution| solution.metrics(&self.problem, &self.config, use_time_windows));

                HeuristicOutcome {
                    heuristic,
                    result,
                    metrics,
                    elapsed,
                }
            })
            .collect();

        let best = Self::select_best(&outcomes, &self.problem);
        if let Some(outcome) = best.and_then(|i| outcomes.get(i)) {
            info!("Best heuristic: {}", outcome.heuristic);
        }

        Comparison { outcomes, best }
    }

    /// Highest coverage wins; equal coverage goes to the lower distance.
    fn select_best(outcomes: &[HeuristicOutcome], problem: &Problem) -> Option<usize> {
        let mut best: Option<(usize, f64, f64)> = None;

        for (index, outcome) in outcomes.iter().enumerate() {
            let Ok(solution) = &outcome.result else {
                continue;
            };
            let coverage = solution.coverage(problem);
            let distance = solution.distance;

            let better = match best {
                None => true,
                Some((_, best_coverage, best_distance)) => {
                    coverage > best_coverage || (coverage == best_coverage && distance < best_distance)
                }
            };
            if better {
                best = Some((index, coverage, distance));
            }
        }

        best.map(|(index, _, _)| index)
    }

    fn run_seeded(
        &self,
        options: OptimizeOptions,
        seed: Option<u64>,
        transport: Option<&dyn SolverTransport>,
    ) -> Result<Solution, OptimizeError> {
        let heuristic = options.heuristic;
        if self.cancel.is_cancelled() {
            return Err(OptimizeError::Cancelled { heuristic });
        }

        if self.problem.is_degenerate() {
            info!("Nothing to route for {}", heuristic);
            return Ok(Solution::from_routes(heuristic, Vec::new(), &self.problem));
        }

        let problem = &self.problem;
        let config = &self.config;
        let use_time_windows = options.use_time_windows;

        let solution = match heuristic {
            Heuristic::SavingsMerge => Savings::new(problem, config, use_time_windows).solve(),
            Heuristic::EnhancedSavings => Savings::new(problem, config, use_time_windows)
                .with_variant(SavingsVariant::Enhanced)
                .solve(),
            Heuristic::NearestNeighbor => NearestNeighbor::new(problem, config, use_time_windows).solve(),
            Heuristic::Genetic => {
                let mut rng = Self::rng(seed);
                Genetic::new(problem, config, use_time_windows).solve(&mut rng, &self.cancel)?
            }
            Heuristic::AntColony => {
                let mut rng = Self::rng(seed);
                AntColony::new(problem, config, use_time_windows).solve(&mut rng, &self.cancel)?
            }
            Heuristic::Remote => self.run_remote(use_time_windows, transport),
        };

        Ok(solution)
    }

    /// Ask the remote solver; any failure falls back to savings-merge.
    fn run_remote(&self, use_time_windows: bool, transport: Option<&dyn SolverTransport>) -> Solution {
        let problem = &self.problem;
        let config = &self.config;

        let result = match (&config.remote, transport) {
            (None, _) => Err(RemoteSolverError::NotConfigured),
            (Some(settings), Some(transport)) => {
                RemoteSolver::new(problem, config, settings, use_time_windows).solve(transport)
            }
            (Some(settings), None) => HttpTransport::new(settings).and_then(|http| {
                RemoteSolver::new(problem, config, settings, use_time_windows).solve(&http)
            }),
        };

        match result {
            Ok(solution) => solution,
            Err(err) => {
                warn!(
                    "Remote solver failed ({}); falling back to {}",
                    err,
                    Heuristic::SavingsMerge
                );
                let mut solution = Savings::new(problem, config, use_time_windows).solve();
                solution.heuristic = Heuristic::Remote;
                solution.fallback = true;
                solution
            }
        }
    }

    fn rng(seed: Option<u64>) -> ChaCha8Rng {
        match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }
}

/// Build a problem from caller records and run one heuristic.
pub fn optimize(
    vehicles: &[Vehicle],
    stops: &[Stop],
    depot: &Depot,
    options: OptimizeOptions,
    config: &Config,
) -> Result<Solution, OptimizeError> {
    let problem = Problem::new(depot.clone(), stops.to_vec(), vehicles.to_vec());
    RouteOptimizer::new(problem, config.clone()).run(options)
}
