//! Nearest-neighbor construction, one vehicle slot at a time.

use log::{info, warn};

use crate::config::{Config, Heuristic};
use crate::problem::{Problem, VehicleSlot, DEPOT};
use crate::solution::{Route, Solution, CAPACITY_EPSILON};

/// Greedy nearest-neighbor construction.
pub struct NearestNeighbor<'a> {
    problem: &'a Problem,
    config: &'a Config,
    use_time_windows: bool,
}

impl<'a> NearestNeighbor<'a> {
    pub fn new(problem: &'a Problem, config: &'a Config, use_time_windows: bool) -> Self {
        NearestNeighbor {
            problem,
            config,
            use_time_windows,
        }
    }

    /// Fill each slot with the closest reachable stops until none is left.
    pub fn solve(&self) -> Solution {
        let heuristic = Heuristic::NearestNeighbor;
        if self.problem.is_degenerate() {
            return Solution::new(heuristic);
        }

        info!(
            "Running {} on {} stops",
            heuristic,
            self.problem.customer_count()
        );

        let mut visited = vec![false; self.problem.node_count()];
        visited[DEPOT] = true;
        let mut remaining = self.problem.customer_count();

        let mut routes = Vec::new();

        for slot in &self.problem.slots {
            if remaining == 0 {
                break;
            }

            let customers = self.build_route(slot, &mut visited);
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

        let solution = Solution::from_routes(heuristic, routes, self.problem);
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

        solution
    }

    /// Greedily extend one slot's route. Rejected candidates are not retried.
    fn build_route(&self, slot: &VehicleSlot, visited: &mut [bool]) -> Vec<usize> {
        let problem = self.problem;
        let mut customers = Vec::new();
        let mut capacity = slot.capacity;
        let mut current = DEPOT;
        let mut time = problem.depot_window(self.config).start;

        loop {
            let mut best: Option<(usize, f64)> = None;

            for node in problem.customers() {
                if visited[node] || problem.demand(node) > capacity + CAPACITY_EPSILON {
                    continue;
                }

                let arrival = time + problem.travel_time(current, node, self.config);
                if self.use_time_windows && arrival > problem.time_window(node, self.config).end {
                    continue;
                }

                let distance = problem.distance(current, node);
                if best.map_or(true, |(_, d)| distance < d) {
                    best = Some((node, distance));
                }
            }

            let Some((node, _)) = best else {
                break;
            };

            let mut start = time + problem.travel_time(current, node, self.config);
            if self.use_time_windows {
                start = start.max(problem.time_window(node, self.config).start);
            }
            time = start + problem.service_time(node, self.config);

            capacity -= problem.demand(node);
            visited[node] = true;
            customers.push(node);
            current = node;
        }

        customers
    }
}
