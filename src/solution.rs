//! Solution representation: scheduled routes and aggregate metrics.

use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use crate::config::{Config, Heuristic};
use crate::distance::Coordinate;
use crate::problem::{Problem, TimeWindow, VehicleSlot, DEPOT};
use crate::utils::format_clock;

/// Tolerance used when comparing loads against capacities.
pub const CAPACITY_EPSILON: f64 = 1e-9;

/// A visit inside a route, with its computed schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteStop {
    /// Node index in the problem (0 is the depot)
    pub node: usize,
    pub stop_id: String,
    pub name: String,
    pub location: Coordinate,
    /// Position in the route, contiguous from 0
    pub order: usize,
    pub arrival_time: f64,
    /// Idle time before a window opens
    pub wait_time: f64,
    pub service_time: f64,
    pub departure_time: f64,
    pub demand: f64,
    pub time_window: Option<TimeWindow>,
}

impl RouteStop {
    /// Create an unscheduled visit of `node`.
    pub fn new(node: usize, problem: &Problem) -> Self {
        RouteStop {
            node,
            stop_id: problem.node_id(node).to_string(),
            name: problem.node_name(node).to_string(),
            location: problem.location(node),
            order: 0,
            arrival_time: 0.0,
            wait_time: 0.0,
            service_time: 0.0,
            departure_time: 0.0,
            demand: problem.demand(node),
            time_window: problem.stop(node).and_then(|s| s.time_window),
        }
    }

    /// Check if this visit is the depot.
    pub fn is_depot(&self) -> bool {
        self.node == DEPOT
    }

    /// Time service actually begins.
    pub fn service_start(&self) -> f64 {
        self.arrival_time + self.wait_time
    }
}

/// A depot-to-depot tour with its schedule and feasibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    /// Visits, starting and ending at the depot
    pub stops: Vec<RouteStop>,
    /// Vehicle instance serving the route, if assigned
    pub slot: Option<VehicleSlot>,
    /// Total distance in kilometers
    pub distance: f64,
    /// Seconds from depot departure to depot return
    pub duration: f64,
    /// Total demand carried
    pub load: f64,
    /// Every window, depot-closing and capacity constraint holds
    pub feasible: bool,
    /// Coordinates traversed by the route
    pub geometry: Vec<Coordinate>,
}

impl Route {
    /// Build and schedule a route visiting `customers` in order.
    pub fn from_sequence(
        customers: &[usize],
        problem: &Problem,
        config: &Config,
        use_time_windows: bool,
    ) -> Self {
        let stops = std::iter::once(DEPOT)
            .chain(customers.iter().copied())
            .chain(std::iter::once(DEPOT))
            .map(|node| RouteStop::new(node, problem))
            .collect();

        let mut route = Route {
            stops,
            slot: None,
            distance: 0.0,
            duration: 0.0,
            load: 0.0,
            feasible: true,
            geometry: Vec::new(),
        };
        route.schedule(problem, config, use_time_windows);
        route
    }

    /// Same as [`Route::from_sequence`] but bound to a vehicle slot.
    pub fn for_slot(
        customers: &[usize],
        slot: VehicleSlot,
        problem: &Problem,
        config: &Config,
        use_time_windows: bool,
    ) -> Self {
        let mut route = Route::from_sequence(customers, problem, config, use_time_windows);
        route.assign(slot);
        route
    }

    /// Recompute order, times, distance, load and feasibility.
    ///
    /// The schedule starts at the depot's opening time. Arrival before a
    /// window opens adds waiting time; arrival after it closes, or a return
    /// after the depot closes, flags the route as infeasible.
    pub fn schedule(&mut self, problem: &Problem, config: &Config, use_time_windows: bool) {
        let depot_window = problem.depot_window(config);
        let last = self.stops.len().saturating_sub(1);

        let mut distance = 0.0;
        let mut load = 0.0;
        let mut feasible = true;

        for i in 0..self.stops.len() {
            let node = self.stops[i].node;
            self.stops[i].order = i;

            if i == 0 {
                let stop = &mut self.stops[0];
                stop.arrival_time = depot_window.start;
                stop.wait_time = 0.0;
                stop.service_time = 0.0;
                stop.departure_time = depot_window.start;
                continue;
            }

            let previous = &self.stops[i - 1];
            let leg = problem.distance(previous.node, node);
            let arrival = previous.departure_time + config.travel.travel_time(leg);
            distance += leg;

            let mut wait = 0.0;
            let mut service = 0.0;

            if i != last && node != DEPOT {
                if use_time_windows {
                    let window = problem.time_window(node, config);
                    if arrival < window.start {
                        wait = window.start - arrival;
                    }
                    if arrival > window.end {
                        debug!(
                            "Route violates window at {}: arrival {}, end {}",
                            problem.node_name(node),
                            format_clock(arrival),
                            format_clock(window.end)
                        );
                        feasible = false;
                    }
                }
                service = problem.service_time(node, config);
                load += problem.demand(node);
            }

            let stop = &mut self.stops[i];
            stop.arrival_time = arrival;
            stop.wait_time = wait;
            stop.service_time = service;
            stop.departure_time = arrival + wait + service;
        }

        let end = self.stops.last().map(|s| s.arrival_time).unwrap_or(depot_window.start);
        if end > depot_window.end {
            debug!(
                "Route returns at {} after depot closes at {}",
                format_clock(end),
                format_clock(depot_window.end)
            );
            feasible = false;
        }

        if let Some(slot) = &self.slot {
            if load > slot.capacity + CAPACITY_EPSILON {
                feasible = false;
            }
        }

        self.distance = distance;
        self.load = load;
        self.duration = end - depot_window.start;
        self.feasible = feasible;
        self.geometry = self.stops.iter().map(|s| s.location).collect();
    }

    /// Bind the route to a vehicle slot and re-check its capacity.
    pub fn assign(&mut self, slot: VehicleSlot) {
        if self.load > slot.capacity + CAPACITY_EPSILON {
            self.feasible = false;
        }
        self.slot = Some(slot);
    }

    /// Check if a vehicle slot serves this route.
    pub fn is_assigned(&self) -> bool {
        self.slot.is_some()
    }

    /// Name of the serving vehicle.
    pub fn vehicle_name(&self) -> &str {
        self.slot.as_ref().map(|s| s.name.as_str()).unwrap_or("Unassigned")
    }

    /// Node indices of the visited stops, without the depot ends.
    pub fn customers(&self) -> Vec<usize> {
        self.stops
            .iter()
            .filter(|s| !s.is_depot())
            .map(|s| s.node)
            .collect()
    }

    /// Node indices including both depot ends.
    pub fn nodes(&self) -> Vec<usize> {
        self.stops.iter().map(|s| s.node).collect()
    }

    /// Number of visited stops.
    pub fn stop_count(&self) -> usize {
        self.stops.iter().filter(|s| !s.is_depot()).count()
    }

    /// Check if the route visits no stop.
    pub fn is_empty(&self) -> bool {
        self.stop_count() == 0
    }

    /// Replace the visiting order and reschedule.
    pub fn resequence(
        &mut self,
        customers: &[usize],
        problem: &Problem,
        config: &Config,
        use_time_windows: bool,
    ) {
        let slot = self.slot.take();
        *self = Route::from_sequence(customers, problem, config, use_time_windows);
        if let Some(slot) = slot {
            self.assign(slot);
        }
    }
}

/// Ordering key of a solution for the randomized heuristics.
///
/// Fewer unserved stops first, then fewer infeasible routes, then distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rank {
    pub unserved: usize,
    pub infeasible: usize,
    pub distance: f64,
}

impl Rank {
    /// The worst possible rank.
    pub fn worst() -> Self {
        Rank {
            unserved: usize::MAX,
            infeasible: usize::MAX,
            distance: f64::INFINITY,
        }
    }
}

impl Eq for Rank {}

impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.unserved
            .cmp(&other.unserved)
            .then(self.infeasible.cmp(&other.infeasible))
            .then(self.distance.total_cmp(&other.distance))
    }
}

/// Result of an iterative search with the incumbent's rank after every step.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub solution: Solution,
    pub history: Vec<Rank>,
}

/// A set of routes produced by one heuristic.
#[derive(Clone, Serialize, Deserialize)]
pub struct Solution {
    /// Heuristic that was requested
    pub heuristic: Heuristic,
    pub routes: Vec<Route>,
    /// Total distance in kilometers
    pub distance: f64,
    /// Sum of route durations in seconds
    pub duration: f64,
    /// Total demand carried
    pub load: f64,
    /// Ids of stops no route visits
    pub unserved: Vec<String>,
    /// The result comes from the savings fallback instead of the requested heuristic
    pub fallback: bool,
}

impl Solution {
    /// Create a new, empty solution.
    pub fn new(heuristic: Heuristic) -> Self {
        Solution {
            heuristic,
            routes: Vec::new(),
            distance: 0.0,
            duration: 0.0,
            load: 0.0,
            unserved: Vec::new(),
            fallback: false,
        }
    }

    /// Create an evaluated solution from routes. Routes without stops are discarded.
    pub fn from_routes(heuristic: Heuristic, routes: Vec<Route>, problem: &Problem) -> Self {
        let mut solution = Solution::new(heuristic);
        solution.routes = routes.into_iter().filter(|r| !r.is_empty()).collect();
        solution.evaluate(problem);
        solution
    }

    /// Recompute totals and the unserved stop list.
    pub fn evaluate(&mut self, problem: &Problem) {
        self.distance = self.routes.iter().map(|r| r.distance).sum();
        self.duration = self.routes.iter().map(|r| r.duration).sum();
        self.load = self.routes.iter().map(|r| r.load).sum();

        let served = self.served_nodes();
        self.unserved = problem
            .customers()
            .filter(|node| !served.contains(node))
            .map(|node| problem.node_id(node).to_string())
            .collect();
    }

    /// Total distance; lower is better.
    pub fn cost(&self) -> f64 {
        self.distance
    }

    /// Distinct stop nodes visited by any route.
    pub fn served_nodes(&self) -> HashSet<usize> {
        self.routes
            .iter()
            .flat_map(|r| r.stops.iter())
            .filter(|s| !s.is_depot())
            .map(|s| s.node)
            .collect()
    }

    /// Number of routes flagged infeasible.
    pub fn infeasible_count(&self) -> usize {
        self.routes.iter().filter(|r| !r.feasible).count()
    }

    /// Check if every route is feasible.
    pub fn is_feasible(&self) -> bool {
        self.infeasible_count() == 0
    }

    /// Routes without a vehicle.
    pub fn unassigned_routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().filter(|r| !r.is_assigned())
    }

    /// Check if there are no routes.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Ordering key used by the randomized heuristics.
    pub fn rank(&self) -> Rank {
        Rank {
            unserved: self.unserved.len(),
            infeasible: self.infeasible_count(),
            distance: self.distance,
        }
    }

    /// Percentage of stops visited.
    pub fn coverage(&self, problem: &Problem) -> f64 {
        if problem.customer_count() == 0 {
            return 0.0;
        }
        self.served_nodes().len() as f64 / problem.customer_count() as f64 * 100.0
    }

    /// Compute reporting metrics.
    pub fn metrics(&self, problem: &Problem, config: &Config, use_time_windows: bool) -> SolutionMetrics {
        let routes_count = self.routes.len();
        let stops_served = self.served_nodes().len();
        let total_stops: usize = self.routes.iter().map(|r| r.stop_count()).sum();
        let total_service: f64 = self
            .routes
            .iter()
            .flat_map(|r| r.stops.iter())
            .filter(|s| !s.is_depot())
            .map(|s| s.service_time)
            .sum();

        let total_capacity = problem.total_capacity();
        let per_route = |value: f64| {
            if routes_count > 0 {
                value / routes_count as f64
            } else {
                0.0
            }
        };

        let on_time_rate = if use_time_windows && total_stops > 0 {
            let on_time = self
                .routes
                .iter()
                .flat_map(|r| r.stops.iter())
                .filter(|s| !s.is_depot())
                .filter(|s| problem.time_window(s.node, config).contains(s.service_start()))
                .count();
            Some(on_time as f64 / total_stops as f64 * 100.0)
        } else {
            None
        };

        let avg_delay_per_stop = if use_time_windows && total_stops > 0 {
            let delay: f64 = self
                .routes
                .iter()
                .flat_map(|r| r.stops.iter())
                .filter(|s| !s.is_depot())
                .map(|s| (s.arrival_time - problem.time_window(s.node, config).end).max(0.0))
                .sum();
            delay / total_stops as f64
        } else {
            0.0
        };

        SolutionMetrics {
            total_distance: self.distance,
            total_duration: self.duration,
            demand_served: self.load,
            stops_served,
            coverage_percentage: self.coverage(problem),
            vehicle_utilization: if total_capacity > 0.0 {
                self.load / total_capacity * 100.0
            } else {
                0.0
            },
            routes_count,
            unassigned_routes: self.unassigned_routes().count(),
            avg_stops_per_route: per_route(total_stops as f64),
            avg_distance_per_route: per_route(self.distance),
            avg_duration_per_route: per_route(self.duration),
            avg_service_time_per_stop: if total_stops > 0 {
                total_service / total_stops as f64
            } else {
                0.0
            },
            on_time_rate,
            avg_delay_per_stop,
        }
    }
}

impl fmt::Debug for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Solution ({}):", self.heuristic)?;
        writeln!(f, "  Distance: {:.2} km", self.distance)?;
        writeln!(f, "  Load: {:.2}", self.load)?;
        writeln!(f, "  Feasible: {}", self.is_feasible())?;
        writeln!(f, "  Unserved: {:?}", self.unserved)?;
        writeln!(f, "  Routes: {}", self.routes.len())?;

        for (i, route) in self.routes.iter().enumerate() {
            let ids: Vec<&str> = route.stops.iter().map(|s| s.stop_id.as_str()).collect();
            let end = route.stops.last().map(|s| s.arrival_time).unwrap_or(0.0);
            writeln!(
                f,
                "  Route {} [{}]: {} (Load: {:.2}, Distance: {:.2}, Back: {}, Feasible: {})",
                i,
                route.vehicle_name(),
                ids.join(" -> "),
                route.load,
                route.distance,
                format_clock(end),
                route.feasible
            )?;
        }

        Ok(())
    }
}

/// Aggregate figures used to compare solutions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionMetrics {
    pub total_distance: f64,
    pub total_duration: f64,
    pub demand_served: f64,
    pub stops_served: usize,
    pub coverage_percentage: f64,
    pub vehicle_utilization: f64,
    pub routes_count: usize,
    pub unassigned_routes: usize,
    pub avg_stops_per_route: f64,
    pub avg_distance_per_route: f64,
    pub avg_duration_per_route: f64,
    pub avg_service_time_per_stop: f64,
    /// Share of stops served inside their window, when windows are enforced
    pub on_time_rate: Option<f64>,
    /// Mean seconds of arrival after window end; zero when windows are ignored
    pub avg_delay_per_stop: f64,
}
