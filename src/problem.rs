//! Problem definition: stops, depot, fleet and the shared distance matrix.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::distance::{Coordinate, DistanceMatrix};

/// Node index of the depot inside a [`Problem`].
pub const DEPOT: usize = 0;

/// Length of a day in seconds; the implicit end of an open window.
pub const DAY_SECONDS: f64 = 24.0 * 3600.0;

/// A service interval in seconds from midnight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    /// Create a new time window.
    pub fn new(start: f64, end: f64) -> Self {
        TimeWindow { start, end }
    }

    /// Create a window from minutes after midnight.
    pub fn from_minutes(start: f64, end: f64) -> Self {
        TimeWindow::new(start * 60.0, end * 60.0)
    }

    /// Check if `time` lies inside the window.
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }
}

/// A delivery location with a demand and an optional time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stop {
    pub id: String,
    pub name: String,
    pub location: Coordinate,
    pub demand: f64,
    pub time_window: Option<TimeWindow>,
    /// Explicit service duration in seconds, replacing the demand-based policy
    pub service_time: Option<f64>,
}

impl Stop {
    /// Create a stop without a time window.
    pub fn new(id: impl Into<String>, latitude: f64, longitude: f64, demand: f64) -> Self {
        let id = id.into();
        Stop {
            name: id.clone(),
            id,
            location: Coordinate::new(latitude, longitude),
            demand,
            time_window: None,
            service_time: None,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the time window.
    pub fn with_time_window(mut self, window: TimeWindow) -> Self {
        self.time_window = Some(window);
        self
    }

    /// Set an explicit service duration in seconds.
    pub fn with_service_time(mut self, seconds: f64) -> Self {
        self.service_time = Some(seconds);
        self
    }
}

/// The start and end point of every route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Depot {
    pub id: String,
    pub name: String,
    pub location: Coordinate,
    /// Operating hours; the configured defaults apply when absent
    pub window: Option<TimeWindow>,
}

impl Depot {
    /// Create a depot using the default operating hours.
    pub fn new(id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        let id = id.into();
        Depot {
            name: id.clone(),
            id,
            location: Coordinate::new(latitude, longitude),
            window: None,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the operating hours.
    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }
}

/// A vehicle type, replicated `count` times in the fleet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: String,
    pub name: String,
    pub capacity: f64,
    pub count: usize,
}

impl Vehicle {
    /// Create a single vehicle.
    pub fn new(id: impl Into<String>, capacity: f64) -> Self {
        let id = id.into();
        Vehicle {
            name: id.clone(),
            id,
            capacity,
            count: 1,
        }
    }

    /// Set the number of identical vehicles.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }
}

/// One concrete vehicle instance, consumable by at most one route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSlot {
    pub vehicle_id: String,
    pub name: String,
    pub capacity: f64,
    /// Position of this slot among the copies of its vehicle
    pub index: usize,
}

impl VehicleSlot {
    /// Check whether two slots denote the same vehicle instance.
    pub fn same_slot(&self, other: &VehicleSlot) -> bool {
        self.vehicle_id == other.vehicle_id && self.index == other.index
    }
}

/// Expand every vehicle into `count` slots (a count of zero counts as one).
pub fn expand_vehicle_slots(vehicles: &[Vehicle]) -> Vec<VehicleSlot> {
    vehicles
        .iter()
        .flat_map(|vehicle| {
            (0..vehicle.count.max(1)).map(move |index| VehicleSlot {
                vehicle_id: vehicle.id.clone(),
                name: vehicle.name.clone(),
                capacity: if vehicle.capacity.is_finite() {
                    vehicle.capacity.max(0.0)
                } else {
                    0.0
                },
                index,
            })
        })
        .collect()
}

/// A routing instance: node 0 is the depot, node `i + 1` is `stops[i]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub depot: Depot,
    pub stops: Vec<Stop>,
    pub vehicles: Vec<Vehicle>,
    pub slots: Vec<VehicleSlot>,
    pub distance_matrix: DistanceMatrix,
}

impl Problem {
    /// Create a problem. Stops sharing the depot's id are dropped.
    pub fn new(depot: Depot, stops: Vec<Stop>, vehicles: Vec<Vehicle>) -> Self {
        let stops: Vec<Stop> = stops.into_iter().filter(|s| s.id != depot.id).collect();
        let slots = expand_vehicle_slots(&vehicles);

        let distance_matrix = DistanceMatrix::new(
            std::iter::once((depot.id.as_str(), depot.location))
                .chain(stops.iter().map(|s| (s.id.as_str(), s.location))),
        );

        Problem {
            depot,
            stops,
            vehicles,
            slots,
            distance_matrix,
        }
    }

    /// Number of nodes including the depot.
    pub fn node_count(&self) -> usize {
        self.stops.len() + 1
    }

    /// Get the number of stops (excluding the depot).
    pub fn customer_count(&self) -> usize {
        self.stops.len()
    }

    /// Node indices of all stops.
    pub fn customers(&self) -> impl Iterator<Item = usize> + Clone {
        1..self.node_count()
    }

    /// The stop behind a node index, `None` for the depot.
    pub fn stop(&self, node: usize) -> Option<&Stop> {
        if node == DEPOT {
            None
        } else {
            self.stops.get(node - 1)
        }
    }

    /// Distance in kilometers between two nodes.
    pub fn distance(&self, from: usize, to: usize) -> f64 {
        self.distance_matrix.get(from, to)
    }

    /// Demand of a node; the depot has none.
    pub fn demand(&self, node: usize) -> f64 {
        self.stop(node)
            .map(|s| if s.demand.is_finite() { s.demand.max(0.0) } else { 0.0 })
            .unwrap_or(0.0)
    }

    /// Location of a node.
    pub fn location(&self, node: usize) -> Coordinate {
        match self.stop(node) {
            Some(stop) => stop.location,
            None => self.depot.location,
        }
    }

    /// Id of a node.
    pub fn node_id(&self, node: usize) -> &str {
        match self.stop(node) {
            Some(stop) => &stop.id,
            None => &self.depot.id,
        }
    }

    /// Display name of a node.
    pub fn node_name(&self, node: usize) -> &str {
        match self.stop(node) {
            Some(stop) => &stop.name,
            None => &self.depot.name,
        }
    }

    /// Depot operating hours.
    pub fn depot_window(&self, config: &Config) -> TimeWindow {
        self.depot
            .window
            .unwrap_or_else(|| TimeWindow::new(config.depot_open, config.depot_close))
    }

    /// Window a node must be served in when windows are enforced.
    ///
    /// Stops without their own window inherit the depot's operating hours.
    pub fn time_window(&self, node: usize, config: &Config) -> TimeWindow {
        self.stop(node)
            .and_then(|s| s.time_window)
            .unwrap_or_else(|| self.depot_window(config))
    }

    /// Service duration at a node in seconds; zero at the depot.
    pub fn service_time(&self, node: usize, config: &Config) -> f64 {
        match self.stop(node) {
            None => 0.0,
            Some(stop) => match stop.service_time {
                Some(seconds) if seconds.is_finite() && seconds > 0.0 => seconds,
                _ => config.travel.service_time(self.demand(node)),
            },
        }
    }

    /// Travel time in seconds between two nodes.
    pub fn travel_time(&self, from: usize, to: usize, config: &Config) -> f64 {
        config.travel.travel_time(self.distance(from, to))
    }

    /// Largest single-slot capacity, zero for an empty fleet.
    pub fn max_capacity(&self) -> f64 {
        self.slots.iter().map(|s| s.capacity).fold(0.0, f64::max)
    }

    /// Total capacity over all slots.
    pub fn total_capacity(&self) -> f64 {
        self.slots.iter().map(|s| s.capacity).sum()
    }

    /// Check if there is nothing to route.
    pub fn is_degenerate(&self) -> bool {
        self.stops.is_empty() || self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicles_expand_into_slots() {
        let vehicles = vec![
            Vehicle::new("van", 10.0).with_count(3),
            Vehicle::new("truck", 20.0).with_count(0),
        ];
        let slots = expand_vehicle_slots(&vehicles);

        assert_eq!(slots.len(), 4);
        assert_eq!(slots[2].vehicle_id, "van");
        assert_eq!(slots[2].index, 2);
        assert_eq!(slots[3].vehicle_id, "truck");
        assert!(!slots[0].same_slot(&slots[1]));
    }

    #[test]
    fn stops_with_depot_id_are_dropped() {
        let depot = Depot::new("d", 0.0, 0.0);
        let stops = vec![Stop::new("d", 0.0, 0.0, 0.0), Stop::new("a", 0.0, 0.1, 1.0)];
        let problem = Problem::new(depot, stops, vec![Vehicle::new("v", 5.0)]);

        assert_eq!(problem.customer_count(), 1);
        assert_eq!(problem.node_id(1), "a");
        assert_eq!(problem.node_id(DEPOT), "d");
    }

    #[test]
    fn depot_name_is_reported_for_node_zero() {
        let depot = Depot::new("d", 0.0, 0.0).with_name("Central Depot");
        let problem = Problem::new(depot, vec![Stop::new("a", 0.0, 0.1, 1.0)], vec![]);

        assert_eq!(problem.node_name(DEPOT), "Central Depot");
        assert_eq!(problem.node_id(DEPOT), "d");
        assert_eq!(problem.customers().clone().count(), 1);
    }

    #[test]
    fn missing_windows_inherit_depot_hours() {
        let depot = Depot::new("d", 0.0, 0.0).with_window(TimeWindow::new(100.0, 200.0));
        let stops = vec![Stop::new("a", 0.0, 0.1, 1.0)];
        let problem = Problem::new(depot, stops, vec![]);

        let window = problem.time_window(1, &Config::default());
        assert_eq!(window, TimeWindow::new(100.0, 200.0));
    }

    #[test]
    fn explicit_service_time_overrides_policy() {
        let depot = Depot::new("d", 0.0, 0.0);
        let stops = vec![
            Stop::new("a", 0.0, 0.1, 60.0),
            Stop::new("b", 0.0, 0.2, 60.0).with_service_time(30.0),
        ];
        let problem = Problem::new(depot, stops, vec![]);
        let config = Config::default();

        assert!((problem.service_time(1, &config) - 540.0).abs() < 1e-9);
        assert!((problem.service_time(2, &config) - 30.0).abs() < 1e-9);
        assert_eq!(problem.service_time(DEPOT, &config), 0.0);
    }
}
