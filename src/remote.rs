//! Adapter for the external solver service.
//!
//! The problem is sent as one JSON request; the indexed routes of the reply
//! are mapped back onto this crate's [`Route`] shape. Any failure is
//! reported as a [`RemoteSolverError`] so the caller can fall back.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::assignment::assign_vehicles;
use crate::config::{Config, Heuristic, RemoteSolverConfig};
use crate::distance::Coordinate;
use crate::error::RemoteSolverError;
use crate::problem::{Problem, DEPOT};
use crate::solution::{Route, Solution};

/// A location entry; times are in minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub service_time: f64,
    pub time_window_start: Option<f64>,
    pub time_window_end: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteVehicle {
    pub id: String,
    pub capacity: i64,
}

/// Request body. Location 0 is the depot, location `i` is node `i`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveRequest {
    pub locations: Vec<RemoteLocation>,
    /// One entry per vehicle slot
    pub vehicles: Vec<RemoteVehicle>,
    pub demands: Vec<i64>,
    #[serde(rename = "useTimeWindows")]
    pub use_time_windows: bool,
    pub include_geometry: bool,
    pub time_limit_seconds: u64,
    pub traffic_factor: f64,
}

/// One route of the service's reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteRoute {
    #[serde(rename = "Vehicle ID")]
    pub vehicle_id: String,
    #[serde(rename = "Route Indices", default)]
    pub route_indices: Vec<usize>,
    #[serde(rename = "Arrival Times (seconds)", default)]
    pub arrival_times: Vec<f64>,
    #[serde(rename = "Service Times (seconds)", default)]
    pub service_times: Vec<f64>,
    #[serde(rename = "Distance (km)", default)]
    pub distance_km: Option<f64>,
    #[serde(rename = "Duration (seconds)", default)]
    pub duration_seconds: Option<f64>,
    #[serde(rename = "Load Carried", default)]
    pub load_carried: Option<f64>,
    /// `[latitude, longitude]` pairs
    #[serde(rename = "Route Geometry", default)]
    pub geometry: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveResponse {
    pub result: Option<Vec<RemoteRoute>>,
}

/// Sends a request to the solver service.
pub trait SolverTransport: Send + Sync {
    fn send(&self, request: &SolveRequest) -> Result<SolveResponse, RemoteSolverError>;
}

/// Blocking HTTP transport with a request deadline.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(settings: &RemoteSolverConfig) -> Result<Self, RemoteSolverError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .build()?;

        Ok(HttpTransport {
            client,
            url: settings.url.clone(),
        })
    }
}

impl SolverTransport for HttpTransport {
    fn send(&self, request: &SolveRequest) -> Result<SolveResponse, RemoteSolverError> {
        debug!("Posting {} locations to {}", request.locations.len(), self.url);

        let response = self.client.post(&self.url).json(request).send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RemoteSolverError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text()?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Builds requests and translates replies for one problem.
pub struct RemoteSolver<'a> {
    problem: &'a Problem,
    config: &'a Config,
    settings: &'a RemoteSolverConfig,
    use_time_windows: bool,
}

impl<'a> RemoteSolver<'a> {
    pub fn new(
        problem: &'a Problem,
        config: &'a Config,
        settings: &'a RemoteSolverConfig,
        use_time_windows: bool,
    ) -> Self {
        RemoteSolver {
            problem,
            config,
            settings,
            use_time_windows,
        }
    }

    /// Submit the problem and translate the reply.
    pub fn solve(&self, transport: &dyn SolverTransport) -> Result<Solution, RemoteSolverError> {
        if self.problem.is_degenerate() {
            return Ok(Solution::new(Heuristic::Remote));
        }

        info!(
            "Sending {} stops and {} vehicle slots to the remote solver",
            self.problem.customer_count(),
            self.problem.slots.len()
        );

        let response = transport.send(&self.request())?;
        let routes = response.result.ok_or(RemoteSolverError::MissingResult)?;
        let solution = self.translate(routes)?;

        info!(
            "Remote solver returned {} routes, {:.2} km",
            solution.routes.len(),
            solution.distance
        );
        Ok(solution)
    }

    /// Serialize the problem into the service's request shape.
    pub fn request(&self) -> SolveRequest {
        let problem = self.problem;
        let config = self.config;
        let depot_window = problem.depot_window(config);

        let locations = (0..problem.node_count())
            .map(|node| {
                let window = if node == DEPOT {
                    Some(depot_window)
                } else {
                    problem.stop(node).and_then(|s| s.time_window)
                };
                let location = problem.location(node);

                RemoteLocation {
                    name: problem.node_name(node).to_string(),
                    latitude: location.latitude,
                    longitude: location.longitude,
                    service_time: problem.service_time(node, config) / 60.0,
                    time_window_start: window.map(|w| w.start / 60.0),
                    time_window_end: window.map(|w| w.end / 60.0),
                }
            })
            .collect();

        let vehicles = problem
            .slots
            .iter()
            .map(|slot| RemoteVehicle {
                id: slot.vehicle_id.clone(),
                capacity: slot.capacity.round() as i64,
            })
            .collect();

        let demands = (0..problem.node_count())
            .map(|node| problem.demand(node).round() as i64)
            .collect();

        SolveRequest {
            locations,
            vehicles,
            demands,
            use_time_windows: self.use_time_windows,
            include_geometry: self.settings.include_geometry,
            time_limit_seconds: self.settings.time_limit_seconds,
            traffic_factor: config.travel.traffic_factor,
        }
    }

    /// Map the reply's routes onto scheduled routes bound to free slots.
    pub fn translate(&self, remote_routes: Vec<RemoteRoute>) -> Result<Solution, RemoteSolverError> {
        let problem = self.problem;
        let mut seen = HashSet::new();
        let mut routes: Vec<Route> = Vec::with_capacity(remote_routes.len());

        for remote in remote_routes {
            if let Some(&bad) = remote.route_indices.iter().find(|&&i| i >= problem.node_count()) {
                return Err(RemoteSolverError::Malformed(format!(
                    "route of vehicle {} visits unknown location {}",
                    remote.vehicle_id, bad
                )));
            }

            let customers: Vec<usize> = remote
                .route_indices
                .iter()
                .copied()
                .filter(|&node| node != DEPOT)
                .collect();

            if customers.is_empty() {
                continue;
            }
            if let Some(&node) = customers.iter().find(|&&node| !seen.insert(node)) {
                return Err(RemoteSolverError::Malformed(format!(
                    "location {} is visited twice",
                    node
                )));
            }

            let mut route = Route::from_sequence(&customers, problem, self.config, self.use_time_windows);
            Self::apply_reported_values(&mut route, &remote);

            let free_slot = problem.slots.iter().find(|slot| {
                slot.vehicle_id == remote.vehicle_id
                    && !routes
                        .iter()
                        .filter_map(|r| r.slot.as_ref())
                        .any(|held| held.same_slot(slot))
            });
            if let Some(slot) = free_slot {
                route.assign(slot.clone());
            }

            routes.push(route);
        }

        assign_vehicles(&mut routes, &problem.slots);
        Ok(Solution::from_routes(Heuristic::Remote, routes, problem))
    }

    /// Take over the service's times, totals and geometry where usable.
    fn apply_reported_values(route: &mut Route, remote: &RemoteRoute) {
        let aligned = remote.route_indices.len() == route.stops.len()
            && remote.arrival_times.len() == route.stops.len();

        if aligned {
            for (k, stop) in route.stops.iter_mut().enumerate() {
                let service = remote
                    .service_times
                    .get(k)
                    .copied()
                    .filter(|s| s.is_finite())
                    .unwrap_or(stop.service_time);
                stop.arrival_time = remote.arrival_times[k];
                stop.wait_time = 0.0;
                stop.service_time = service;
                stop.departure_time = stop.arrival_time + service;
            }
        }

        if let Some(distance) = remote.distance_km.filter(|d| d.is_finite()) {
            route.distance = distance;
        }
        if let Some(duration) = remote.duration_seconds.filter(|d| d.is_finite()) {
            route.duration = duration;
        }
        if let Some(load) = remote.load_carried.filter(|l| l.is_finite()) {
            route.load = load;
        }

        if !remote.geometry.is_empty() {
            let geometry: Vec<Coordinate> = remote
                .geometry
                .iter()
                .map(|&[latitude, longitude]| Coordinate::new(latitude, longitude))
                .collect();

            if geometry.iter().all(Coordinate::is_valid) {
                route.geometry = geometry;
            } else {
                warn!(
                    "Ignoring invalid geometry for vehicle {}",
                    remote.vehicle_id
                );
            }
        }
    }
}
