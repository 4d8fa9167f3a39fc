//! Great-circle distances, travel/service durations and the distance matrix.

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create a new coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Coordinate {
            latitude,
            longitude,
        }
    }

    /// Check whether both components are finite numbers.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Bearing of `other` as seen from `self`, in radians on a flat projection.
    pub fn angle_to(&self, other: &Coordinate) -> f64 {
        (other.latitude - self.latitude).atan2(other.longitude - self.longitude)
    }
}

/// Haversine distance between two coordinates in kilometers, rounded to meters.
///
/// Invalid input degrades to `0.0` with a warning.
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    if !from.is_valid() || !to.is_valid() {
        warn!(
            "Invalid coordinates for distance calculation: ({}, {}) -> ({}, {})",
            from.latitude, from.longitude, to.latitude, to.longitude
        );
        return 0.0;
    }

    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    (EARTH_RADIUS_KM * c * 1000.0).round() / 1000.0
}

/// Speed, traffic and unloading parameters shared by every heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TravelModel {
    /// Average driving speed in km/h
    pub average_speed_kmh: f64,
    /// Multiplier (> 1) applied to free-flow travel time
    pub traffic_factor: f64,
    /// Fixed time spent at every stop, in seconds
    pub base_service_time: f64,
    /// Units of demand unloaded per second
    pub unloading_rate: f64,
}

impl Default for TravelModel {
    fn default() -> Self {
        TravelModel {
            average_speed_kmh: 40.0,
            traffic_factor: 1.25,
            base_service_time: 3.0 * 60.0,
            unloading_rate: 10.0 / 60.0,
        }
    }
}

impl TravelModel {
    /// Travel time in seconds for a distance in kilometers.
    pub fn travel_time(&self, distance_km: f64) -> f64 {
        if !distance_km.is_finite() || distance_km <= 0.0 || self.average_speed_kmh <= 0.0 {
            return 0.0;
        }
        distance_km / self.average_speed_kmh * 3600.0 * self.traffic_factor
    }

    /// Service time in seconds for a stop with the given demand.
    pub fn service_time(&self, demand: f64) -> f64 {
        let demand = if demand.is_finite() { demand.max(0.0) } else { 0.0 };
        if self.unloading_rate <= 0.0 {
            return self.base_service_time;
        }
        self.base_service_time + demand / self.unloading_rate
    }
}

/// Square matrix of great-circle distances between the nodes of one run.
///
/// Nodes are addressed by index (the depot is node 0) or by stop id.
/// Stops missing from the matrix are measured on demand by [`DistanceMatrix::between`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistanceMatrix {
    size: usize,
    distances: Vec<f64>,
    locations: Vec<Coordinate>,
    index: HashMap<String, usize>,
}

impl DistanceMatrix {
    /// Build the full matrix for the given `(id, location)` pairs.
    pub fn new<'a, I>(nodes: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Coordinate)>,
    {
        let mut locations = Vec::new();
        let mut index = HashMap::new();

        for (id, location) in nodes {
            index.entry(id.to_string()).or_insert(locations.len());
            locations.push(location);
        }

        let size = locations.len();
        let mut distances = vec![0.0; size * size];

        for i in 0..size {
            for j in (i + 1)..size {
                let d = haversine_km(locations[i], locations[j]);
                distances[i * size + j] = d;
                distances[j * size + i] = d;
            }
        }

        DistanceMatrix {
            size,
            distances,
            locations,
            index,
        }
    }

    /// Number of nodes covered by the matrix.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Distance in kilometers between two node indices; `0.0` outside the matrix.
    pub fn get(&self, from: usize, to: usize) -> f64 {
        if from < self.size && to < self.size {
            return self.distances[from * self.size + to];
        }

        warn!("Distance lookup outside matrix: {} -> {}", from, to);
        0.0
    }

    /// Distance between two stops identified by id, falling back to their coordinates.
    pub fn between(&self, from: (&str, Coordinate), to: (&str, Coordinate)) -> f64 {
        match (self.index.get(from.0), self.index.get(to.0)) {
            (Some(&i), Some(&j)) => self.get(i, j),
            _ => {
                warn!(
                    "Distance matrix has no entry for {} -> {}, computing on demand",
                    from.0, to.0
                );
                haversine_km(from.1, to.1)
            }
        }
    }

    /// Node index for a stop id.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Location of a node.
    pub fn location(&self, node: usize) -> Option<Coordinate> {
        self.locations.get(node).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = haversine_km(Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 0.0));
        assert!((d - 111.195).abs() < 0.01);
    }

    #[test]
    fn nan_coordinates_degrade_to_zero() {
        let d = haversine_km(Coordinate::new(f64::NAN, 0.0), Coordinate::new(1.0, 0.0));
        assert_eq!(d, 0.0);
    }

    #[test]
    fn travel_time_includes_traffic() {
        let model = TravelModel::default();
        // 40 km at 40 km/h is one hour, times the traffic factor
        assert!((model.travel_time(40.0) - 4500.0).abs() < 1e-9);
    }

    #[test]
    fn service_time_scales_with_demand() {
        let model = TravelModel::default();
        assert!((model.service_time(0.0) - 180.0).abs() < 1e-9);
        assert!((model.service_time(10.0) - 240.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_index_degrades_to_zero() {
        let matrix = DistanceMatrix::new(vec![
            ("depot", Coordinate::new(0.0, 0.0)),
            ("a", Coordinate::new(0.0, 1.0)),
        ]);

        assert!(matrix.get(0, 1) > 0.0);
        assert_eq!(matrix.get(0, 5), 0.0);
        assert_eq!(matrix.get(7, 1), 0.0);
    }

    #[test]
    fn unknown_ids_fall_back_to_haversine() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 1.0);
        let matrix = DistanceMatrix::new(vec![("depot", a)]);

        let d = matrix.between(("depot", a), ("missing", b));
        assert!((d - haversine_km(a, b)).abs() < 1e-12);
    }
}
