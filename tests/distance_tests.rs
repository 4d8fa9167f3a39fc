//! Tests for the distance and travel-time model.

use fleet_routing::distance::{haversine_km, Coordinate, DistanceMatrix, TravelModel};
use proptest::prelude::*;

fn create_test_matrix() -> DistanceMatrix {
    DistanceMatrix::new(vec![
        ("depot", Coordinate::new(52.52, 13.405)),
        ("a", Coordinate::new(52.53, 13.41)),
        ("b", Coordinate::new(52.50, 13.38)),
        ("c", Coordinate::new(52.55, 13.45)),
    ])
}

#[test]
fn test_matrix_is_symmetric_with_zero_diagonal() {
    let matrix = create_test_matrix();

    for i in 0..matrix.size() {
        assert_eq!(matrix.get(i, i), 0.0);
        for j in 0..matrix.size() {
            assert_eq!(matrix.get(i, j), matrix.get(j, i));
            assert!(matrix.get(i, j) >= 0.0);
        }
    }
}

#[test]
fn test_lookup_by_id_matches_index() {
    let matrix = create_test_matrix();
    let a = matrix.location(1).unwrap();
    let c = matrix.location(3).unwrap();

    assert_eq!(matrix.index_of("c"), Some(3));
    assert_eq!(matrix.between(("a", a), ("c", c)), matrix.get(1, 3));
}

#[test]
fn test_unknown_stop_falls_back_to_coordinates() {
    let matrix = create_test_matrix();
    let depot = matrix.location(0).unwrap();
    let outside = Coordinate::new(52.60, 13.50);

    let d = matrix.between(("depot", depot), ("elsewhere", outside));
    assert_eq!(d, haversine_km(depot, outside));
    assert!(d > 0.0);
}

#[test]
fn test_invalid_geometry_degrades_to_zero() {
    let good = Coordinate::new(10.0, 10.0);
    let bad = Coordinate::new(f64::NAN, 10.0);

    assert_eq!(haversine_km(good, bad), 0.0);
    assert_eq!(haversine_km(bad, good), 0.0);
}

#[test]
fn test_travel_and_service_time_defaults() {
    let model = TravelModel::default();

    // 40 km at 40 km/h is one hour, stretched by the traffic factor.
    assert!((model.travel_time(40.0) - 4500.0).abs() < 1e-9);
    assert_eq!(model.travel_time(0.0), 0.0);

    // Three minutes base plus six seconds per unit.
    assert!((model.service_time(0.0) - 180.0).abs() < 1e-9);
    assert!((model.service_time(10.0) - 240.0).abs() < 1e-9);
}

proptest! {
    #[test]
    fn prop_haversine_is_symmetric(
        lat1 in -89.0f64..89.0,
        lon1 in -179.0f64..179.0,
        lat2 in -89.0f64..89.0,
        lon2 in -179.0f64..179.0,
    ) {
        let a = Coordinate::new(lat1, lon1);
        let b = Coordinate::new(lat2, lon2);

        prop_assert_eq!(haversine_km(a, b), haversine_km(b, a));
        prop_assert_eq!(haversine_km(a, a), 0.0);
        prop_assert!(haversine_km(a, b) >= 0.0);
    }
}
