//! Tests for nearest-neighbor construction.

use fleet_routing::config::{Config, Heuristic};
use fleet_routing::nearest_neighbor::NearestNeighbor;
use fleet_routing::problem::{Depot, Problem, Stop, TimeWindow, Vehicle};

/// Degrees of latitude spanning `km` kilometers.
fn km(km: f64) -> f64 {
    km / 111.195
}

/// Creates three colinear stops 1, 2 and 3 km north of the depot, listed out of order.
fn create_colinear_problem(capacity: f64) -> Problem {
    let depot = Depot::new("depot", 0.0, 0.0);
    let stops = vec![
        Stop::new("three", km(3.0), 0.0, 1.0),
        Stop::new("one", km(1.0), 0.0, 1.0),
        Stop::new("two", km(2.0), 0.0, 1.0),
    ];
    Problem::new(depot, stops, vec![Vehicle::new("van", capacity)])
}

#[test]
fn test_visits_colinear_stops_by_increasing_distance() {
    let problem = create_colinear_problem(10.0);
    let config = Config::default();

    let solution = NearestNeighbor::new(&problem, &config, false).solve();

    assert_eq!(solution.heuristic, Heuristic::NearestNeighbor);
    assert_eq!(solution.routes.len(), 1);

    let ids: Vec<&str> = solution.routes[0]
        .stops
        .iter()
        .map(|s| s.stop_id.as_str())
        .collect();
    assert_eq!(ids, vec!["depot", "one", "two", "three", "depot"]);
}

#[test]
fn test_each_slot_is_filled_up_to_capacity() {
    let depot = Depot::new("depot", 0.0, 0.0);
    let stops = (1..=6)
        .map(|i| Stop::new(format!("s{}", i), km(i as f64), 0.0, 3.0))
        .collect();
    let problem = Problem::new(depot, stops, vec![Vehicle::new("van", 6.0).with_count(3)]);
    let config = Config::default();

    let solution = NearestNeighbor::new(&problem, &config, false).solve();

    assert_eq!(solution.routes.len(), 3);
    assert!(solution.unserved.is_empty());
    for route in &solution.routes {
        assert!(route.is_assigned());
        assert!(route.load <= 6.0 + 1e-9);
        assert_eq!(route.stop_count(), 2);
    }
}

#[test]
fn test_leftover_stops_are_reported_unserved() {
    let problem = create_colinear_problem(2.0);
    let config = Config::default();

    let solution = NearestNeighbor::new(&problem, &config, false).solve();

    assert_eq!(solution.routes.len(), 1);
    assert_eq!(solution.routes[0].customers(), vec![2, 3]);
    assert_eq!(solution.unserved, vec!["three".to_string()]);
}

#[test]
fn test_closed_windows_are_skipped() {
    let depot = Depot::new("depot", 0.0, 0.0);
    let stops = vec![
        // Already closed when the vehicle leaves the depot.
        Stop::new("closed", km(1.0), 0.0, 1.0)
            .with_time_window(TimeWindow::new(3600.0, 2.0 * 3600.0)),
        Stop::new("open", km(2.0), 0.0, 1.0)
            .with_time_window(TimeWindow::new(8.0 * 3600.0, 10.0 * 3600.0)),
    ];
    let problem = Problem::new(depot, stops, vec![Vehicle::new("van", 10.0)]);
    let config = Config::default();

    let solution = NearestNeighbor::new(&problem, &config, true).solve();

    assert_eq!(solution.routes.len(), 1);
    assert_eq!(solution.routes[0].customers(), vec![2]);
    assert_eq!(solution.unserved, vec!["closed".to_string()]);

    // The vehicle waits for the window to open.
    let open = &solution.routes[0].stops[1];
    assert!(open.wait_time > 0.0);
    assert!((open.service_start() - 8.0 * 3600.0).abs() < 1e-6);
    assert!(solution.is_feasible());
}

#[test]
fn test_windows_are_ignored_when_disabled() {
    let depot = Depot::new("depot", 0.0, 0.0);
    let stops = vec![Stop::new("closed", km(1.0), 0.0, 1.0)
        .with_time_window(TimeWindow::new(3600.0, 2.0 * 3600.0))];
    let problem = Problem::new(depot, stops, vec![Vehicle::new("van", 10.0)]);
    let config = Config::default();

    let solution = NearestNeighbor::new(&problem, &config, false).solve();

    assert!(solution.unserved.is_empty());
    assert_eq!(solution.routes[0].stops[1].wait_time, 0.0);
}
