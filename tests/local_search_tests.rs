//! Tests for the intra-route local search neighbourhoods.

use fleet_routing::config::Config;
use fleet_routing::local_search::utils::{sequence_distance, with_depot};
use fleet_routing::local_search::LocalSearch;
use fleet_routing::problem::{Depot, Problem, Stop, TimeWindow, Vehicle};
use fleet_routing::solution::Route;
use proptest::prelude::*;

/// Degrees of longitude at the equator spanning `km` kilometers.
fn km(km: f64) -> f64 {
    km / 111.195
}

/// Creates a problem with eight stops scattered around the depot.
fn create_test_problem() -> Problem {
    let depot = Depot::new("depot", 0.0, 0.0);
    let positions = [
        (3.0, 1.0),
        (-2.0, 4.0),
        (5.0, -3.0),
        (1.0, 6.0),
        (-4.0, -2.0),
        (6.0, 2.0),
        (-1.0, -5.0),
        (2.0, 3.0),
    ];
    let stops = positions
        .iter()
        .enumerate()
        .map(|(i, &(x, y))| Stop::new(format!("s{}", i + 1), km(y), km(x), 1.0))
        .collect();

    Problem::new(depot, stops, vec![Vehicle::new("van", 100.0)])
}

#[test]
fn test_two_opt_removes_crossing() {
    let problem = create_test_problem();
    let local_search = LocalSearch::new(&problem);

    // s1 (3,1) and s6 (6,2) sit east, s2 (-2,4) and s5 (-4,-2) west.
    let mut sequence = with_depot(&[1, 2, 6, 5]);
    let before = sequence_distance(&sequence, &problem);

    assert!(local_search.two_opt(&mut sequence));
    assert!(sequence_distance(&sequence, &problem) < before);
    assert_eq!(sequence.first(), Some(&0));
    assert_eq!(sequence.last(), Some(&0));
}

#[test]
fn test_improve_is_monotonic_and_idempotent() {
    let problem = create_test_problem();
    let local_search = LocalSearch::new(&problem);

    let mut sequence = with_depot(&[1, 2, 3, 4, 5, 6, 7, 8]);
    let before = sequence_distance(&sequence, &problem);

    local_search.improve(&mut sequence);
    let after = sequence_distance(&sequence, &problem);
    assert!(after <= before + 1e-9);

    let snapshot = sequence.clone();
    assert!(!local_search.improve(&mut sequence));
    assert_eq!(sequence, snapshot);
}

#[test]
fn test_enhanced_improve_keeps_every_stop() {
    let problem = create_test_problem();
    let local_search = LocalSearch::new(&problem);

    let mut sequence = with_depot(&[8, 3, 5, 1, 7, 2, 6, 4]);
    let before = sequence_distance(&sequence, &problem);
    local_search.improve_enhanced(&mut sequence);

    assert!(sequence_distance(&sequence, &problem) <= before + 1e-9);

    let mut inner = sequence[1..sequence.len() - 1].to_vec();
    inner.sort_unstable();
    assert_eq!(inner, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    assert!(!local_search.improve_enhanced(&mut sequence));
}

#[test]
fn test_or_opt_relocates_a_misplaced_stop() {
    let depot = Depot::new("depot", 0.0, 0.0);
    let stops = vec![
        Stop::new("a", 0.0, km(1.0), 1.0),
        Stop::new("b", 0.0, km(2.0), 1.0),
        Stop::new("c", 0.0, km(3.0), 1.0),
        Stop::new("d", 0.0, km(4.0), 1.0),
    ];
    let problem = Problem::new(depot, stops, vec![Vehicle::new("van", 10.0)]);
    let local_search = LocalSearch::new(&problem);

    // d out of place: 0 -> a -> d -> b -> c -> 0
    let mut sequence = with_depot(&[1, 4, 2, 3]);
    let before = sequence_distance(&sequence, &problem);

    assert!(local_search.or_opt(&mut sequence));
    assert!(sequence_distance(&sequence, &problem) < before);
}

#[test]
fn test_short_routes_are_left_alone() {
    let problem = create_test_problem();
    let local_search = LocalSearch::new(&problem);

    let mut sequence = with_depot(&[3]);
    assert!(!local_search.improve(&mut sequence));
    assert!(!local_search.improve_enhanced(&mut sequence));
    assert_eq!(sequence, vec![0, 3, 0]);
}

#[test]
fn test_improve_route_keeps_feasible_routes_feasible() {
    let depot = Depot::new("depot", 0.0, 0.0);
    let stops = vec![
        Stop::new("east", 0.0, km(5.0), 1.0),
        Stop::new("west", 0.0, km(-5.0), 1.0)
            .with_time_window(TimeWindow::new(6.0 * 3600.0, 6.0 * 3600.0 + 40.0 * 60.0)),
        Stop::new("far-east", 0.0, km(6.0), 1.0)
            .with_time_window(TimeWindow::new(7.0 * 3600.0, 12.0 * 3600.0)),
    ];
    let problem = Problem::new(depot, stops, vec![Vehicle::new("van", 10.0)]);
    let config = Config::default();

    let mut route = Route::from_sequence(&[1, 2, 3], &problem, &config, true);
    assert!(route.feasible);
    let before = route.distance;

    let local_search = LocalSearch::new(&problem);
    local_search.improve_route(&mut route, &config, true, false);

    assert!(route.feasible);
    assert!(route.distance <= before + 1e-9);
    assert_eq!(route.stop_count(), 3);
}

proptest! {
    #[test]
    fn prop_local_search_never_lengthens_a_route(order in Just((1..=8usize).collect::<Vec<_>>()).prop_shuffle()) {
        let problem = create_test_problem();
        let local_search = LocalSearch::new(&problem);

        let mut sequence = with_depot(&order);
        let before = sequence_distance(&sequence, &problem);

        local_search.improve(&mut sequence);
        let after = sequence_distance(&sequence, &problem);
        prop_assert!(after <= before + 1e-9);

        let snapshot = sequence.clone();
        prop_assert!(!local_search.improve(&mut sequence));
        prop_assert_eq!(sequence, snapshot);
    }
}
