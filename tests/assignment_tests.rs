//! Tests for best-fit vehicle assignment.

use fleet_routing::assignment::assign_vehicles;
use fleet_routing::config::Config;
use fleet_routing::problem::{Depot, Problem, Stop, Vehicle};
use fleet_routing::solution::Route;

fn create_test_problem(vehicles: Vec<Vehicle>) -> Problem {
    let depot = Depot::new("depot", 0.0, 0.0);
    let stops = vec![
        Stop::new("a", 0.0, 0.01, 8.0),
        Stop::new("b", 0.01, 0.0, 5.0),
        Stop::new("c", -0.01, 0.0, 3.0),
        Stop::new("d", 0.0, -0.01, 4.0),
    ];
    Problem::new(depot, stops, vehicles)
}

fn single_stop_routes(nodes: &[usize], problem: &Problem) -> Vec<Route> {
    let config = Config::default();
    nodes
        .iter()
        .map(|&node| Route::from_sequence(&[node], problem, &config, false))
        .collect()
}

#[test]
fn test_routes_get_tightest_fitting_vehicle() {
    let problem = create_test_problem(vec![
        Vehicle::new("small", 3.0),
        Vehicle::new("large", 10.0),
        Vehicle::new("medium", 5.0),
    ]);
    // Loads 3, 8 and 5, deliberately out of order.
    let mut routes = single_stop_routes(&[3, 1, 2], &problem);

    let assigned = assign_vehicles(&mut routes, &problem.slots);

    assert_eq!(assigned, 3);
    assert_eq!(routes[0].vehicle_name(), "small");
    assert_eq!(routes[1].vehicle_name(), "large");
    assert_eq!(routes[2].vehicle_name(), "medium");
    assert!(routes.iter().all(|r| r.feasible));
}

#[test]
fn test_route_without_fitting_vehicle_stays_unassigned() {
    let problem = create_test_problem(vec![Vehicle::new("medium", 5.0), Vehicle::new("small", 3.0)]);
    let mut routes = single_stop_routes(&[1, 3], &problem);

    let assigned = assign_vehicles(&mut routes, &problem.slots);

    assert_eq!(assigned, 1);
    assert!(!routes[0].is_assigned());
    assert_eq!(routes[0].vehicle_name(), "Unassigned");
    assert!(!routes[0].feasible);
    assert!(routes[1].feasible);
    // The lighter route takes the tightest slot, not the largest.
    assert_eq!(routes[1].vehicle_name(), "small");
}

#[test]
fn test_held_slots_are_not_reused() {
    let problem = create_test_problem(vec![Vehicle::new("large", 10.0), Vehicle::new("medium", 5.0)]);
    let mut routes = single_stop_routes(&[2, 4], &problem);
    routes[0].assign(problem.slots[1].clone());

    let assigned = assign_vehicles(&mut routes, &problem.slots);

    assert_eq!(assigned, 1);
    assert_eq!(routes[0].vehicle_name(), "medium");
    assert_eq!(routes[1].vehicle_name(), "large");
}

#[test]
fn test_copies_of_one_vehicle_are_distinct_slots() {
    let problem = create_test_problem(vec![Vehicle::new("van", 10.0).with_count(2)]);
    let mut routes = single_stop_routes(&[1, 2, 3], &problem);

    let assigned = assign_vehicles(&mut routes, &problem.slots);

    assert_eq!(assigned, 2);
    let slots: Vec<_> = routes.iter().filter_map(|r| r.slot.as_ref()).collect();
    assert_eq!(slots.len(), 2);
    assert!(!slots[0].same_slot(slots[1]));
    // The lightest route is the one left over.
    assert!(!routes[2].is_assigned());
}
