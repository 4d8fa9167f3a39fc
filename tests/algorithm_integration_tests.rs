//! End-to-end runs of every heuristic through the public entry points.

use std::collections::HashSet;

use fleet_routing::config::{AntColonyParams, GeneticParams};
use fleet_routing::{
    optimize, CancellationToken, Config, Depot, Heuristic, OptimizeError, OptimizeOptions, Problem,
    RouteOptimizer, Solution, Stop, TimeWindow, Vehicle,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const ALL: [Heuristic; 6] = [
    Heuristic::SavingsMerge,
    Heuristic::EnhancedSavings,
    Heuristic::NearestNeighbor,
    Heuristic::Genetic,
    Heuristic::AntColony,
    Heuristic::Remote,
];

/// Creates `count` random stops within roughly 10 km of a depot in Berlin.
fn create_random_stops(count: usize, seed: u64) -> (Depot, Vec<Stop>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let depot = Depot::new("depot", 52.52, 13.405);

    let stops = (0..count)
        .map(|i| {
            let stop = Stop::new(
                format!("stop-{}", i),
                52.52 + rng.gen_range(-0.08..0.08),
                13.405 + rng.gen_range(-0.12..0.12),
                rng.gen_range(1..=8) as f64,
            );
            if i % 3 == 0 {
                let open = rng.gen_range(7..12) as f64 * 3600.0;
                stop.with_time_window(TimeWindow::new(open, open + 3.0 * 3600.0))
            } else {
                stop
            }
        })
        .collect();

    (depot, stops)
}

fn create_test_vehicles() -> Vec<Vehicle> {
    vec![
        Vehicle::new("van", 30.0).with_count(3),
        Vehicle::new("truck", 60.0).with_count(1),
    ]
}

fn create_test_config() -> Config {
    Config::default()
        .with_seed(42)
        .with_genetic(GeneticParams {
            max_population: 16,
            max_generations: 20,
            ..GeneticParams::default()
        })
        .with_ant_colony(AntColonyParams {
            ants: 8,
            iterations: 15,
            ..AntColonyParams::default()
        })
}

/// Every stop appears at most once and every assigned route fits its vehicle.
fn assert_valid(solution: &Solution, stops: &[Stop]) {
    let mut seen = HashSet::new();
    for route in &solution.routes {
        assert!(route.stops.first().unwrap().is_depot());
        assert!(route.stops.last().unwrap().is_depot());
        for stop in route.stops.iter().filter(|s| !s.is_depot()) {
            assert!(seen.insert(stop.stop_id.clone()), "{} served twice", stop.stop_id);
        }
        if let Some(slot) = &route.slot {
            assert!(route.load <= slot.capacity + 1e-9 || !route.feasible);
        }
    }

    for id in &solution.unserved {
        assert!(!seen.contains(id));
    }
    assert_eq!(seen.len() + solution.unserved.len(), stops.len());
}

#[test]
fn test_every_heuristic_produces_a_valid_solution() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (depot, stops) = create_random_stops(25, 7);
    let vehicles = create_test_vehicles();
    let config = create_test_config();

    for heuristic in ALL {
        for use_time_windows in [false, true] {
            let options = OptimizeOptions::new(heuristic).with_time_windows(use_time_windows);
            let solution = optimize(&vehicles, &stops, &depot, options, &config).unwrap();

            assert_eq!(solution.heuristic, heuristic);
            assert!(!solution.is_empty(), "{} returned no routes", heuristic);
            assert_valid(&solution, &stops);
        }
    }
}

#[test]
fn test_slot_bound_heuristics_never_overload() {
    let (depot, stops) = create_random_stops(30, 11);
    let vehicles = create_test_vehicles();
    let config = create_test_config();

    for heuristic in [Heuristic::NearestNeighbor, Heuristic::Genetic, Heuristic::AntColony] {
        let solution = optimize(&vehicles, &stops, &depot, OptimizeOptions::new(heuristic), &config).unwrap();

        let mut used = HashSet::new();
        for route in &solution.routes {
            let slot = route.slot.as_ref().unwrap();
            assert!(route.load <= slot.capacity + 1e-9);
            assert!(used.insert((slot.vehicle_id.clone(), slot.index)));
        }
    }
}

#[test]
fn test_comparison_picks_highest_coverage() {
    let (depot, stops) = create_random_stops(20, 3);
    let problem = Problem::new(depot, stops, create_test_vehicles());
    let optimizer = RouteOptimizer::new(problem, create_test_config());

    let comparison = optimizer.compare(false);

    assert_eq!(comparison.outcomes.len(), Heuristic::COMPARISON.len());
    for (outcome, heuristic) in comparison.outcomes.iter().zip(Heuristic::COMPARISON) {
        assert_eq!(outcome.heuristic, heuristic);
        assert!(outcome.result.is_ok());
        assert!(outcome.metrics.is_some());
    }

    let best = comparison.best_solution().unwrap();
    let best_coverage = best.coverage(&optimizer.problem);
    for outcome in &comparison.outcomes {
        let solution = outcome.result.as_ref().unwrap();
        let coverage = solution.coverage(&optimizer.problem);
        assert!(coverage <= best_coverage);
        if coverage == best_coverage {
            assert!(best.distance <= solution.distance);
        }
    }

    // No remote endpoint is configured.
    let remote = &comparison.outcomes[4];
    assert!(remote.result.as_ref().unwrap().fallback);
}

#[test]
fn test_cancelled_optimizer_reports_cancellation() {
    let (depot, stops) = create_random_stops(10, 5);
    let problem = Problem::new(depot, stops, create_test_vehicles());
    let token = CancellationToken::new();
    let optimizer = RouteOptimizer::new(problem, create_test_config()).with_cancellation(token.clone());

    token.cancel();

    let result = optimizer.run(OptimizeOptions::new(Heuristic::Genetic));
    assert!(matches!(result, Err(OptimizeError::Cancelled { .. })));

    let comparison = optimizer.compare(false);
    assert!(comparison.outcomes.iter().all(|o| o.result.is_err()));
    assert!(comparison.best.is_none());
}

#[test]
fn test_empty_inputs_give_empty_solutions() {
    let depot = Depot::new("depot", 52.52, 13.405);
    let config = create_test_config();

    for heuristic in ALL {
        let solution = optimize(
            &create_test_vehicles(),
            &[],
            &depot,
            OptimizeOptions::new(heuristic),
            &config,
        )
        .unwrap();
        assert!(solution.is_empty());
        assert!(solution.unserved.is_empty());
    }

    let (_, stops) = create_random_stops(4, 1);
    let solution = optimize(&[], &stops, &depot, OptimizeOptions::default(), &config).unwrap();
    assert!(solution.is_empty());
    assert_eq!(solution.unserved.len(), 4);
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let (depot, stops) = create_random_stops(15, 21);
    let vehicles = create_test_vehicles();
    let config = create_test_config();

    for heuristic in [Heuristic::Genetic, Heuristic::AntColony] {
        let options = OptimizeOptions::new(heuristic);
        let a = optimize(&vehicles, &stops, &depot, options, &config).unwrap();
        let b = optimize(&vehicles, &stops, &depot, options, &config).unwrap();
        assert_eq!(a.distance, b.distance);
    }
}
