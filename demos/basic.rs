//! Basic example of using the fleet routing library.
//!
//! Generates a random delivery day around a depot and either runs one
//! heuristic or compares all of them:
//!
//! ```text
//! cargo run --example basic -- --stops 40 --heuristic genetic --time-windows
//! cargo run --example basic -- --compare
//! ```

use clap::{Parser, ValueEnum};
use fleet_routing::config::{Config, Heuristic, OptimizeOptions, RemoteSolverConfig};
use fleet_routing::problem::{Depot, Problem, Stop, TimeWindow, Vehicle};
use fleet_routing::utils::{format_clock, format_duration};
use fleet_routing::{RouteOptimizer, Solution};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum HeuristicArg {
    Savings,
    EnhancedSavings,
    NearestNeighbor,
    Genetic,
    AntColony,
    Remote,
}

impl From<HeuristicArg> for Heuristic {
    fn from(arg: HeuristicArg) -> Self {
        match arg {
            HeuristicArg::Savings => Heuristic::SavingsMerge,
            HeuristicArg::EnhancedSavings => Heuristic::EnhancedSavings,
            HeuristicArg::NearestNeighbor => Heuristic::NearestNeighbor,
            HeuristicArg::Genetic => Heuristic::Genetic,
            HeuristicArg::AntColony => Heuristic::AntColony,
            HeuristicArg::Remote => Heuristic::Remote,
        }
    }
}

#[derive(Debug, Parser)]
#[command(about = "Plan delivery routes for a random problem")]
struct Args {
    /// Number of stops to generate
    #[arg(long, default_value_t = 30)]
    stops: usize,

    /// Number of vans in the fleet
    #[arg(long, default_value_t = 4)]
    vehicles: usize,

    /// Capacity of each van
    #[arg(long, default_value_t = 40.0)]
    capacity: f64,

    #[arg(long, value_enum, default_value_t = HeuristicArg::Savings)]
    heuristic: HeuristicArg,

    /// Enforce stop time windows
    #[arg(long)]
    time_windows: bool,

    /// Run every heuristic and report the best
    #[arg(long)]
    compare: bool,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Endpoint of an external solver service
    #[arg(long)]
    remote_url: Option<String>,

    /// Print the solution as JSON
    #[arg(long)]
    json: bool,
}

fn create_problem(args: &Args) -> Problem {
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let depot = Depot::new("depot", 51.5074, -0.1278).with_name("Central Depot");

    let stops = (0..args.stops)
        .map(|i| {
            let stop = Stop::new(
                format!("stop-{}", i + 1),
                51.5074 + rng.gen_range(-0.1..0.1),
                -0.1278 + rng.gen_range(-0.15..0.15),
                rng.gen_range(1..=10) as f64,
            );
            if rng.gen_bool(0.3) {
                let open = rng.gen_range(7..14) as f64 * 3600.0;
                stop.with_time_window(TimeWindow::new(open, open + 2.0 * 3600.0))
            } else {
                stop
            }
        })
        .collect();

    let vehicles = vec![Vehicle::new("van", args.capacity).with_count(args.vehicles)];
    Problem::new(depot, stops, vehicles)
}

fn print_solution(solution: &Solution, problem: &Problem) {
    println!("{} ({:.2} km)", solution.heuristic, solution.distance);
    if solution.fallback {
        println!("  (savings fallback)");
    }

    for (i, route) in solution.routes.iter().enumerate() {
        let stops: Vec<String> = route
            .stops
            .iter()
            .map(|s| format!("{}@{}", s.stop_id, format_clock(s.service_start())))
            .collect();
        println!(
            "  Route {} [{}] load {:.0}, {:.2} km{}: {}",
            i + 1,
            route.vehicle_name(),
            route.load,
            route.distance,
            if route.feasible { "" } else { " (infeasible)" },
            stops.join(" -> ")
        );
    }

    println!(
        "  Coverage: {:.1}% ({} unserved)",
        solution.coverage(problem),
        solution.unserved.len()
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let problem = create_problem(&args);
    let mut config = Config::new().with_seed(args.seed);
    if let Some(url) = &args.remote_url {
        config = config.with_remote(RemoteSolverConfig::new(url.clone()));
    }

    println!(
        "Routing {} stops with {} vehicles",
        problem.customer_count(),
        problem.slots.len()
    );
    let optimizer = RouteOptimizer::new(problem, config);

    if args.compare {
        let comparison = optimizer.compare(args.time_windows);

        for outcome in &comparison.outcomes {
            match (&outcome.result, &outcome.metrics) {
                (Ok(_), Some(metrics)) => println!(
                    "{:<32} {:>9.2} km {:>6.1}% coverage {:>5.1}% utilization in {}",
                    outcome.heuristic.name(),
                    metrics.total_distance,
                    metrics.coverage_percentage,
                    metrics.vehicle_utilization,
                    format_duration(outcome.elapsed)
                ),
                (Err(err), _) => println!("{:<32} failed: {}", outcome.heuristic.name(), err),
                _ => {}
            }
        }

        if let Some(best) = comparison.best_solution() {
            println!();
            print_solution(best, &optimizer.problem);
        }
        return Ok(());
    }

    let options = OptimizeOptions::new(args.heuristic.into()).with_time_windows(args.time_windows);

    let start_time = Instant::now();
    let solution = optimizer.run(options)?;
    println!("Search completed in {}", format_duration(start_time.elapsed()));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&solution)?);
    } else {
        print_solution(&solution, &optimizer.problem);
    }

    Ok(())
}
