//! Configuration parameters for the routing heuristics.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::distance::TravelModel;

/// Start of the default depot operating window (06:00), seconds from midnight.
pub const DEFAULT_DEPOT_OPEN: f64 = 6.0 * 3600.0;
/// End of the default depot operating window (18:00), seconds from midnight.
pub const DEFAULT_DEPOT_CLOSE: f64 = 18.0 * 3600.0;

/// Construction heuristic selected for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Heuristic {
    /// Clarke-Wright savings with a 2-opt/3-opt post-pass
    #[serde(rename = "clarke-wright")]
    SavingsMerge,
    /// Weighted savings with a 2-opt/Or-opt post-pass
    EnhancedSavings,
    NearestNeighbor,
    Genetic,
    AntColony,
    /// External solver service, falling back to savings on failure
    Remote,
}

impl Heuristic {
    /// Heuristics run by comparison mode, in reporting order.
    pub const COMPARISON: [Heuristic; 5] = [
        Heuristic::SavingsMerge,
        Heuristic::NearestNeighbor,
        Heuristic::Genetic,
        Heuristic::AntColony,
        Heuristic::Remote,
    ];

    /// Human readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Heuristic::SavingsMerge => "Clarke-Wright Savings",
            Heuristic::EnhancedSavings => "Enhanced Clarke-Wright Savings",
            Heuristic::NearestNeighbor => "Nearest Neighbor",
            Heuristic::Genetic => "Genetic Algorithm",
            Heuristic::AntColony => "Ant Colony Optimization",
            Heuristic::Remote => "Remote Solver",
        }
    }
}

impl fmt::Display for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-run options chosen by the caller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OptimizeOptions {
    /// Enforce stop time windows
    pub use_time_windows: bool,
    /// Heuristic to run
    pub heuristic: Heuristic,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        OptimizeOptions {
            use_time_windows: false,
            heuristic: Heuristic::SavingsMerge,
        }
    }
}

impl OptimizeOptions {
    /// Options for the given heuristic without time windows.
    pub fn new(heuristic: Heuristic) -> Self {
        OptimizeOptions {
            heuristic,
            ..OptimizeOptions::default()
        }
    }

    /// Enable or disable time-window enforcement.
    pub fn with_time_windows(mut self, enabled: bool) -> Self {
        self.use_time_windows = enabled;
        self
    }
}

/// Parameters of the population-based genetic search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticParams {
    pub min_population: usize,
    pub max_population: usize,
    pub min_generations: usize,
    pub max_generations: usize,
    /// Probability that an offspring is mutated
    pub mutation_rate: f64,
    /// Probability that an offspring is produced by crossover rather than cloning
    pub crossover_rate: f64,
    /// Number of individuals competing in a tournament
    pub tournament_size: usize,
}

impl Default for GeneticParams {
    fn default() -> Self {
        GeneticParams {
            min_population: 10,
            max_population: 30,
            min_generations: 15,
            max_generations: 50,
            mutation_rate: 0.1,
            crossover_rate: 0.8,
            tournament_size: 3,
        }
    }
}

impl GeneticParams {
    /// Population size for a problem with `stops` customers.
    pub fn population_size(&self, stops: usize) -> usize {
        (stops * 2).clamp(self.min_population, self.max_population.max(self.min_population))
    }

    /// Number of generations for a problem with `stops` customers.
    pub fn generations(&self, stops: usize) -> usize {
        (stops * 2).clamp(self.min_generations, self.max_generations.max(self.min_generations))
    }
}

/// Parameters of the ant-colony construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AntColonyParams {
    pub ants: usize,
    pub iterations: usize,
    /// Pheromone exponent
    pub alpha: f64,
    /// Inverse-distance exponent
    pub beta: f64,
    /// Evaporation rate
    pub rho: f64,
    /// Deposit constant
    pub q: f64,
    pub initial_pheromone: f64,
    /// Lower bound kept after evaporation
    pub min_pheromone: f64,
}

impl Default for AntColonyParams {
    fn default() -> Self {
        AntColonyParams {
            ants: 20,
            iterations: 100,
            alpha: 1.0,
            beta: 2.0,
            rho: 0.1,
            q: 100.0,
            initial_pheromone: 1.0,
            min_pheromone: 1e-6,
        }
    }
}

/// Connection settings for the external solver service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSolverConfig {
    /// Endpoint receiving the optimization request
    pub url: String,
    /// Deadline for the whole HTTP exchange
    pub timeout: Duration,
    /// Search time granted to the remote solver, in seconds
    pub time_limit_seconds: u64,
    /// Ask the service for road geometry
    pub include_geometry: bool,
}

impl RemoteSolverConfig {
    /// Settings for the given endpoint with default limits.
    pub fn new(url: impl Into<String>) -> Self {
        RemoteSolverConfig {
            url: url.into(),
            timeout: Duration::from_secs(60),
            time_limit_seconds: 30,
            include_geometry: true,
        }
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Configuration shared by every heuristic of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Speed, traffic and service-time parameters
    pub travel: TravelModel,
    /// Depot opening time used when the depot carries no window
    pub depot_open: f64,
    /// Depot closing time used when the depot carries no window
    pub depot_close: f64,
    /// Run local search on savings routes
    pub local_search: bool,
    pub genetic: GeneticParams,
    pub ant_colony: AntColonyParams,
    /// Seed for the randomized heuristics; `None` seeds from entropy
    pub seed: Option<u64>,
    /// External solver, if one is available
    pub remote: Option<RemoteSolverConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            travel: TravelModel::default(),
            depot_open: DEFAULT_DEPOT_OPEN,
            depot_close: DEFAULT_DEPOT_CLOSE,
            local_search: true,
            genetic: GeneticParams::default(),
            ant_colony: AntColonyParams::default(),
            seed: None,
            remote: None,
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Config::default()
    }

    /// Set the travel model.
    pub fn with_travel_model(mut self, travel: TravelModel) -> Self {
        self.travel = travel;
        self
    }

    /// Set the average speed in km/h.
    pub fn with_average_speed(mut self, kmh: f64) -> Self {
        self.travel.average_speed_kmh = kmh;
        self
    }

    /// Set the traffic multiplier.
    pub fn with_traffic_factor(mut self, factor: f64) -> Self {
        self.travel.traffic_factor = factor;
        self
    }

    /// Set the default depot operating window in seconds from midnight.
    pub fn with_depot_hours(mut self, open: f64, close: f64) -> Self {
        self.depot_open = open;
        self.depot_close = close;
        self
    }

    /// Enable or disable the local search post-pass.
    pub fn with_local_search(mut self, enabled: bool) -> Self {
        self.local_search = enabled;
        self
    }

    /// Set the genetic search parameters.
    pub fn with_genetic(mut self, params: GeneticParams) -> Self {
        self.genetic = params;
        self
    }

    /// Set the ant-colony parameters.
    pub fn with_ant_colony(mut self, params: AntColonyParams) -> Self {
        self.ant_colony = params;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the remote solver endpoint.
    pub fn with_remote(mut self, remote: RemoteSolverConfig) -> Self {
        self.remote = Some(remote);
        self
    }
}
