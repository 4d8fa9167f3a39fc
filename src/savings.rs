//! Savings-merge construction (Clarke-Wright) and its weighted variant.
//!
//! Every stop starts on its own depot round trip. Pairs are visited by
//! decreasing saving `d(0,i) + d(0,j) - d(i,j)` and two routes are joined
//! when the pair sits at facing ends, the combined load fits the largest
//! vehicle and the merged schedule stays feasible.

use itertools::Itertools;
use log::{info, warn};
use std::f64::consts::PI;

use crate::assignment::assign_vehicles;
use crate::config::{Config, Heuristic};
use crate::local_search::LocalSearch;
use crate::problem::{Problem, DEPOT};
use crate::solution::{Route, Solution, CAPACITY_EPSILON};

/// Which savings formula and post-pass to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavingsVariant {
    /// Plain savings, 2-opt/3-opt post-pass
    Basic,
    /// Weighted savings, 2-opt/Or-opt post-pass
    Enhanced,
}

impl SavingsVariant {
    pub fn heuristic(&self) -> Heuristic {
        match self {
            SavingsVariant::Basic => Heuristic::SavingsMerge,
            SavingsVariant::Enhanced => Heuristic::EnhancedSavings,
        }
    }
}

/// A candidate merge of the routes holding `i` and `j`.
#[derive(Debug, Clone, Copy)]
pub struct Saving {
    pub i: usize,
    pub j: usize,
    pub value: f64,
}

/// A route under construction.
struct Partial {
    customers: Vec<usize>,
    load: f64,
    /// Infeasible on its own; never merged
    locked: bool,
}

/// Savings-merge construction.
pub struct Savings<'a> {
    problem: &'a Problem,
    config: &'a Config,
    use_time_windows: bool,
    variant: SavingsVariant,
}

impl<'a> Savings<'a> {
    pub fn new(problem: &'a Problem, config: &'a Config, use_time_windows: bool) -> Self {
        Savings {
            problem,
            config,
            use_time_windows,
            variant: SavingsVariant::Basic,
        }
    }

    /// Select the savings formula.
    pub fn with_variant(mut self, variant: SavingsVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Build, improve and assign routes.
    pub fn solve(&self) -> Solution {
        let heuristic = self.variant.heuristic();
        if self.problem.is_degenerate() {
            return Solution::new(heuristic);
        }

        info!(
            "Running {} on {} stops",
            heuristic,
            self.problem.customer_count()
        );

        let mut routes: Vec<Route> = self
            .merge_routes()
            .into_iter()
            .map(|customers| {
                Route::from_sequence(&customers, self.problem, self.config, self.use_time_windows)
            })
            .collect();

        if self.config.local_search {
            let local_search = LocalSearch::new(self.problem);
            let enhanced = self.variant == SavingsVariant::Enhanced;
            for route in routes.iter_mut() {
                local_search.improve_route(route, self.config, self.use_time_windows, enhanced);
            }
        }

        assign_vehicles(&mut routes, &self.problem.slots);

        let solution = Solution::from_routes(heuristic, routes, self.problem);
        if !solution.is_feasible() {
            warn!(
                "{} returned {} infeasible routes",
                heuristic,
                solution.infeasible_count()
            );
        }
        info!(
            "{} finished: {} routes, {:.2} km",
            heuristic,
            solution.routes.len(),
            solution.distance
        );

        solution
    }

    /// Run the greedy merge phase and return each route's customer order.
    pub fn merge_routes(&self) -> Vec<Vec<usize>> {
        let max_capacity = self.problem.max_capacity();

        let mut partials: Vec<Option<Partial>> = self
            .problem
            .customers()
            .map(|node| {
                let load = self.problem.demand(node);
                let single = self.schedule(&[node]);
                Some(Partial {
                    customers: vec![node],
                    load,
                    locked: !single.feasible || load > max_capacity + CAPACITY_EPSILON,
                })
            })
            .collect();

        // Node `n` starts in partial route `n - 1`.
        let mut route_of: Vec<usize> = (0..self.problem.node_count())
            .map(|node| node.saturating_sub(1))
            .collect();

        for saving in self.savings() {
            let (ri, rj) = (route_of[saving.i], route_of[saving.j]);
            if ri == rj {
                continue;
            }

            let merged = match (&partials[ri], &partials[rj]) {
                (Some(a), Some(b)) if !a.locked && !b.locked => {
                    if a.load + b.load > max_capacity + CAPACITY_EPSILON {
                        continue;
                    }
                    match Self::join(a, b, saving.i, saving.j) {
                        Some(customers) => Partial {
                            customers,
                            load: a.load + b.load,
                            locked: false,
                        },
                        None => continue,
                    }
                }
                _ => continue,
            };

            if !self.schedule(&merged.customers).feasible {
                continue;
            }

            for &node in &merged.customers {
                route_of[node] = ri;
            }
            partials[ri] = Some(merged);
            partials[rj] = None;
        }

        partials
            .into_iter()
            .flatten()
            .map(|partial| partial.customers)
            .collect()
    }

    /// Concatenate `a` and `b` if `i` and `j` sit at facing ends.
    fn join(a: &Partial, b: &Partial, i: usize, j: usize) -> Option<Vec<usize>> {
        let (a_first, a_last) = (a.customers.first()?, a.customers.last()?);
        let (b_first, b_last) = (b.customers.first()?, b.customers.last()?);

        if *a_last == i && *b_first == j {
            Some([a.customers.as_slice(), b.customers.as_slice()].concat())
        } else if *b_last == j && *a_first == i {
            Some([b.customers.as_slice(), a.customers.as_slice()].concat())
        } else {
            None
        }
    }

    fn schedule(&self, customers: &[usize]) -> Route {
        Route::from_sequence(customers, self.problem, self.config, self.use_time_windows)
    }

    /// All pair savings, best first. Equal values keep pair order.
    pub fn savings(&self) -> Vec<Saving> {
        let mut savings: Vec<Saving> = self
            .problem
            .customers()
            .tuple_combinations()
            .map(|(i, j)| Saving {
                i,
                j,
                value: match self.variant {
                    SavingsVariant::Basic => self.basic_saving(i, j),
                    SavingsVariant::Enhanced => self.enhanced_saving(i, j),
                },
            })
            .collect();

        savings.sort_by(|a, b| b.value.total_cmp(&a.value));
        savings
    }

    fn basic_saving(&self, i: usize, j: usize) -> f64 {
        let p = self.problem;
        p.distance(DEPOT, i) + p.distance(DEPOT, j) - p.distance(i, j)
    }

    /// Saving weighted by angular continuity around the depot, capacity
    /// compatibility, demand urgency and pair distance.
    fn enhanced_saving(&self, i: usize, j: usize) -> f64 {
        let p = self.problem;
        let depot = p.location(DEPOT);

        let angle_i = depot.angle_to(&p.location(i));
        let angle_j = depot.angle_to(&p.location(j));
        let diff = (angle_i - angle_j).abs();
        let continuity = 1.0 - diff.min(2.0 * PI - diff) / PI;

        let combined = p.demand(i) + p.demand(j);
        let max_capacity = p.max_capacity();

        let compatibility = if combined <= max_capacity {
            1.0
        } else {
            (max_capacity / combined).max(0.1)
        };

        let urgency = if max_capacity > 0.0 {
            (1.0 + combined / max_capacity * 0.2).min(1.2)
        } else {
            1.0
        };

        // Pairs more than 50 km apart get the minimum weight.
        let efficiency = (1.0 - p.distance(i, j) / 50.0).max(0.8);

        self.basic_saving(i, j) * (1.0 + continuity * 0.15) * compatibility * urgency * efficiency
    }
}
