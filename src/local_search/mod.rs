//! Intra-route local search: 2-opt, bounded 3-opt and Or-opt.
//!
//! Every neighbourhood works on a node sequence that starts and ends at the
//! depot and compares geometric distance only. Callers reschedule the route
//! afterwards, since a shorter order can break time windows.

pub mod or_opt;
pub mod three_opt;
pub mod two_opt;
pub mod utils;

use crate::config::Config;
use crate::problem::Problem;
use crate::solution::Route;

/// Minimum gain for a move to count as an improvement.
pub const IMPROVEMENT_EPSILON: f64 = 1e-9;

/// Drives the neighbourhoods over single routes.
pub struct LocalSearch<'a> {
    problem: &'a Problem,
    /// Upper bound on 3-opt / Or-opt rounds per route
    max_rounds: usize,
}

impl<'a> LocalSearch<'a> {
    /// Create a new local search instance.
    pub fn new(problem: &'a Problem) -> Self {
        LocalSearch {
            problem,
            max_rounds: 1000,
        }
    }

    /// 2-opt to convergence, then bounded 3-opt moves each followed by 2-opt.
    ///
    /// Returns `true` if the sequence changed.
    pub fn improve(&self, sequence: &mut [usize]) -> bool {
        if sequence.len() < 4 {
            return false;
        }

        let mut improved = self.two_opt(sequence);

        for _ in 0..self.max_rounds {
            if !self.three_opt(sequence) {
                break;
            }
            improved = true;
            self.two_opt(sequence);
        }

        improved
    }

    /// 2-opt followed by Or-opt relocation until neither improves.
    pub fn improve_enhanced(&self, sequence: &mut [usize]) -> bool {
        if sequence.len() < 4 {
            return false;
        }

        let mut improved = self.two_opt(sequence);

        for _ in 0..self.max_rounds {
            if !self.or_opt(sequence) {
                break;
            }
            improved = true;
            self.two_opt(sequence);
        }

        improved
    }

    /// Improve a route's order and reschedule it.
    ///
    /// A feasible route only accepts a new order that keeps it feasible.
    /// Returns `true` if the route was changed.
    pub fn improve_route(
        &self,
        route: &mut Route,
        config: &Config,
        use_time_windows: bool,
        enhanced: bool,
    ) -> bool {
        if route.stop_count() < 2 {
            return false;
        }

        let mut sequence = route.nodes();
        let changed = if enhanced {
            self.improve_enhanced(&mut sequence)
        } else {
            self.improve(&mut sequence)
        };

        if !changed {
            return false;
        }

        let mut candidate = route.clone();
        candidate.resequence(
            &sequence[1..sequence.len() - 1],
            self.problem,
            config,
            use_time_windows,
        );

        if route.feasible && !candidate.feasible {
            return false;
        }

        *route = candidate;
        true
    }

    pub(crate) fn distance(&self, from: usize, to: usize) -> f64 {
        self.problem.distance(from, to)
    }
}
