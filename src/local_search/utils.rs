//! Utility functions for local search operations.

use crate::problem::{Problem, DEPOT};

/// Length of a node sequence, summing consecutive legs.
pub fn sequence_distance(sequence: &[usize], problem: &Problem) -> f64 {
    sequence
        .windows(2)
        .map(|pair| problem.distance(pair[0], pair[1]))
        .sum()
}

/// Wrap customers in depot visits.
pub fn with_depot(customers: &[usize]) -> Vec<usize> {
    let mut sequence = Vec::with_capacity(customers.len() + 2);
    sequence.push(DEPOT);
    sequence.extend_from_slice(customers);
    sequence.push(DEPOT);
    sequence
}
