//! 2-Opt neighborhood for local search (intra-route).

use super::{LocalSearch, IMPROVEMENT_EPSILON};

impl LocalSearch<'_> {
    /// Apply improving segment reversals until none is left.
    pub fn two_opt(&self, sequence: &mut [usize]) -> bool {
        let mut improvement = false;

        while self.two_opt_pass(sequence) {
            improvement = true;
        }

        improvement
    }

    /// One sweep over all segment pairs, applying every improving reversal found.
    fn two_opt_pass(&self, sequence: &mut [usize]) -> bool {
        let n = sequence.len();
        if n < 4 {
            return false;
        }

        let mut improvement = false;

        for i in 1..n - 2 {
            for k in (i + 1)..n - 1 {
                let delta = self.evaluate_two_opt(sequence, i, k);

                if delta < -IMPROVEMENT_EPSILON {
                    sequence[i..=k].reverse();
                    improvement = true;
                }
            }
        }

        improvement
    }

    /// Distance change from reversing `sequence[i..=k]`.
    fn evaluate_two_opt(&self, sequence: &[usize], i: usize, k: usize) -> f64 {
        let before = sequence[i - 1];
        let first = sequence[i];
        let last = sequence[k];
        let after = sequence[k + 1];

        let old_cost = self.distance(before, first) + self.distance(last, after);
        let new_cost = self.distance(before, last) + self.distance(first, after);

        new_cost - old_cost
    }
}
