//! Or-Opt neighborhood: relocate a run of 1 to 3 consecutive stops
//! elsewhere in the same route.

use super::{LocalSearch, IMPROVEMENT_EPSILON};

/// Longest segment moved as a block.
pub const MAX_SEGMENT_LENGTH: usize = 3;

impl LocalSearch<'_> {
    /// Apply the first improving segment relocation.
    ///
    /// Returns `true` if a move was made.
    pub fn or_opt(&self, sequence: &mut [usize]) -> bool {
        let n = sequence.len();
        if n < 4 {
            return false;
        }

        for length in 1..=MAX_SEGMENT_LENGTH {
            // The segment must leave at least one other stop in the route.
            if length + 3 > n {
                break;
            }

            for from in 1..n - length {
                let to_end = from + length;

                for to in 1..n {
                    // `to` is the index the segment is inserted in front of
                    if to >= from && to <= to_end {
                        continue;
                    }

                    let delta = self.evaluate_or_opt(sequence, from, length, to);
                    if delta < -IMPROVEMENT_EPSILON {
                        Self::apply_or_opt(sequence, from, length, to);
                        return true;
                    }
                }
            }
        }

        false
    }

    fn evaluate_or_opt(&self, sequence: &[usize], from: usize, length: usize, to: usize) -> f64 {
        let prev = sequence[from - 1];
        let first = sequence[from];
        let last = sequence[from + length - 1];
        let next = sequence[from + length];

        let removal_gain =
            self.distance(prev, first) + self.distance(last, next) - self.distance(prev, next);

        let before = sequence[to - 1];
        let after = sequence[to];
        let insertion_cost =
            self.distance(before, first) + self.distance(last, after) - self.distance(before, after);

        insertion_cost - removal_gain
    }

    fn apply_or_opt(sequence: &mut [usize], from: usize, length: usize, to: usize) {
        if to < from {
            sequence[to..from + length].rotate_right(length);
        } else {
            sequence[from..to].rotate_left(length);
        }
    }
}
