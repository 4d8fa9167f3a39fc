//! Bounded 3-Opt neighborhood (intra-route).
//!
//! Three cut points split the sequence into `A B C D`; only the five
//! recombinations below are tried besides the identity.

use super::{LocalSearch, IMPROVEMENT_EPSILON};

/// How the middle segments `B` and `C` are put back together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconnection {
    /// `A B' C D`
    ReverseFirst,
    /// `A B C' D`
    ReverseSecond,
    /// `A C B D`
    Swap,
    /// `A C' B D`
    SwapReverse,
    /// `A B' C' D`
    ReverseBoth,
}

impl Reconnection {
    pub const ALL: [Reconnection; 5] = [
        Reconnection::ReverseFirst,
        Reconnection::ReverseSecond,
        Reconnection::Swap,
        Reconnection::SwapReverse,
        Reconnection::ReverseBoth,
    ];
}

impl LocalSearch<'_> {
    /// Apply the first improving 3-opt move found, choosing the best
    /// reconnection for those cut points. Returns `false` at a local optimum.
    pub fn three_opt(&self, sequence: &mut [usize]) -> bool {
        let n = sequence.len();
        if n < 4 {
            return false;
        }

        for i in 1..n - 2 {
            for j in (i + 1)..n - 1 {
                for k in (j + 1)..n {
                    let best = Reconnection::ALL
                        .iter()
                        .map(|&r| (r, self.evaluate_three_opt(sequence, i, j, k, r)))
                        .min_by(|a, b| a.1.total_cmp(&b.1));

                    if let Some((reconnection, delta)) = best {
                        if delta < -IMPROVEMENT_EPSILON {
                            Self::apply_three_opt(sequence, i, j, k, reconnection);
                            return true;
                        }
                    }
                }
            }
        }

        false
    }

    /// Distance change of a reconnection. Segment interiors keep their
    /// length under reversal, so only the three junctions matter.
    fn evaluate_three_opt(
        &self,
        sequence: &[usize],
        i: usize,
        j: usize,
        k: usize,
        reconnection: Reconnection,
    ) -> f64 {
        let a_end = sequence[i - 1];
        let b_start = sequence[i];
        let b_end = sequence[j - 1];
        let c_start = sequence[j];
        let c_end = sequence[k - 1];
        let d_start = sequence[k];

        let d = |x: usize, y: usize| self.distance(x, y);

        let old_cost = d(a_end, b_start) + d(b_end, c_start) + d(c_end, d_start);
        let new_cost = match reconnection {
            Reconnection::ReverseFirst => d(a_end, b_end) + d(b_start, c_start) + d(c_end, d_start),
            Reconnection::ReverseSecond => d(a_end, b_start) + d(b_end, c_end) + d(c_start, d_start),
            Reconnection::Swap => d(a_end, c_start) + d(c_end, b_start) + d(b_end, d_start),
            Reconnection::SwapReverse => d(a_end, c_end) + d(c_start, b_start) + d(b_end, d_start),
            Reconnection::ReverseBoth => d(a_end, b_end) + d(b_start, c_end) + d(c_start, d_start),
        };

        new_cost - old_cost
    }

    fn apply_three_opt(
        sequence: &mut [usize],
        i: usize,
        j: usize,
        k: usize,
        reconnection: Reconnection,
    ) {
        let b: Vec<usize> = sequence[i..j].to_vec();
        let c: Vec<usize> = sequence[j..k].to_vec();
        let rev = |segment: &[usize]| segment.iter().rev().copied().collect::<Vec<_>>();

        let middle: Vec<usize> = match reconnection {
            Reconnection::ReverseFirst => [rev(&b), c].concat(),
            Reconnection::ReverseSecond => [b, rev(&c)].concat(),
            Reconnection::Swap => [c, b].concat(),
            Reconnection::SwapReverse => [rev(&c), b].concat(),
            Reconnection::ReverseBoth => [rev(&b), rev(&c)].concat(),
        };

        sequence[i..k].copy_from_slice(&middle);
    }
}
