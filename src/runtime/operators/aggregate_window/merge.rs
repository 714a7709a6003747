use std::cmp::Ordering;

use crate::interval::Time;

/// Sorted union of two ascending, duplicate-free sequences.
pub fn merge_boundary_times(prev: &[Time], next: &[Time]) -> Vec<Time> {
    let mut merged = Vec::with_capacity(prev.len().max(next.len()));
    let (mut i, mut j) = (0, 0);
    while i < prev.len() && j < next.len() {
        match prev[i].cmp(&next[j]) {
            Ordering::Less => {
                merged.push(prev[i]);
                i += 1;
            }
            Ordering::Greater => {
                merged.push(next[j]);
                j += 1;
            }
            Ordering::Equal => {
                merged.push(prev[i]);
                i += 1;
                j += 1;
            }
        }
    }
    merged.extend_from_slice(&prev[i..]);
    merged.extend_from_slice(&next[j..]);
    merged
}

/// Where a merged-axis position came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matched {
    Both(usize, usize),
    Prev(usize),
    Next(usize),
    Neither,
}

/// Walks `merged` with one cursor into each input axis. Both inputs must be subsequences
/// of `merged` for every position to be matched.
pub fn merge_join(merged: &[Time], prev: &[Time], next: &[Time]) -> Vec<Matched> {
    let (mut i, mut j) = (0, 0);
    merged
        .iter()
        .map(|t| {
            let in_prev = i < prev.len() && prev[i] == *t;
            let in_next = j < next.len() && next[j] == *t;
            let m = match (in_prev, in_next) {
                (true, true) => Matched::Both(i, j),
                (true, false) => Matched::Prev(i),
                (false, true) => Matched::Next(j),
                (false, false) => Matched::Neither,
            };
            if in_prev {
                i += 1;
            }
            if in_next {
                j += 1;
            }
            m
        })
        .collect()
}

/// Values along `merged`: combined where both inputs have the position, carried through
/// where one does, `None` where neither does.
pub fn merge_values<P: Clone>(
    merged: &[Time],
    prev: (&[Time], &[P]),
    next: (&[Time], &[P]),
    combine: impl Fn(&P, &P) -> P,
) -> Vec<Option<P>> {
    let (prev_ts, prev_vals) = prev;
    let (next_ts, next_vals) = next;
    debug_assert_eq!(prev_ts.len(), prev_vals.len());
    debug_assert_eq!(next_ts.len(), next_vals.len());
    merge_join(merged, prev_ts, next_ts)
        .into_iter()
        .map(|m| match m {
            Matched::Both(i, j) => Some(combine(&prev_vals[i], &next_vals[j])),
            Matched::Prev(i) => Some(prev_vals[i].clone()),
            Matched::Next(j) => Some(next_vals[j].clone()),
            Matched::Neither => None,
        })
        .collect()
}
