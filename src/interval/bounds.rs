use std::fmt;

use serde::{Deserialize, Serialize};

use crate::interval::duration::Time;

/// Half-open interval `[start, stop)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub start: Time,
    pub stop: Time,
}

impl Bounds {
    pub fn new(start: Time, stop: Time) -> Self {
        debug_assert!(start <= stop, "bounds start {} after stop {}", start, stop);
        Self { start, stop }
    }

    pub fn contains(&self, t: Time) -> bool {
        self.start <= t && t < self.stop
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.stop
    }

    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.start < other.stop && other.start < self.stop
    }

    /// The common part of both intervals; empty (start == stop) when they are disjoint.
    pub fn intersect(&self, other: &Bounds) -> Bounds {
        let start = self.start.max(other.start);
        let stop = self.stop.min(other.stop);
        if start > stop {
            return Bounds { start, stop: start };
        }
        Bounds { start, stop }
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.stop)
    }
}
