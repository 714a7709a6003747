use std::fmt;

use crate::common::error::{AggWindowError, Result};
use crate::interval::bounds::Bounds;
use crate::interval::duration::{add_duration, months_since_zero, Duration, Time, EPOCH, MAX_TIME, MIN_TIME};

/// Bounds of the `index`-th window. The index lets neighbours be recomputed from the
/// anchor instead of shifting an already day-clamped date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBounds {
    pub bounds: Bounds,
    index: i64,
}

impl WindowBounds {
    pub fn start(&self) -> Time {
        self.bounds.start
    }

    pub fn stop(&self) -> Time {
        self.bounds.stop
    }

    pub fn index(&self) -> i64 {
        self.index
    }

    pub fn contains(&self, t: Time) -> bool {
        self.bounds.contains(t)
    }
}

/// Generates the sequence of windows described by `every`, `period` and `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    every: Duration,
    period: Duration,
    offset: Duration,
    zero: Time,
    zero_months: i64,
}

impl Window {
    pub fn new(every: Duration, period: Duration, offset: Duration) -> Result<Self> {
        if every.is_infinite() {
            return Ok(Self::infinite());
        }
        if every.is_zero() {
            return Err(AggWindowError::invalid("duration used as an interval cannot be zero"));
        }
        if every.is_mixed() {
            return Err(AggWindowError::invalid("cannot mix month and nanosecond units in window every"));
        }
        if every.is_negative() {
            return Err(AggWindowError::invalid("duration used as an interval cannot be negative"));
        }
        let period = if period.is_zero() { every } else { period };
        if !period.is_positive() {
            return Err(AggWindowError::invalid("window period must be positive"));
        }
        // Reduced modulo `every` so window indexes stay within i64.
        let offset = if !every.months_only() && offset.months() == 0 {
            Duration::from_nanos(offset.nanoseconds().rem_euclid(every.nanoseconds()))
        } else {
            offset
        };
        let zero = add_duration(EPOCH, offset);
        Ok(Self {
            every,
            period,
            offset,
            zero,
            zero_months: months_since_zero(zero),
        })
    }

    /// A single window spanning all of time.
    pub fn infinite() -> Self {
        Self {
            every: Duration::INFINITE,
            period: Duration::INFINITE,
            offset: Duration::ZERO,
            zero: EPOCH,
            zero_months: 0,
        }
    }

    pub fn every(&self) -> Duration {
        self.every
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn offset(&self) -> Duration {
        self.offset
    }

    pub fn is_infinite(&self) -> bool {
        self.every.is_infinite()
    }

    pub fn calendar_months(&self) -> bool {
        self.every.months_only()
    }

    /// The window with the greatest start not after `t`. Unless the period is shorter
    /// than `every`, it contains `t`; earlier windows may contain it too when sliding.
    pub fn get_latest_bounds(&self, t: Time) -> WindowBounds {
        if self.is_infinite() {
            return WindowBounds {
                bounds: Bounds::new(MIN_TIME, MAX_TIME),
                index: 0,
            };
        }

        let mut index = if self.calendar_months() {
            (months_since_zero(t) - self.zero_months).div_euclid(self.every.months())
        } else {
            let delta = t as i128 - self.zero as i128;
            let q = delta.div_euclid(self.every.nanoseconds() as i128);
            i64::try_from(q).unwrap_or(if q < 0 { i64::MIN } else { i64::MAX })
        };

        // The estimate can be off by one around day clamping and month offsets.
        while index > i64::MIN && self.start_at(index) > t {
            index -= 1;
        }
        while index < i64::MAX {
            let next = self.start_at(index + 1);
            if next > t || next == self.start_at(index) {
                break;
            }
            index += 1;
        }
        self.bounds_at(index)
    }

    pub fn prev_bounds(&self, b: &WindowBounds) -> WindowBounds {
        if self.is_infinite() {
            return WindowBounds {
                bounds: Bounds::new(MIN_TIME, MIN_TIME),
                index: -1,
            };
        }
        self.bounds_at(b.index.saturating_sub(1))
    }

    pub fn next_bounds(&self, b: &WindowBounds) -> WindowBounds {
        if self.is_infinite() {
            return WindowBounds {
                bounds: Bounds::new(MAX_TIME, MAX_TIME),
                index: 1,
            };
        }
        self.bounds_at(b.index.saturating_add(1))
    }

    /// Every window overlapping `bounds`, in ascending start order. Windows are not clipped.
    pub fn overlapping(&self, bounds: &Bounds) -> Vec<WindowBounds> {
        let mut out = Vec::new();
        if bounds.is_empty() {
            return out;
        }
        if self.is_infinite() {
            out.push(self.get_latest_bounds(bounds.start));
            return out;
        }

        let mut b = self.get_latest_bounds(bounds.start);
        while b.stop() > bounds.start {
            let prev = self.prev_bounds(&b);
            if prev.start() == b.start() {
                break;
            }
            b = prev;
        }
        b = self.next_bounds(&b);
        while b.start() < bounds.stop {
            if b.bounds.overlaps(bounds) {
                out.push(b);
            }
            let next = self.next_bounds(&b);
            if next.start() == b.start() {
                break;
            }
            b = next;
        }
        out
    }

    /// Exact start of a nanosecond window, before clamping to the representable range.
    fn nanos_start(&self, index: i64) -> Option<i128> {
        if self.calendar_months() || self.offset.months() != 0 {
            return None;
        }
        Some(self.zero as i128 + self.every.nanoseconds() as i128 * index as i128)
    }

    fn start_at(&self, index: i64) -> Time {
        match self.nanos_start(index) {
            Some(start) => clamp_time(start),
            None => add_duration(EPOCH, self.every.mul(index).add(self.offset)),
        }
    }

    fn bounds_at(&self, index: i64) -> WindowBounds {
        let (start, stop) = match self.nanos_start(index) {
            Some(start) if self.period.months() == 0 => (
                clamp_time(start),
                clamp_time(start + self.period.nanoseconds() as i128),
            ),
            _ => {
                let start = self.start_at(index);
                (start, add_duration(start, self.period))
            }
        };
        WindowBounds {
            bounds: Bounds::new(start, stop.max(start)),
            index,
        }
    }
}

fn clamp_time(t: i128) -> Time {
    t.clamp(MIN_TIME as i128, MAX_TIME as i128) as Time
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            return write!(f, "window(every: inf)");
        }
        write!(f, "window(every: {}, period: {}, offset: {})", self.every, self.period, self.offset)
    }
}
