use std::ops::Range;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, TimestampNanosecondArray, UInt32Array};
use arrow::compute::kernels::sort::{lexsort_to_indices, SortColumn, SortOptions};
use arrow::compute::take;

use crate::common::error::{AggWindowError, Result};
use crate::interval::{Bounds, Time, Window};

/// Rows of one chunk ordered by time, restricted to the global bounds.
#[derive(Debug, Clone)]
pub struct SortedChunk {
    pub times: Vec<Time>,
    pub values: ArrayRef,
}

/// Orders `values` by `times` (stable, nulls last), drops rows with a null time and rows
/// outside `bounds`.
pub fn sort_by_time(times: &TimestampNanosecondArray, values: &ArrayRef, bounds: &Bounds) -> Result<SortedChunk> {
    if times.len() != values.len() {
        return Err(AggWindowError::internal(format!(
            "time column has {} rows but value column has {}",
            times.len(),
            values.len()
        )));
    }

    let already_sorted = times.null_count() == 0 && times.values().windows(2).all(|w| w[0] <= w[1]);
    let (sorted_times, sorted_values) = if already_sorted {
        (times.values().to_vec(), values.clone())
    } else {
        let sort_options = SortOptions {
            descending: false,
            nulls_first: false,
        };
        let row_pos: ArrayRef = Arc::new(UInt32Array::from_iter_values(0..times.len() as u32));
        let ts_col = SortColumn {
            values: Arc::new(times.clone()),
            options: Some(sort_options),
        };
        let pos_col = SortColumn {
            values: row_pos,
            options: Some(sort_options),
        };
        let indices = lexsort_to_indices(&[ts_col, pos_col], None)?;
        let valid = times.len() - times.null_count();
        let indices = indices.slice(0, valid);

        let taken = take(times, &indices, None)?;
        let taken = taken
            .as_any()
            .downcast_ref::<TimestampNanosecondArray>()
            .ok_or_else(|| AggWindowError::internal("sorted time column lost its type"))?;
        (taken.values().to_vec(), take(values.as_ref(), &indices, None)?)
    };

    let lo = sorted_times.partition_point(|t| *t < bounds.start);
    let hi = sorted_times.partition_point(|t| *t < bounds.stop);
    Ok(SortedChunk {
        times: sorted_times[lo..hi].to_vec(),
        values: sorted_values.slice(lo, hi - lo),
    })
}

/// Distinct windows touched by a chunk, ascending by start, each clipped to the global bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowBoundaries {
    pub start: Vec<Time>,
    pub stop: Vec<Time>,
}

impl WindowBoundaries {
    pub fn len(&self) -> usize {
        self.start.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_empty()
    }

    pub fn get(&self, i: usize) -> Bounds {
        Bounds::new(self.start[i], self.stop[i])
    }

    /// Representative instant of window `i`.
    pub fn time(&self, i: usize, use_start: bool) -> Time {
        if use_start {
            self.start[i]
        } else {
            self.stop[i]
        }
    }

    fn push(&mut self, b: Bounds) {
        self.start.push(b.start);
        self.stop.push(b.stop);
    }
}

fn capacity_hint(window: &Window, times: &[Time]) -> usize {
    let (Some(first), Some(last)) = (times.first(), times.last()) else {
        return 0;
    };
    if window.is_infinite() {
        return 1;
    }
    let every = window.every().nanoseconds();
    if window.calendar_months() || every <= 0 {
        return times.len();
    }
    let span = (*last as i128 - *first as i128).max(0);
    let windows = span / every as i128 + 2;
    windows.min(times.len() as i128) as usize
}

/// Maps ascending `times` onto every window they fall in.
///
/// `times` must be sorted: a window whose start is at or before the last recorded start
/// has already been emitted for an earlier timestamp.
pub fn scan_windows(window: &Window, times: &[Time], bounds: &Bounds) -> WindowBoundaries {
    debug_assert!(
        times.windows(2).all(|w| w[0] <= w[1]),
        "scan_windows requires ascending timestamps"
    );

    let mut out = WindowBoundaries {
        start: Vec::with_capacity(capacity_hint(window, times)),
        stop: Vec::with_capacity(capacity_hint(window, times)),
    };
    let mut latest: Option<Time> = None;
    let mut found: Vec<Bounds> = Vec::new();

    for &t in times {
        found.clear();
        let mut found_latest: Option<Time> = None;
        let mut b = window.get_latest_bounds(t);
        while b.contains(t) {
            if latest.is_some_and(|l| b.start() <= l) {
                break;
            }
            if found_latest.is_none() {
                found_latest = Some(b.start());
            }
            let clipped = b.bounds.intersect(bounds);
            if !clipped.is_empty() {
                found.push(clipped);
            }
            b = window.prev_bounds(&b);
        }
        for clipped in found.iter().rev() {
            out.push(*clipped);
        }
        if found_latest.is_some() {
            latest = found_latest;
        }
    }
    out
}

/// For each boundary, the contiguous row range of `times` it covers.
pub fn window_ranges(times: &[Time], boundaries: &WindowBoundaries) -> Vec<Range<usize>> {
    let mut ranges = Vec::with_capacity(boundaries.len());
    let mut lo = 0;
    let mut hi = 0;
    for i in 0..boundaries.len() {
        let b = boundaries.get(i);
        while lo < times.len() && times[lo] < b.start {
            lo += 1;
        }
        hi = hi.max(lo);
        while hi < times.len() && times[hi] < b.stop {
            hi += 1;
        }
        ranges.push(lo..hi);
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Duration;
    use arrow::array::Int64Array;

    fn window(every: i64, period: i64) -> Window {
        Window::new(Duration::from_nanos(every), Duration::from_nanos(period), Duration::ZERO).unwrap()
    }

    #[test]
    fn test_sort_trims_nulls_and_bounds() {
        let times = TimestampNanosecondArray::from(vec![Some(15), None, Some(0), Some(25), Some(5), Some(-1)]);
        let values: ArrayRef = Arc::new(Int64Array::from(vec![1, 2, 3, 4, 5, 6]));
        let sorted = sort_by_time(&times, &values, &Bounds::new(0, 20)).unwrap();
        assert_eq!(sorted.times, vec![0, 5, 15]);
        let vals = sorted.values.as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(vals.values().to_vec(), vec![3, 5, 1]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_times() {
        let times = TimestampNanosecondArray::from(vec![10, 0, 10, 10]);
        let values: ArrayRef = Arc::new(Int64Array::from(vec![1, 2, 3, 4]));
        let sorted = sort_by_time(&times, &values, &Bounds::new(0, 100)).unwrap();
        let vals = sorted.values.as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(vals.values().to_vec(), vec![2, 1, 3, 4]);
    }

    #[test]
    fn test_scan_tumbling() {
        let boundaries = scan_windows(&window(10, 0), &[0, 5, 10, 15], &Bounds::new(0, 20));
        assert_eq!(boundaries.start, vec![0, 10]);
        assert_eq!(boundaries.stop, vec![10, 20]);
        let ranges = window_ranges(&[0, 5, 10, 15], &boundaries);
        assert_eq!(ranges, vec![0..2, 2..4]);
    }

    #[test]
    fn test_scan_skips_gaps() {
        let times = [1, 2, 45, 47, 90];
        let boundaries = scan_windows(&window(10, 0), &times, &Bounds::new(0, 100));
        assert_eq!(boundaries.start, vec![0, 40, 90]);
        assert_eq!(window_ranges(&times, &boundaries), vec![0..2, 2..4, 4..5]);
    }

    #[test]
    fn test_scan_sliding() {
        let times = [5, 12, 25];
        let boundaries = scan_windows(&window(10, 20), &times, &Bounds::new(-100, 100));
        assert_eq!(boundaries.start, vec![-10, 0, 10, 20]);
        assert_eq!(boundaries.stop, vec![10, 20, 30, 40]);
        assert_eq!(window_ranges(&times, &boundaries), vec![0..1, 0..2, 1..3, 2..3]);
    }

    #[test]
    fn test_scan_clips_to_bounds() {
        let times = [5, 12];
        let boundaries = scan_windows(&window(10, 20), &times, &Bounds::new(0, 15));
        assert_eq!(boundaries.start, vec![0, 0, 10]);
        assert_eq!(boundaries.stop, vec![10, 15, 15]);
    }

    #[test]
    fn test_scan_underlapping_drops_uncovered_times() {
        let times = [0, 7, 12];
        let boundaries = scan_windows(&window(10, 5), &times, &Bounds::new(0, 100));
        assert_eq!(boundaries.start, vec![0, 10]);
        assert_eq!(window_ranges(&times, &boundaries), vec![0..1, 2..3]);
    }

    #[test]
    fn test_scan_infinite() {
        let boundaries = scan_windows(&Window::infinite(), &[3, 4, 9], &Bounds::new(0, 10));
        assert_eq!(boundaries.start, vec![0]);
        assert_eq!(boundaries.stop, vec![10]);
    }

    #[test]
    fn test_scan_empty() {
        assert!(scan_windows(&window(10, 0), &[], &Bounds::new(0, 10)).is_empty());
    }
}
