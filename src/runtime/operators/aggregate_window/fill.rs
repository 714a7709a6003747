use crate::common::error::{AggWindowError, Result};
use crate::interval::{Bounds, Time, Window};
use crate::runtime::operators::aggregate_window::merge::merge_values;

/// Materializes every window overlapping the global bounds, observed or not.
#[derive(Debug, Clone)]
pub struct EmptyWindowFiller<'a> {
    window: &'a Window,
    bounds: Bounds,
    use_start: bool,
}

impl<'a> EmptyWindowFiller<'a> {
    pub fn new(window: &'a Window, bounds: Bounds, use_start: bool) -> Self {
        Self { window, bounds, use_start }
    }

    fn representative(&self, b: &Bounds) -> Time {
        if self.use_start {
            b.start
        } else {
            b.stop
        }
    }

    /// Representative instants of all windows in bounds, ascending and distinct.
    pub fn window_times(&self) -> Vec<Time> {
        let mut times: Vec<Time> = self
            .window
            .overlapping(&self.bounds)
            .iter()
            .map(|b| self.representative(&b.bounds.intersect(&self.bounds)))
            .collect();
        times.dedup();
        times
    }

    /// Lays the observed windows over the full axis; windows without data get `None`.
    pub fn fill<P: Clone>(&self, observed_ts: &[Time], observed: &[P]) -> Result<(Vec<Time>, Vec<Option<P>>)> {
        let axis = self.window_times();
        let none_ts: [Time; 0] = [];
        let none: [P; 0] = [];
        let values = merge_values(&axis, (observed_ts, observed), (&none_ts, &none), |a, _| a.clone());
        let matched = values.iter().filter(|v| v.is_some()).count();
        if matched != observed.len() {
            return Err(AggWindowError::internal(format!(
                "{} observed windows fall outside the windows of {} in {}",
                observed.len() - matched,
                self.window,
                self.bounds
            )));
        }
        Ok((axis, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Duration;

    fn window(every: i64, period: i64, offset: i64) -> Window {
        Window::new(Duration::from_nanos(every), Duration::from_nanos(period), Duration::from_nanos(offset)).unwrap()
    }

    #[test]
    fn test_window_times_tumbling() {
        let w = window(10, 0, 0);
        let filler = EmptyWindowFiller::new(&w, Bounds::new(0, 50), false);
        assert_eq!(filler.window_times(), vec![10, 20, 30, 40, 50]);
        let filler = EmptyWindowFiller::new(&w, Bounds::new(0, 50), true);
        assert_eq!(filler.window_times(), vec![0, 10, 20, 30, 40]);
    }

    #[test]
    fn test_window_times_unaligned_bounds() {
        let w = window(10, 0, 0);
        let filler = EmptyWindowFiller::new(&w, Bounds::new(5, 32), false);
        assert_eq!(filler.window_times(), vec![10, 20, 30, 32]);
        let filler = EmptyWindowFiller::new(&w, Bounds::new(5, 32), true);
        assert_eq!(filler.window_times(), vec![5, 10, 20, 30]);
    }

    #[test]
    fn test_window_times_offset() {
        let w = window(10, 0, 3);
        let filler = EmptyWindowFiller::new(&w, Bounds::new(0, 30), false);
        assert_eq!(filler.window_times(), vec![3, 13, 23, 30]);
    }

    #[test]
    fn test_window_times_infinite() {
        let w = Window::infinite();
        let filler = EmptyWindowFiller::new(&w, Bounds::new(0, 30), false);
        assert_eq!(filler.window_times(), vec![30]);
    }

    #[test]
    fn test_fill_marks_missing_windows() {
        let w = window(10, 0, 0);
        let filler = EmptyWindowFiller::new(&w, Bounds::new(0, 40), false);
        let (axis, values) = filler.fill(&[20, 40], &[3i64, 1]).unwrap();
        assert_eq!(axis, vec![10, 20, 30, 40]);
        assert_eq!(values, vec![None, Some(3), None, Some(1)]);
    }

    #[test]
    fn test_fill_rejects_foreign_windows() {
        let w = window(10, 0, 0);
        let filler = EmptyWindowFiller::new(&w, Bounds::new(0, 40), false);
        let err = filler.fill(&[15], &[1i64]).unwrap_err();
        assert_eq!(err.code(), crate::common::error::Code::Internal);
    }
}
