use chrono::{TimeZone, Utc};

use crate::common::error::Code;
use crate::interval::{Bounds, Duration, Time, Window};

const SEC: i64 = 1_000_000_000;
const MIN: i64 = 60 * SEC;
const DAY: i64 = 24 * 60 * MIN;

fn date(y: i32, mo: u32, d: u32) -> Time {
    Utc.with_ymd_and_hms(y, mo, d, 0, 0, 0).unwrap().timestamp_nanos_opt().unwrap()
}

fn ns_window(every: i64, period: i64, offset: i64) -> Window {
    Window::new(Duration::from_nanos(every), Duration::from_nanos(period), Duration::from_nanos(offset)).unwrap()
}

#[test]
fn test_get_latest_bounds_nanoseconds() {
    let cases: Vec<(&str, Window, Time, Bounds)> = vec![
        ("simple", ns_window(5 * MIN, 0, 0), 6 * MIN, Bounds::new(5 * MIN, 10 * MIN)),
        ("with offset", ns_window(5 * MIN, 0, 30 * SEC), 5 * MIN, Bounds::new(30 * SEC, 5 * MIN + 30 * SEC)),
        (
            "negative offset",
            ns_window(5 * MIN, 0, -30 * SEC),
            5 * MIN,
            Bounds::new(4 * MIN + 30 * SEC, 9 * MIN + 30 * SEC),
        ),
        ("offset equal to every", ns_window(5 * MIN, 0, 5 * MIN), 0, Bounds::new(0, 5 * MIN)),
        (
            "underlapping",
            ns_window(2 * MIN, MIN, 30 * SEC),
            3 * MIN,
            Bounds::new(2 * MIN + 30 * SEC, 3 * MIN + 30 * SEC),
        ),
        ("before epoch", ns_window(10, 0, 0), -15, Bounds::new(-20, -10)),
        ("on boundary before epoch", ns_window(10, 0, 0), -10, Bounds::new(-10, 0)),
    ];
    for (name, window, t, expected) in cases {
        assert_eq!(window.get_latest_bounds(t).bounds, expected, "case {}", name);
    }
}

#[test]
fn test_get_latest_bounds_months() {
    let w = Window::new(Duration::from_months(5), Duration::ZERO, Duration::ZERO).unwrap();
    assert!(w.calendar_months());
    assert_eq!(w.get_latest_bounds(date(1970, 1, 1)).bounds, Bounds::new(date(1970, 1, 1), date(1970, 6, 1)));

    let w = Window::new(Duration::from_months(3), Duration::ZERO, Duration::from_months(1)).unwrap();
    assert_eq!(w.get_latest_bounds(date(1970, 1, 1)).bounds, Bounds::new(date(1969, 11, 1), date(1970, 2, 1)));

    let w = Window::new(Duration::from_months(1), Duration::ZERO, Duration::ZERO).unwrap();
    assert_eq!(w.get_latest_bounds(date(2021, 3, 15)).bounds, Bounds::new(date(2021, 3, 1), date(2021, 4, 1)));
}

#[test]
fn test_month_neighbours_are_recomputed_not_shifted() {
    let w = Window::new(Duration::from_months(1), Duration::ZERO, Duration::from_nanos(-DAY)).unwrap();
    let b = w.get_latest_bounds(date(2021, 1, 31));
    assert_eq!(b.bounds, Bounds::new(date(2021, 1, 31), date(2021, 2, 28)));
    let b = w.next_bounds(&b);
    assert_eq!(b.bounds, Bounds::new(date(2021, 2, 28), date(2021, 3, 28)));
    let b = w.next_bounds(&b);
    assert_eq!(b.bounds, Bounds::new(date(2021, 3, 31), date(2021, 4, 30)));
    let b = w.prev_bounds(&w.prev_bounds(&b));
    assert_eq!(b.bounds, Bounds::new(date(2021, 1, 31), date(2021, 2, 28)));
}

#[test]
fn test_sliding_windows_enumerate_backwards() {
    let w = ns_window(MIN, 3 * MIN, 0);
    let t = 5 * MIN + 30 * SEC;
    let mut b = w.get_latest_bounds(t);
    let mut found = Vec::new();
    while b.contains(t) {
        found.push(b.bounds);
        b = w.prev_bounds(&b);
    }
    assert_eq!(
        found,
        vec![
            Bounds::new(5 * MIN, 8 * MIN),
            Bounds::new(4 * MIN, 7 * MIN),
            Bounds::new(3 * MIN, 6 * MIN),
        ]
    );
}

#[test]
fn test_infinite_window() {
    let w = Window::new(Duration::INFINITE, Duration::ZERO, Duration::ZERO).unwrap();
    assert!(w.is_infinite());
    let b = w.get_latest_bounds(42);
    let global = Bounds::new(-100, 100);
    assert_eq!(b.bounds.intersect(&global), global);
    assert!(!w.prev_bounds(&b).contains(42));
}

#[test]
fn test_invalid_windows() {
    let cases = vec![
        (Duration::ZERO, Duration::ZERO, "duration used as an interval cannot be zero"),
        (Duration::new(1, 5), Duration::ZERO, "cannot mix month and nanosecond units in window every"),
        (Duration::from_nanos(-5), Duration::ZERO, "duration used as an interval cannot be negative"),
        (Duration::from_nanos(5), Duration::from_nanos(-5), "window period must be positive"),
    ];
    for (every, period, msg) in cases {
        let err = Window::new(every, period, Duration::ZERO).unwrap_err();
        assert_eq!(err.code(), Code::Invalid);
        assert_eq!(err.to_string(), msg);
    }
}

#[test]
fn test_overlapping_windows() {
    let sliding = ns_window(10, 20, 0);
    let starts: Vec<Time> = sliding.overlapping(&Bounds::new(5, 32)).iter().map(|b| b.start()).collect();
    assert_eq!(starts, vec![-10, 0, 10, 20, 30]);

    let gaps = ns_window(10, 5, 0);
    let found: Vec<Bounds> = gaps.overlapping(&Bounds::new(7, 30)).iter().map(|b| b.bounds).collect();
    assert_eq!(found, vec![Bounds::new(10, 15), Bounds::new(20, 25)]);

    assert!(sliding.overlapping(&Bounds::new(5, 5)).is_empty());
    let inf = Window::infinite().overlapping(&Bounds::new(0, 10));
    assert_eq!(inf.len(), 1);
    assert!(inf[0].contains(0));
}

#[test]
fn test_latest_bounds_near_time_limits() {
    let w = ns_window(1, 0, -2);
    assert_eq!(w, ns_window(1, 0, 0));
    let latest = w.get_latest_bounds(i64::MAX - 1);
    assert_eq!(latest.bounds, Bounds::new(i64::MAX - 1, i64::MAX));

    let w = ns_window(10, 0, -3);
    let latest = w.get_latest_bounds(i64::MAX - 1);
    assert!(latest.contains(i64::MAX - 1));
    let earliest = w.get_latest_bounds(i64::MIN + 1);
    assert!(earliest.contains(i64::MIN + 1));

    let found = w.overlapping(&Bounds::new(i64::MAX - 30, i64::MAX));
    assert!(found.iter().any(|b| b.contains(i64::MAX - 1)));
}
