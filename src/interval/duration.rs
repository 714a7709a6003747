use std::fmt;
use std::ops::Neg;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Months};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::common::error::AggWindowError;

/// Nanoseconds since the Unix epoch, UTC.
pub type Time = i64;

pub const MIN_TIME: Time = i64::MIN;
pub const MAX_TIME: Time = i64::MAX;
pub const EPOCH: Time = 0;

const NANOS_PER_US: i64 = 1_000;
const NANOS_PER_MS: i64 = 1_000_000;
const NANOS_PER_SEC: i64 = 1_000_000_000;
const NANOS_PER_MIN: i64 = 60 * NANOS_PER_SEC;
const NANOS_PER_HOUR: i64 = 60 * NANOS_PER_MIN;
const NANOS_PER_DAY: i64 = 24 * NANOS_PER_HOUR;
const NANOS_PER_WEEK: i64 = 7 * NANOS_PER_DAY;

/// A calendar-aware duration: whole months plus nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Duration {
    months: i64,
    nsecs: i64,
}

impl Duration {
    /// Sentinel for a window that covers the whole input.
    pub const INFINITE: Duration = Duration { months: 0, nsecs: i64::MAX };
    pub const ZERO: Duration = Duration { months: 0, nsecs: 0 };

    pub const fn new(months: i64, nsecs: i64) -> Self {
        Self { months, nsecs }
    }

    pub const fn from_nanos(nsecs: i64) -> Self {
        Self { months: 0, nsecs }
    }

    pub const fn from_months(months: i64) -> Self {
        Self { months, nsecs: 0 }
    }

    pub fn months(&self) -> i64 {
        self.months
    }

    pub fn nanoseconds(&self) -> i64 {
        self.nsecs
    }

    pub fn is_zero(&self) -> bool {
        self.months == 0 && self.nsecs == 0
    }

    pub fn is_negative(&self) -> bool {
        self.months < 0 || self.nsecs < 0
    }

    pub fn is_positive(&self) -> bool {
        !self.is_zero() && !self.is_negative()
    }

    pub fn is_mixed(&self) -> bool {
        self.months != 0 && self.nsecs != 0
    }

    pub fn months_only(&self) -> bool {
        self.months != 0 && self.nsecs == 0
    }

    pub fn is_infinite(&self) -> bool {
        *self == Self::INFINITE
    }

    pub fn mul(&self, scale: i64) -> Self {
        Self {
            months: self.months.saturating_mul(scale),
            nsecs: self.nsecs.saturating_mul(scale),
        }
    }

    pub fn add(&self, other: Duration) -> Self {
        Self {
            months: self.months.saturating_add(other.months),
            nsecs: self.nsecs.saturating_add(other.nsecs),
        }
    }
}

impl Neg for Duration {
    type Output = Duration;

    fn neg(self) -> Duration {
        Duration {
            months: self.months.saturating_neg(),
            nsecs: self.nsecs.saturating_neg(),
        }
    }
}

/// Adds `d` to `t`: months first, clamping the day to the end of the target month, then nanoseconds.
/// Saturates at the representable range.
pub fn add_duration(t: Time, d: Duration) -> Time {
    let mut t = t;
    if d.months != 0 {
        t = add_months(t, d.months);
    }
    t.saturating_add(d.nsecs)
}

fn add_months(t: Time, months: i64) -> Time {
    let overflow = if months > 0 { MAX_TIME } else { MIN_TIME };
    if t == MIN_TIME || t == MAX_TIME {
        return t;
    }
    let Ok(n) = u32::try_from(months.unsigned_abs()) else {
        return overflow;
    };
    let dt = DateTime::from_timestamp_nanos(t).naive_utc();
    let shifted = if months > 0 {
        dt.checked_add_months(Months::new(n))
    } else {
        dt.checked_sub_months(Months::new(n))
    };
    shifted
        .and_then(|dt| dt.and_utc().timestamp_nanos_opt())
        .unwrap_or(overflow)
}

/// Position of `t` on the `year*12 + month` axis.
pub fn months_since_zero(t: Time) -> i64 {
    let dt = DateTime::from_timestamp_nanos(t);
    dt.year() as i64 * 12 + dt.month0() as i64
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            return write!(f, "inf");
        }
        if self.is_zero() {
            return write!(f, "0s");
        }
        if self.is_negative() {
            write!(f, "-")?;
        }
        let months = self.months.unsigned_abs();
        if months / 12 > 0 {
            write!(f, "{}y", months / 12)?;
        }
        if months % 12 > 0 {
            write!(f, "{}mo", months % 12)?;
        }
        let mut nsecs = self.nsecs.unsigned_abs();
        for (unit, size) in [
            ("d", NANOS_PER_DAY),
            ("h", NANOS_PER_HOUR),
            ("m", NANOS_PER_MIN),
            ("s", NANOS_PER_SEC),
            ("ms", NANOS_PER_MS),
            ("us", NANOS_PER_US),
            ("ns", 1),
        ] {
            let size = size as u64;
            if nsecs >= size {
                write!(f, "{}{}", nsecs / size, unit)?;
                nsecs %= size;
            }
        }
        Ok(())
    }
}

impl FromStr for Duration {
    type Err = AggWindowError;

    /// Parses duration literals such as `10s`, `1h30m`, `1mo`, `-24h` or `inf`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "inf" {
            return Ok(Duration::INFINITE);
        }
        let (negative, mut rest) = match s.strip_prefix('-') {
            Some(r) => (true, r),
            None => (false, s),
        };
        if rest.is_empty() {
            return Err(AggWindowError::invalid(format!("invalid duration literal \"{}\"", s)));
        }

        let mut d = Duration::ZERO;
        while !rest.is_empty() {
            let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            if digits == 0 {
                return Err(AggWindowError::invalid(format!("invalid duration literal \"{}\"", s)));
            }
            let magnitude: i64 = rest[..digits]
                .parse()
                .map_err(|_| AggWindowError::invalid(format!("duration magnitude out of range in \"{}\"", s)))?;
            rest = &rest[digits..];
            let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
            let unit = &rest[..unit_len];
            rest = &rest[unit_len..];

            let part = match unit {
                "y" => Duration::from_months(magnitude.saturating_mul(12)),
                "mo" => Duration::from_months(magnitude),
                "w" => Duration::from_nanos(magnitude.saturating_mul(NANOS_PER_WEEK)),
                "d" => Duration::from_nanos(magnitude.saturating_mul(NANOS_PER_DAY)),
                "h" => Duration::from_nanos(magnitude.saturating_mul(NANOS_PER_HOUR)),
                "m" => Duration::from_nanos(magnitude.saturating_mul(NANOS_PER_MIN)),
                "s" => Duration::from_nanos(magnitude.saturating_mul(NANOS_PER_SEC)),
                "ms" => Duration::from_nanos(magnitude.saturating_mul(NANOS_PER_MS)),
                "us" | "µs" => Duration::from_nanos(magnitude.saturating_mul(NANOS_PER_US)),
                "ns" => Duration::from_nanos(magnitude),
                _ => {
                    return Err(AggWindowError::invalid(format!(
                        "invalid duration unit \"{}\" in \"{}\"",
                        unit, s
                    )))
                }
            };
            d = d.add(part);
        }
        if d.is_infinite() {
            return Err(AggWindowError::invalid(format!(
                "duration \"{}\" is out of range; use \"inf\" for an unbounded window",
                s
            )));
        }
        Ok(if negative { -d } else { d })
    }
}

impl Serialize for Duration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

struct DurationVisitor;

impl<'de> Visitor<'de> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a duration literal like \"10s\" or an integer number of nanoseconds")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
        if v == i64::MAX {
            return Err(E::custom("duration out of range"));
        }
        Ok(Duration::from_nanos(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
        i64::try_from(v)
            .map_err(|_| E::custom("duration out of range"))
            .and_then(|v| self.visit_i64(v))
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        deserializer.deserialize_any(DurationVisitor)
    }
}
