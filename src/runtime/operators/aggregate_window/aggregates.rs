use std::fmt;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::ops::Range;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, PrimitiveArray};
use arrow::datatypes::{ArrowPrimitiveType, DataType, Float64Type, Int64Type, UInt64Type};
use serde::{Deserialize, Serialize};

use crate::common::error::{AggWindowError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum AggregateKind {
    #[default]
    Count,
    Sum,
    Mean,
}

impl AggregateKind {
    /// Case-insensitive; `avg` is accepted for mean.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "count" => Ok(AggregateKind::Count),
            "sum" => Ok(AggregateKind::Sum),
            "mean" | "avg" => Ok(AggregateKind::Mean),
            other => Err(AggWindowError::invalid(format!("unrecognized aggregate kind \"{}\"", other))),
        }
    }

    pub fn output_type(&self, input: &DataType) -> DataType {
        match self {
            AggregateKind::Count => DataType::Int64,
            AggregateKind::Sum => input.clone(),
            AggregateKind::Mean => DataType::Float64,
        }
    }
}

impl TryFrom<String> for AggregateKind {
    type Error = AggWindowError;

    fn try_from(name: String) -> Result<Self> {
        Self::from_name(&name)
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateKind::Count => write!(f, "count"),
            AggregateKind::Sum => write!(f, "sum"),
            AggregateKind::Mean => write!(f, "mean"),
        }
    }
}

/// Numeric value columns a window can sum or average.
pub trait WindowNumeric: ArrowPrimitiveType + Debug {
    fn add(a: Self::Native, b: Self::Native) -> Self::Native;
    fn to_f64(v: Self::Native) -> f64;
}

impl WindowNumeric for Int64Type {
    fn add(a: i64, b: i64) -> i64 {
        a.wrapping_add(b)
    }

    fn to_f64(v: i64) -> f64 {
        v as f64
    }
}

impl WindowNumeric for UInt64Type {
    fn add(a: u64, b: u64) -> u64 {
        a.wrapping_add(b)
    }

    fn to_f64(v: u64) -> f64 {
        v as f64
    }
}

impl WindowNumeric for Float64Type {
    fn add(a: f64, b: f64) -> f64 {
        a + b
    }

    fn to_f64(v: f64) -> f64 {
        v
    }
}

/// Reduces the rows of one window to a mergeable partial and finalizes partials into a column.
pub trait WindowAggregator: Debug {
    type Input: ?Sized;
    type Partial: Clone + Debug + PartialEq;

    fn reduce(values: &Self::Input, rows: Range<usize>) -> Self::Partial;

    fn combine(a: &Self::Partial, b: &Self::Partial) -> Self::Partial;

    /// `None` marks a window without rows.
    fn finish(partials: &[Option<Self::Partial>]) -> ArrayRef;
}

#[derive(Debug)]
pub struct Count;

impl WindowAggregator for Count {
    type Input = dyn Array;
    type Partial = i64;

    fn reduce(_values: &dyn Array, rows: Range<usize>) -> i64 {
        rows.len() as i64
    }

    fn combine(a: &i64, b: &i64) -> i64 {
        a + b
    }

    fn finish(partials: &[Option<i64>]) -> ArrayRef {
        Arc::new(Int64Array::from_iter_values(partials.iter().map(|p| p.unwrap_or(0))))
    }
}

#[derive(Debug)]
pub struct Sum<T>(PhantomData<T>);

impl<T: WindowNumeric> WindowAggregator for Sum<T> {
    type Input = PrimitiveArray<T>;
    /// `None` until a non-null value is seen.
    type Partial = Option<T::Native>;

    fn reduce(values: &PrimitiveArray<T>, rows: Range<usize>) -> Option<T::Native> {
        let mut sum = None;
        for i in rows {
            if values.is_valid(i) {
                let v = values.value(i);
                sum = Some(match sum {
                    Some(s) => T::add(s, v),
                    None => v,
                });
            }
        }
        sum
    }

    fn combine(a: &Option<T::Native>, b: &Option<T::Native>) -> Option<T::Native> {
        match (a, b) {
            (Some(a), Some(b)) => Some(T::add(*a, *b)),
            (Some(v), None) | (None, Some(v)) => Some(*v),
            (None, None) => None,
        }
    }

    fn finish(partials: &[Option<Option<T::Native>>]) -> ArrayRef {
        Arc::new(partials.iter().map(|p| p.flatten()).collect::<PrimitiveArray<T>>())
    }
}

/// Sufficient statistics for a mergeable mean.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeanPartial {
    pub count: u64,
    pub sum: f64,
}

#[derive(Debug)]
pub struct Mean<T>(PhantomData<T>);

impl<T: WindowNumeric> WindowAggregator for Mean<T> {
    type Input = PrimitiveArray<T>;
    type Partial = MeanPartial;

    fn reduce(values: &PrimitiveArray<T>, rows: Range<usize>) -> MeanPartial {
        let mut partial = MeanPartial::default();
        for i in rows {
            if values.is_valid(i) {
                partial.count += 1;
                partial.sum += T::to_f64(values.value(i));
            }
        }
        partial
    }

    fn combine(a: &MeanPartial, b: &MeanPartial) -> MeanPartial {
        MeanPartial {
            count: a.count + b.count,
            sum: a.sum + b.sum,
        }
    }

    fn finish(partials: &[Option<MeanPartial>]) -> ArrayRef {
        Arc::new(
            partials
                .iter()
                .map(|p| match p {
                    Some(p) if p.count > 0 => Some(p.sum / p.count as f64),
                    _ => None,
                })
                .collect::<Float64Array>(),
        )
    }
}
