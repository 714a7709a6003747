use std::mem;

use arrow::array::{Array, ArrayRef, AsArray, PrimitiveArray};
use arrow::datatypes::{DataType, Float64Type, Int64Type, UInt64Type};

use crate::common::error::{AggWindowError, Result};
use crate::interval::Time;
use crate::runtime::operators::aggregate_window::aggregates::{AggregateKind, Count, Mean, Sum, WindowAggregator, WindowNumeric};
use crate::runtime::operators::aggregate_window::fill::EmptyWindowFiller;
use crate::runtime::operators::aggregate_window::merge::{merge_boundary_times, merge_values};
use crate::runtime::operators::aggregate_window::scan::{window_ranges, SortedChunk, WindowBoundaries};

/// Per-window partials for one group key, keyed by each window's representative instant.
#[derive(Debug)]
pub struct WindowState<A: WindowAggregator> {
    window_ts: Vec<Time>,
    window_vals: Vec<A::Partial>,
    closed: bool,
}

impl<A: WindowAggregator> Clone for WindowState<A> {
    fn clone(&self) -> Self {
        Self {
            window_ts: self.window_ts.clone(),
            window_vals: self.window_vals.clone(),
            closed: self.closed,
        }
    }
}

impl<A: WindowAggregator> Default for WindowState<A> {
    fn default() -> Self {
        Self {
            window_ts: Vec::new(),
            window_vals: Vec::new(),
            closed: false,
        }
    }
}

impl<A: WindowAggregator> WindowState<A> {
    pub fn window_ts(&self) -> &[Time] {
        &self.window_ts
    }

    pub fn window_vals(&self) -> &[A::Partial] {
        &self.window_vals
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(AggWindowError::internal("partial aggregate state used after close"));
        }
        Ok(())
    }

    /// Folds sorted rows into the state. `times` and `values` are aligned and ascending.
    pub fn aggregate(
        &mut self,
        times: &[Time],
        values: &A::Input,
        boundaries: &WindowBoundaries,
        use_start: bool,
    ) -> Result<()> {
        self.ensure_open()?;
        let mut chunk_ts: Vec<Time> = Vec::with_capacity(boundaries.len());
        let mut chunk_vals: Vec<A::Partial> = Vec::with_capacity(boundaries.len());
        for (i, rows) in window_ranges(times, boundaries).into_iter().enumerate() {
            let t = boundaries.time(i, use_start);
            let partial = A::reduce(values, rows);
            // Windows clipped by the bounds can share a representative instant.
            match (chunk_ts.last(), chunk_vals.last_mut()) {
                (Some(last), Some(acc)) if *last == t => *acc = A::combine(acc, &partial),
                _ => {
                    chunk_ts.push(t);
                    chunk_vals.push(partial);
                }
            }
        }
        self.merge_sorted(chunk_ts, chunk_vals)
    }

    pub fn merge(&mut self, mut other: WindowState<A>) -> Result<()> {
        self.ensure_open()?;
        other.ensure_open()?;
        let ts = mem::take(&mut other.window_ts);
        let vals = mem::take(&mut other.window_vals);
        other.close();
        self.merge_sorted(ts, vals)
    }

    fn merge_sorted(&mut self, ts: Vec<Time>, vals: Vec<A::Partial>) -> Result<()> {
        if ts.is_empty() {
            return Ok(());
        }
        if self.window_ts.is_empty() {
            self.window_ts = ts;
            self.window_vals = vals;
            return Ok(());
        }
        let merged = merge_boundary_times(&self.window_ts, &ts);
        let merged_vals = merge_values(
            &merged,
            (&self.window_ts, &self.window_vals),
            (&ts, &vals),
            |a, b| A::combine(a, b),
        )
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| AggWindowError::internal("merged window axis has an unmatched position"))?;
        self.window_ts = merged;
        self.window_vals = merged_vals;
        Ok(())
    }

    /// Final `(times, values)`, optionally over the full window axis. Leaves the state empty.
    pub fn compute(&mut self, filler: Option<&EmptyWindowFiller>) -> Result<(Vec<Time>, ArrayRef)> {
        self.ensure_open()?;
        let ts = mem::take(&mut self.window_ts);
        let vals = mem::take(&mut self.window_vals);
        let (ts, partials) = match filler {
            Some(filler) => filler.fill(&ts, &vals)?,
            None => (ts, vals.into_iter().map(Some).collect()),
        };
        Ok((ts, A::finish(&partials)))
    }

    pub fn close(&mut self) {
        self.window_ts = Vec::new();
        self.window_vals = Vec::new();
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[derive(Debug, Clone)]
enum StateKind {
    Count(WindowState<Count>),
    SumInt(WindowState<Sum<Int64Type>>),
    SumUInt(WindowState<Sum<UInt64Type>>),
    SumFloat(WindowState<Sum<Float64Type>>),
    MeanInt(WindowState<Mean<Int64Type>>),
    MeanUInt(WindowState<Mean<UInt64Type>>),
    MeanFloat(WindowState<Mean<Float64Type>>),
}

macro_rules! each_state {
    ($inner:expr, $s:ident => $body:expr) => {
        match $inner {
            StateKind::Count($s) => $body,
            StateKind::SumInt($s) => $body,
            StateKind::SumUInt($s) => $body,
            StateKind::SumFloat($s) => $body,
            StateKind::MeanInt($s) => $body,
            StateKind::MeanUInt($s) => $body,
            StateKind::MeanFloat($s) => $body,
        }
    };
}

fn primitive<T: WindowNumeric>(values: &ArrayRef) -> Result<&PrimitiveArray<T>> {
    values.as_primitive_opt::<T>().ok_or_else(|| {
        AggWindowError::internal(format!("value column of type {} does not match its state", values.data_type()))
    })
}

/// Mergeable partial aggregate for one group key, dispatched once per chunk on the
/// aggregate kind and value column type.
#[derive(Debug, Clone)]
pub struct AggregateWindowState {
    kind: AggregateKind,
    input_type: DataType,
    inner: StateKind,
}

impl AggregateWindowState {
    pub fn new(kind: AggregateKind, input_type: &DataType) -> Result<Self> {
        let inner = match (kind, input_type) {
            (AggregateKind::Count, _) => StateKind::Count(WindowState::default()),
            (AggregateKind::Sum, DataType::Int64) => StateKind::SumInt(WindowState::default()),
            (AggregateKind::Sum, DataType::UInt64) => StateKind::SumUInt(WindowState::default()),
            (AggregateKind::Sum, DataType::Float64) => StateKind::SumFloat(WindowState::default()),
            (AggregateKind::Mean, DataType::Int64) => StateKind::MeanInt(WindowState::default()),
            (AggregateKind::Mean, DataType::UInt64) => StateKind::MeanUInt(WindowState::default()),
            (AggregateKind::Mean, DataType::Float64) => StateKind::MeanFloat(WindowState::default()),
            (_, other) => {
                return Err(AggWindowError::failed_precondition(format!(
                    "unsupported aggregate column type {}",
                    other
                )))
            }
        };
        Ok(Self {
            kind,
            input_type: input_type.clone(),
            inner,
        })
    }

    pub fn kind(&self) -> AggregateKind {
        self.kind
    }

    pub fn input_type(&self) -> &DataType {
        &self.input_type
    }

    pub fn output_type(&self) -> DataType {
        self.kind.output_type(&self.input_type)
    }

    pub fn len(&self) -> usize {
        each_state!(&self.inner, s => s.window_ts().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn window_ts(&self) -> &[Time] {
        each_state!(&self.inner, s => s.window_ts())
    }

    pub fn check_input_type(&self, column: &str, found: &DataType) -> Result<()> {
        if *found != self.input_type {
            return Err(AggWindowError::schema_collision(column, &self.input_type, found));
        }
        Ok(())
    }

    pub fn aggregate(&mut self, chunk: &SortedChunk, boundaries: &WindowBoundaries, use_start: bool) -> Result<()> {
        let times = &chunk.times;
        let values = &chunk.values;
        if *values.data_type() != self.input_type {
            return Err(AggWindowError::schema_collision("value", &self.input_type, values.data_type()));
        }
        match &mut self.inner {
            StateKind::Count(s) => s.aggregate(times, values.as_ref(), boundaries, use_start),
            StateKind::SumInt(s) => s.aggregate(times, primitive::<Int64Type>(values)?, boundaries, use_start),
            StateKind::SumUInt(s) => s.aggregate(times, primitive::<UInt64Type>(values)?, boundaries, use_start),
            StateKind::SumFloat(s) => s.aggregate(times, primitive::<Float64Type>(values)?, boundaries, use_start),
            StateKind::MeanInt(s) => s.aggregate(times, primitive::<Int64Type>(values)?, boundaries, use_start),
            StateKind::MeanUInt(s) => s.aggregate(times, primitive::<UInt64Type>(values)?, boundaries, use_start),
            StateKind::MeanFloat(s) => s.aggregate(times, primitive::<Float64Type>(values)?, boundaries, use_start),
        }
    }

    /// Combines a state computed for the same group key from a disjoint set of rows.
    pub fn merge(&mut self, other: AggregateWindowState) -> Result<()> {
        if other.input_type != self.input_type {
            return Err(AggWindowError::schema_collision("value", &self.input_type, &other.input_type));
        }
        match (&mut self.inner, other.inner) {
            (StateKind::Count(a), StateKind::Count(b)) => a.merge(b),
            (StateKind::SumInt(a), StateKind::SumInt(b)) => a.merge(b),
            (StateKind::SumUInt(a), StateKind::SumUInt(b)) => a.merge(b),
            (StateKind::SumFloat(a), StateKind::SumFloat(b)) => a.merge(b),
            (StateKind::MeanInt(a), StateKind::MeanInt(b)) => a.merge(b),
            (StateKind::MeanUInt(a), StateKind::MeanUInt(b)) => a.merge(b),
            (StateKind::MeanFloat(a), StateKind::MeanFloat(b)) => a.merge(b),
            _ => Err(AggWindowError::internal(format!(
                "cannot merge a {} state into a {} state",
                other.kind, self.kind
            ))),
        }
    }

    pub fn compute(&mut self, filler: Option<&EmptyWindowFiller>) -> Result<(Vec<Time>, ArrayRef)> {
        each_state!(&mut self.inner, s => s.compute(filler))
    }

    /// Releases retained buffers. Safe to call more than once.
    pub fn close(&mut self) {
        each_state!(&mut self.inner, s => s.close())
    }

    pub fn is_closed(&self) -> bool {
        each_state!(&self.inner, s => s.is_closed())
    }
}
