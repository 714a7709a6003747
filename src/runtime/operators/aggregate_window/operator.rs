use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, TimestampNanosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use tracing::{debug, trace, warn};

use crate::common::error::{AggWindowError, Result};
use crate::common::key::GroupKey;
use crate::common::table_chunk::TableChunk;
use crate::interval::{Bounds, Window};
use crate::runtime::operators::aggregate_window::config::AggregateWindowSpec;
use crate::runtime::operators::aggregate_window::fill::EmptyWindowFiller;
use crate::runtime::operators::aggregate_window::scan::{scan_windows, sort_by_time};
use crate::runtime::operators::aggregate_window::state::AggregateWindowState;
use crate::runtime::operators::operator::{OperatorTrait, OperatorType};

/// Tables emitted by a flush together with the keys that failed.
#[derive(Debug, Default)]
pub struct FlushResult {
    pub tables: Vec<TableChunk>,
    pub errors: Vec<(GroupKey, AggWindowError)>,
}

/// Windowed count/sum/mean over chunks of many group keys, one partial state per key.
pub struct AggregateWindowOperator {
    spec: AggregateWindowSpec,
    window: Window,
    bounds: Bounds,
    states: HashMap<GroupKey, AggregateWindowState>,
    failed: HashSet<GroupKey>,
    errors: Vec<(GroupKey, AggWindowError)>,
}

impl fmt::Debug for AggregateWindowOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateWindowOperator")
            .field("window", &self.window.to_string())
            .field("aggregate", &self.spec.aggregate)
            .field("bounds", &self.bounds)
            .field("keys", &self.states.len())
            .field("failed_keys", &self.failed.len())
            .finish()
    }
}

impl AggregateWindowOperator {
    pub fn new(spec: AggregateWindowSpec) -> Result<Self> {
        let (window, bounds) = spec.validate()?;
        Ok(Self {
            spec,
            window,
            bounds,
            states: HashMap::new(),
            failed: HashSet::new(),
            errors: Vec::new(),
        })
    }

    pub fn spec(&self) -> &AggregateWindowSpec {
        &self.spec
    }

    pub fn num_keys(&self) -> usize {
        self.states.len()
    }

    pub fn is_failed(&self, key: &GroupKey) -> bool {
        self.failed.contains(key)
    }

    /// Folds one chunk into its group's state. An error poisons only that group and is also
    /// reported by the next `finish`.
    pub fn process_chunk(&mut self, chunk: &TableChunk) -> Result<()> {
        if self.failed.contains(&chunk.key) {
            trace!("dropping chunk for failed key {}", chunk.key);
            return Ok(());
        }
        self.aggregate_chunk(chunk).inspect_err(|e| self.fail_key(&chunk.key, e))
    }

    fn aggregate_chunk(&mut self, chunk: &TableChunk) -> Result<()> {
        let time_col = &self.spec.window.time_column;
        let value_col = &self.spec.value_column;

        let times = chunk.time_column(time_col)?;

        if chunk.key.has_col(value_col) {
            return Err(AggWindowError::failed_precondition(
                "cannot aggregate columns that are part of the group key",
            ));
        }
        let values = chunk
            .column_by_name(value_col)
            .ok_or_else(|| AggWindowError::failed_precondition(format!("column \"{}\" does not exist", value_col)))?;

        if !self.states.contains_key(&chunk.key) {
            let state = AggregateWindowState::new(self.spec.aggregate, values.data_type())?;
            self.states.insert(chunk.key.clone(), state);
        }
        let state = self
            .states
            .get_mut(&chunk.key)
            .ok_or_else(|| AggWindowError::internal(format!("missing state for key {}", chunk.key)))?;
        state.check_input_type(value_col, values.data_type())?;

        let sorted = sort_by_time(times, values, &self.bounds)?;
        let boundaries = scan_windows(&self.window, &sorted.times, &self.bounds);
        debug!(
            "aggregate window {} key {}: {} rows, {} in bounds, {} windows",
            self.spec.aggregate,
            chunk.key,
            chunk.num_rows(),
            sorted.times.len(),
            boundaries.len()
        );
        state.aggregate(&sorted, &boundaries, self.spec.use_start)
    }

    /// Combines a partial state computed elsewhere for `key`.
    pub fn merge_state(&mut self, key: GroupKey, mut state: AggregateWindowState) -> Result<()> {
        if self.failed.contains(&key) {
            state.close();
            return Ok(());
        }
        let res = match self.states.get_mut(&key) {
            Some(existing) => existing.merge(state),
            None => {
                self.states.insert(key.clone(), state);
                Ok(())
            }
        };
        res.inspect_err(|e| self.fail_key(&key, e))
    }

    /// Folds every state of another partition of the same stream into this one.
    pub fn merge_partition(&mut self, mut other: AggregateWindowOperator) -> Result<()> {
        let mut first_err = None;
        for (key, err) in other.errors.drain(..) {
            if !self.failed.contains(&key) {
                self.errors.push((key, err));
            }
        }
        for key in other.failed.drain() {
            if let Some(mut state) = self.states.remove(&key) {
                state.close();
            }
            self.failed.insert(key);
        }
        for (key, state) in other.states.drain() {
            debug!("merging partition state for key {} ({} windows)", key, state.len());
            if let Err(e) = self.merge_state(key, state) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Emits the output table for `key` and releases its state.
    pub fn compute_key(&mut self, key: &GroupKey) -> Result<Option<TableChunk>> {
        let Some(mut state) = self.states.remove(key) else {
            return Ok(None);
        };
        let res = self.compute_state(key, &mut state);
        state.close();
        match res {
            Ok(chunk) => Ok(Some(chunk)),
            Err(e) => {
                self.fail_key(key, &e);
                Err(e)
            }
        }
    }

    fn compute_state(&self, key: &GroupKey, state: &mut AggregateWindowState) -> Result<TableChunk> {
        let filler = self
            .spec
            .fills_empty()
            .then(|| EmptyWindowFiller::new(&self.window, self.bounds, self.spec.use_start));
        let (times, values) = state.compute(filler.as_ref())?;
        let num_rows = times.len();

        let window_spec = &self.spec.window;
        let out_key = key
            .clone()
            .with_bounds(&window_spec.start_column, &window_spec.stop_column, &self.bounds);

        let mut fields = vec![Field::new(
            &window_spec.time_column,
            DataType::Timestamp(TimeUnit::Nanosecond, None),
            false,
        )];
        fields.extend(out_key.fields());
        fields.push(Field::new(&self.spec.value_column, values.data_type().clone(), true));

        let mut columns: Vec<ArrayRef> = vec![Arc::new(TimestampNanosecondArray::from(times))];
        columns.extend(out_key.to_arrays(num_rows)?);
        columns.push(values);

        let record_batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
        debug!(
            "computed key {}: {} windows (empty windows filled: {})",
            out_key,
            num_rows,
            filler.is_some()
        );
        Ok(TableChunk::new(out_key, record_batch))
    }

    /// Computes every remaining group key. Failed keys emit nothing and are listed in `errors`,
    /// whether they failed here or while their chunks were processed.
    pub fn finish(&mut self) -> FlushResult {
        let mut keys: Vec<GroupKey> = self.states.keys().cloned().collect();
        keys.sort_by_cached_key(|k| k.to_string());
        let mut result = FlushResult::default();
        for key in keys {
            // a failure is recorded by compute_key
            if let Ok(Some(chunk)) = self.compute_key(&key) {
                result.tables.push(chunk);
            }
        }
        result.errors = std::mem::take(&mut self.errors);
        result.errors.sort_by_cached_key(|(k, _)| k.to_string());
        result
    }

    /// Releases every retained state without emitting. Safe to call repeatedly.
    pub fn close(&mut self) {
        for (_, mut state) in self.states.drain() {
            state.close();
        }
    }

    fn fail_key(&mut self, key: &GroupKey, err: &AggWindowError) {
        warn!("aggregate window failed for key {}: {}", key, err);
        if let Some(mut state) = self.states.remove(key) {
            state.close();
        }
        if self.failed.insert(key.clone()) {
            self.errors.push((key.clone(), err.detached()));
        }
    }
}

impl OperatorTrait for AggregateWindowOperator {
    fn process_table(&mut self, table: TableChunk) -> Result<Vec<TableChunk>> {
        // the key is isolated and reported by finish
        if self.process_chunk(&table).is_err() {
            trace!("key {} isolated after a failed chunk", table.key);
        }
        Ok(Vec::new())
    }

    fn finish(&mut self) -> Result<Vec<TableChunk>> {
        let result = AggregateWindowOperator::finish(self);
        self.errors = result.errors;
        Ok(result.tables)
    }

    fn take_failures(&mut self) -> Vec<(GroupKey, AggWindowError)> {
        std::mem::take(&mut self.errors)
    }

    fn operator_type(&self) -> OperatorType {
        OperatorType::Blocking
    }
}

impl Drop for AggregateWindowOperator {
    fn drop(&mut self) {
        self.close();
    }
}
