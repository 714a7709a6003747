use std::collections::HashMap;

use arrow::array::BooleanArray;
use arrow::compute::{concat_batches, filter_record_batch};
use arrow::record_batch::RecordBatch;
use itertools::{Itertools, MinMaxResult};
use tracing::debug;

use crate::common::error::{AggWindowError, Result};
use crate::common::key::GroupKey;
use crate::common::table_chunk::TableChunk;
use crate::interval::{Bounds, Window, WindowBounds};
use crate::runtime::operators::operator::{OperatorTrait, OperatorType};
use crate::runtime::operators::window::config::WindowSpec;

/// Regroups rows into one table per (group key, window).
///
/// Rows land in every window that contains them, clipped to the global bounds. Rows with a
/// null time or outside the bounds are dropped. The infinite window does no row filtering and
/// puts all rows of a group into a single table spanning the bounds.
#[derive(Debug)]
pub struct WindowOperator {
    spec: WindowSpec,
    window: Window,
    bounds: Bounds,
    groups: Vec<(GroupKey, Vec<RecordBatch>)>,
    group_index: HashMap<GroupKey, usize>,
}

impl WindowOperator {
    pub fn new(spec: WindowSpec, bounds: Option<Bounds>) -> Result<Self> {
        let window = spec.window()?;
        let bounds =
            bounds.ok_or_else(|| AggWindowError::invalid("nil bounds passed to window; use range to set the window range"))?;
        Ok(Self {
            spec,
            window,
            bounds,
            groups: Vec::new(),
            group_index: HashMap::new(),
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    fn push(&mut self, key: GroupKey, batch: RecordBatch) {
        match self.group_index.get(&key) {
            Some(i) => self.groups[*i].1.push(batch),
            None => {
                self.group_index.insert(key.clone(), self.groups.len());
                self.groups.push((key, vec![batch]));
            }
        }
    }

    fn window_key(&self, key: &GroupKey, bounds: &Bounds) -> GroupKey {
        key.clone()
            .with_bounds(&self.spec.start_column, &self.spec.stop_column, bounds)
    }

    /// Windows that can receive rows of `table`, or every window in bounds when empty tables are created.
    fn candidate_windows(&self, times: impl Iterator<Item = i64>) -> Vec<WindowBounds> {
        if self.spec.create_empty {
            return self.window.overlapping(&self.bounds);
        }
        let (lo, hi) = match times.filter(|t| self.bounds.contains(*t)).minmax() {
            MinMaxResult::NoElements => return Vec::new(),
            MinMaxResult::OneElement(t) => (t, t),
            MinMaxResult::MinMax(lo, hi) => (lo, hi),
        };
        self.window.overlapping(&Bounds::new(lo, hi + 1))
    }
}

impl OperatorTrait for WindowOperator {
    fn process_table(&mut self, table: TableChunk) -> Result<Vec<TableChunk>> {
        let data = table.data_columns()?;
        if self.window.is_infinite() {
            let key = self.window_key(&table.key, &self.bounds);
            self.push(key, data);
            return Ok(Vec::new());
        }

        let times = table.time_column(&self.spec.time_column)?;
        let candidates = self.candidate_windows(times.iter().flatten());
        for wb in candidates {
            let clipped = wb.bounds.intersect(&self.bounds);
            if clipped.is_empty() {
                continue;
            }
            let mask: BooleanArray = times
                .iter()
                .map(|t| Some(t.is_some_and(|t| clipped.contains(t))))
                .collect();
            let rows = filter_record_batch(&data, &mask)?;
            if rows.num_rows() > 0 || self.spec.create_empty {
                let key = self.window_key(&table.key, &clipped);
                self.push(key, rows);
            }
        }
        Ok(Vec::new())
    }

    fn finish(&mut self) -> Result<Vec<TableChunk>> {
        let groups = std::mem::take(&mut self.groups);
        self.group_index.clear();
        let mut out = Vec::with_capacity(groups.len());
        for (key, batches) in groups {
            let schema = batches[0].schema();
            let data = concat_batches(&schema, &batches)?;
            out.push(TableChunk::with_key_columns(key, &data)?);
        }
        debug!("{} produced {} tables", self.window, out.len());
        Ok(out)
    }

    fn operator_type(&self) -> OperatorType {
        OperatorType::Blocking
    }
}
