use std::sync::Arc;

use arrow::array::{Array, ArrayRef, TimestampNanosecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;

use crate::common::error::{AggWindowError, Result};
use crate::common::key::GroupKey;

/// A columnar slice of one group's rows. The batch may or may not carry the key columns.
#[derive(Debug, Clone)]
pub struct TableChunk {
    pub key: GroupKey,
    pub record_batch: RecordBatch,
}

impl TableChunk {
    pub fn new(key: GroupKey, record_batch: RecordBatch) -> Self {
        Self { key, record_batch }
    }

    /// Builds a full table: key columns broadcast first, followed by the non-key columns of `data`.
    pub fn with_key_columns(key: GroupKey, data: &RecordBatch) -> Result<Self> {
        let num_rows = data.num_rows();
        let mut fields: Vec<Field> = key.fields();
        let mut columns: Vec<ArrayRef> = key.to_arrays(num_rows)?;
        let schema = data.schema();
        for (i, field) in schema.fields().iter().enumerate() {
            if key.has_col(field.name()) {
                continue;
            }
            fields.push(field.as_ref().clone());
            columns.push(data.column(i).clone());
        }
        let record_batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
        Ok(Self { key, record_batch })
    }

    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    pub fn record_batch(&self) -> &RecordBatch {
        &self.record_batch
    }

    pub fn num_rows(&self) -> usize {
        self.record_batch.num_rows()
    }

    pub fn schema(&self) -> SchemaRef {
        self.record_batch.schema()
    }

    pub fn column_by_name(&self, name: &str) -> Option<&ArrayRef> {
        self.record_batch.column_by_name(name)
    }

    /// The named column as nanosecond timestamps.
    pub fn time_column(&self, name: &str) -> Result<&TimestampNanosecondArray> {
        let col = self
            .column_by_name(name)
            .ok_or_else(|| AggWindowError::failed_precondition(format!("no time column: {}", name)))?;
        match col.data_type() {
            DataType::Timestamp(TimeUnit::Nanosecond, _) => col
                .as_any()
                .downcast_ref::<TimestampNanosecondArray>()
                .ok_or_else(|| AggWindowError::internal("timestamp column has an unexpected layout")),
            _ => Err(AggWindowError::failed_precondition(format!(
                "time column is not a time value: {}",
                name
            ))),
        }
    }

    /// The batch without any column that belongs to the group key.
    pub fn data_columns(&self) -> Result<RecordBatch> {
        let schema = self.record_batch.schema();
        let indices: Vec<usize> = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, f)| !self.key.has_col(f.name()))
            .map(|(i, _)| i)
            .collect();
        Ok(self.record_batch.project(&indices)?)
    }
}
