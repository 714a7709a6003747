use std::sync::Arc;

use arrow::array::{new_empty_array, Array, ArrayRef, AsArray};
use arrow::datatypes::{DataType, Field, Float64Type, Int64Type, Schema, UInt64Type};
use arrow::record_batch::RecordBatch;

use crate::api::plan::ProcedureSpec;
use crate::common::error::{AggWindowError, Result};
use crate::common::table_chunk::TableChunk;
use crate::runtime::operators::aggregate_window::aggregates::{AggregateKind, Count, Mean, Sum, WindowAggregator};
use crate::runtime::operators::operator::{OperatorTrait, OperatorType};

/// Collapses every table into a single row of count, sum or mean of one column.
#[derive(Debug)]
pub struct AggregateOperator {
    kind: AggregateKind,
    column: String,
}

fn reduce_all<A: WindowAggregator>(values: &A::Input, num_rows: usize) -> ArrayRef {
    A::finish(&[Some(A::reduce(values, 0..num_rows))])
}

/// One-row aggregate of `values`.
pub fn aggregate_column(kind: AggregateKind, values: &ArrayRef) -> Result<ArrayRef> {
    let n = values.len();
    let out = match (kind, values.data_type()) {
        (AggregateKind::Count, _) => reduce_all::<Count>(values.as_ref(), n),
        (AggregateKind::Sum, DataType::Int64) => reduce_all::<Sum<Int64Type>>(values.as_primitive(), n),
        (AggregateKind::Sum, DataType::UInt64) => reduce_all::<Sum<UInt64Type>>(values.as_primitive(), n),
        (AggregateKind::Sum, DataType::Float64) => reduce_all::<Sum<Float64Type>>(values.as_primitive(), n),
        (AggregateKind::Mean, DataType::Int64) => reduce_all::<Mean<Int64Type>>(values.as_primitive(), n),
        (AggregateKind::Mean, DataType::UInt64) => reduce_all::<Mean<UInt64Type>>(values.as_primitive(), n),
        (AggregateKind::Mean, DataType::Float64) => reduce_all::<Mean<Float64Type>>(values.as_primitive(), n),
        (_, other) => {
            return Err(AggWindowError::failed_precondition(format!(
                "unsupported aggregate column type {}",
                other
            )))
        }
    };
    Ok(out)
}

impl AggregateOperator {
    pub fn new(kind: AggregateKind, column: &str) -> Self {
        Self {
            kind,
            column: column.to_string(),
        }
    }

    pub fn from_spec(spec: &ProcedureSpec) -> Result<Self> {
        let (kind, agg) = match spec {
            ProcedureSpec::Count(a) => (AggregateKind::Count, a),
            ProcedureSpec::Sum(a) => (AggregateKind::Sum, a),
            ProcedureSpec::Mean(a) => (AggregateKind::Mean, a),
            other => {
                return Err(AggWindowError::internal(format!("{} is not an aggregate", other)));
            }
        };
        match agg.columns.as_slice() {
            [column] => Ok(Self::new(kind, column)),
            cols => Err(AggWindowError::invalid(format!(
                "{} expects exactly one column, got {}",
                kind,
                cols.len()
            ))),
        }
    }

    fn aggregate(&self, table: &TableChunk) -> Result<TableChunk> {
        if table.key.has_col(&self.column) {
            return Err(AggWindowError::failed_precondition(
                "cannot aggregate columns that are part of the group key",
            ));
        }
        let values = table
            .column_by_name(&self.column)
            .ok_or_else(|| AggWindowError::failed_precondition(format!("column \"{}\" does not exist", self.column)))?;

        // An empty table has no sum or mean, only a zero count.
        let out = if values.is_empty() && self.kind != AggregateKind::Count {
            new_empty_array(&self.kind.output_type(values.data_type()))
        } else {
            aggregate_column(self.kind, values)?
        };
        let schema = Schema::new(vec![Field::new(&self.column, out.data_type().clone(), true)]);
        let data = RecordBatch::try_new(Arc::new(schema), vec![out])?;
        TableChunk::with_key_columns(table.key.clone(), &data)
    }
}

impl OperatorTrait for AggregateOperator {
    fn process_table(&mut self, table: TableChunk) -> Result<Vec<TableChunk>> {
        Ok(vec![self.aggregate(&table)?])
    }

    fn operator_type(&self) -> OperatorType {
        OperatorType::Transform
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::plan::AggregateSpec;
    use crate::common::error::Code;
    use crate::common::test_utils::{column_f64, column_i64, column_u64, create_int_chunk, create_test_chunk, create_uint_chunk, times};

    fn run(kind: AggregateKind, table: TableChunk) -> Result<TableChunk> {
        let mut op = AggregateOperator::new(kind, "_value");
        Ok(op.process_table(table)?.remove(0))
    }

    #[test]
    fn test_aggregates_whole_table() {
        let chunk = create_int_chunk("a", &times(&[1, 2, 3]), &[Some(1), None, Some(5)]);
        let out = run(AggregateKind::Count, chunk.clone()).unwrap();
        assert_eq!(column_i64(&out.record_batch, "_value"), vec![Some(3)]);
        assert!(out.column_by_name("_time").is_none());
        assert!(out.column_by_name("host").is_some());

        let out = run(AggregateKind::Sum, chunk.clone()).unwrap();
        assert_eq!(column_i64(&out.record_batch, "_value"), vec![Some(6)]);
        let out = run(AggregateKind::Mean, chunk).unwrap();
        assert_eq!(column_f64(&out.record_batch, "_value"), vec![Some(3.0)]);

        let chunk = create_uint_chunk("a", &times(&[1, 2]), &[Some(2), Some(3)]);
        let out = run(AggregateKind::Sum, chunk).unwrap();
        assert_eq!(column_u64(&out.record_batch, "_value"), vec![Some(5)]);
    }

    #[test]
    fn test_empty_table() {
        let empty = create_test_chunk("a", &[], &[]);
        let out = run(AggregateKind::Count, empty.clone()).unwrap();
        assert_eq!(column_i64(&out.record_batch, "_value"), vec![Some(0)]);
        assert_eq!(run(AggregateKind::Sum, empty.clone()).unwrap().num_rows(), 0);
        assert_eq!(run(AggregateKind::Mean, empty).unwrap().num_rows(), 0);

        let nulls = create_test_chunk("a", &times(&[1]), &[None]);
        assert_eq!(column_f64(&run(AggregateKind::Sum, nulls).unwrap().record_batch, "_value"), vec![None]);
    }

    #[test]
    fn test_preconditions() {
        let chunk = create_test_chunk("a", &times(&[1]), &[Some(1.0)]);
        let mut op = AggregateOperator::new(AggregateKind::Sum, "host");
        let err = op.process_table(chunk.clone()).unwrap_err();
        assert_eq!(err.to_string(), "cannot aggregate columns that are part of the group key");
        let mut op = AggregateOperator::new(AggregateKind::Sum, "missing");
        assert_eq!(op.process_table(chunk).unwrap_err().code(), Code::FailedPrecondition);

        let spec = ProcedureSpec::Mean(AggregateSpec { columns: vec![] });
        assert_eq!(AggregateOperator::from_spec(&spec).unwrap_err().code(), Code::Invalid);
    }
}
