use std::sync::Arc;

use arrow::array::{new_null_array, ArrayRef};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::common::error::Result;
use crate::common::table_chunk::TableChunk;
use crate::runtime::operators::operator::{OperatorTrait, OperatorType};

/// Gives every table without rows a single row carrying its key and nulls elsewhere.
#[derive(Debug, Default)]
pub struct FillOperator {
    filled: usize,
}

impl FillOperator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filled(&self) -> usize {
        self.filled
    }
}

fn null_row(data: &RecordBatch) -> Result<RecordBatch> {
    let schema = data.schema();
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|f| f.as_ref().clone().with_nullable(true))
        .collect();
    let columns: Vec<ArrayRef> = fields.iter().map(|f| new_null_array(f.data_type(), 1)).collect();
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

impl OperatorTrait for FillOperator {
    fn process_table(&mut self, table: TableChunk) -> Result<Vec<TableChunk>> {
        if table.num_rows() > 0 {
            return Ok(vec![table]);
        }
        self.filled += 1;
        let data = null_row(&table.data_columns()?)?;
        Ok(vec![TableChunk::with_key_columns(table.key, &data)?])
    }

    fn operator_type(&self) -> OperatorType {
        OperatorType::Transform
    }
}
