use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};

use crate::api::plan::{Mutation, SchemaMutationSpec};
use crate::common::error::{AggWindowError, Result};
use crate::common::key::GroupKey;
use crate::common::table_chunk::TableChunk;
use crate::runtime::operators::operator::{OperatorTrait, OperatorType};

/// Applies duplicate, rename and drop column edits to every table.
#[derive(Debug)]
pub struct SchemaMutationOperator {
    spec: SchemaMutationSpec,
}

/// Data columns of a table being edited, kept apart from the key.
struct Columns {
    fields: Vec<Field>,
    arrays: Vec<ArrayRef>,
}

impl Columns {
    fn from_batch(batch: &RecordBatch) -> Self {
        let schema = batch.schema();
        Self {
            fields: schema.fields().iter().map(|f| f.as_ref().clone()).collect(),
            arrays: batch.columns().to_vec(),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }

    fn set(&mut self, field: Field, array: ArrayRef) {
        match self.position(field.name()) {
            Some(i) => {
                self.fields[i] = field;
                self.arrays[i] = array;
            }
            None => {
                self.fields.push(field);
                self.arrays.push(array);
            }
        }
    }

    fn into_batch(self, num_rows: usize) -> Result<RecordBatch> {
        let schema = Arc::new(Schema::new(self.fields));
        if self.arrays.is_empty() {
            let options = RecordBatchOptions::new().with_row_count(Some(num_rows));
            return Ok(RecordBatch::try_new_with_options(schema, self.arrays, &options)?);
        }
        Ok(RecordBatch::try_new(schema, self.arrays)?)
    }
}

impl SchemaMutationOperator {
    pub fn new(spec: SchemaMutationSpec) -> Self {
        Self { spec }
    }

    fn mutate(&self, table: TableChunk) -> Result<TableChunk> {
        let num_rows = table.num_rows();
        let mut key = table.key.clone();
        let mut columns = Columns::from_batch(&table.data_columns()?);

        for mutation in &self.spec.mutations {
            match mutation {
                Mutation::Duplicate { column, as_name } => {
                    if key.has_col(as_name) {
                        return Err(AggWindowError::invalid(format!(
                            "cannot duplicate into group key column \"{}\"",
                            as_name
                        )));
                    }
                    let (field, array) = match key.value(column) {
                        Some(v) => (Field::new(as_name, v.data_type(), true), v.to_array_of_size(num_rows)?),
                        None => {
                            let i = columns.position(column).ok_or_else(|| {
                                AggWindowError::failed_precondition(format!("column \"{}\" does not exist", column))
                            })?;
                            (columns.fields[i].clone().with_name(as_name), columns.arrays[i].clone())
                        }
                    };
                    columns.set(field, array);
                }
                Mutation::Rename { from, to } => {
                    if key.has_col(from) {
                        key = rename_key_column(&key, from, to);
                    } else {
                        let i = columns.position(from).ok_or_else(|| {
                            AggWindowError::failed_precondition(format!("column \"{}\" does not exist", from))
                        })?;
                        columns.fields[i] = columns.fields[i].clone().with_name(to);
                    }
                }
                Mutation::Drop { columns: dropped } => {
                    for name in dropped {
                        key = key.without(name);
                        if let Some(i) = columns.position(name) {
                            columns.fields.remove(i);
                            columns.arrays.remove(i);
                        }
                    }
                }
            }
        }

        let data = columns.into_batch(num_rows)?;
        TableChunk::with_key_columns(key, &data)
    }
}

fn rename_key_column(key: &GroupKey, from: &str, to: &str) -> GroupKey {
    GroupKey::new(
        key.columns()
            .iter()
            .map(|c| {
                let name = if c.name == from { to.to_string() } else { c.name.clone() };
                (name, c.value.clone())
            })
            .collect(),
    )
}

impl OperatorTrait for SchemaMutationOperator {
    fn process_table(&mut self, table: TableChunk) -> Result<Vec<TableChunk>> {
        Ok(vec![self.mutate(table)?])
    }

    fn operator_type(&self) -> OperatorType {
        OperatorType::Transform
    }
}
