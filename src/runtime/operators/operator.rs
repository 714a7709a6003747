use std::fmt;

use crate::api::plan::ProcedureSpec;
use crate::common::error::{AggWindowError, Result};
use crate::common::key::GroupKey;
use crate::common::table_chunk::TableChunk;
use crate::interval::Bounds;
use crate::runtime::operators::aggregate::aggregate_operator::AggregateOperator;
use crate::runtime::operators::aggregate_window::AggregateWindowOperator;
use crate::runtime::operators::fill::fill_operator::FillOperator;
use crate::runtime::operators::schema_mutation::schema_mutation_operator::SchemaMutationOperator;
use crate::runtime::operators::window::window_operator::WindowOperator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorType {
    /// Emits one output table per input table as it arrives.
    Transform,
    /// Emits only once all input has been seen.
    Blocking,
}

/// A table-at-a-time transformation over a finite stream of tables.
///
/// An error from `process_table` fails only the group key of that table.
pub trait OperatorTrait: fmt::Debug {
    fn process_table(&mut self, table: TableChunk) -> Result<Vec<TableChunk>>;

    /// Flushes whatever the operator retained.
    fn finish(&mut self) -> Result<Vec<TableChunk>> {
        Ok(Vec::new())
    }

    /// Group keys the operator isolated itself instead of returning an error for them.
    fn take_failures(&mut self) -> Vec<(GroupKey, AggWindowError)> {
        Vec::new()
    }

    fn operator_type(&self) -> OperatorType;
}

#[derive(Debug)]
pub enum Operator {
    Window(WindowOperator),
    SchemaMutation(SchemaMutationOperator),
    Fill(FillOperator),
    Aggregate(AggregateOperator),
    AggregateWindow(AggregateWindowOperator),
}

impl Operator {
    /// Instantiates the operator for `spec`. Source and yield nodes have none.
    pub fn from_spec(spec: &ProcedureSpec, bounds: Option<Bounds>) -> Result<Option<Self>> {
        let op = match spec {
            ProcedureSpec::Source(_) | ProcedureSpec::Yield(_) => return Ok(None),
            ProcedureSpec::Window(w) => Operator::Window(WindowOperator::new(w.clone(), bounds)?),
            ProcedureSpec::SchemaMutation(m) => Operator::SchemaMutation(SchemaMutationOperator::new(m.clone())),
            ProcedureSpec::Fill => Operator::Fill(FillOperator::new()),
            ProcedureSpec::Count(_) | ProcedureSpec::Sum(_) | ProcedureSpec::Mean(_) => {
                Operator::Aggregate(AggregateOperator::from_spec(spec)?)
            }
            ProcedureSpec::AggregateWindow(s) => {
                let mut s = s.clone();
                if s.bounds.is_none() {
                    s.bounds = bounds;
                }
                Operator::AggregateWindow(AggregateWindowOperator::new(s)?)
            }
        };
        Ok(Some(op))
    }
}

impl OperatorTrait for Operator {
    fn process_table(&mut self, table: TableChunk) -> Result<Vec<TableChunk>> {
        match self {
            Operator::Window(op) => op.process_table(table),
            Operator::SchemaMutation(op) => op.process_table(table),
            Operator::Fill(op) => op.process_table(table),
            Operator::Aggregate(op) => op.process_table(table),
            Operator::AggregateWindow(op) => op.process_table(table),
        }
    }

    fn finish(&mut self) -> Result<Vec<TableChunk>> {
        match self {
            Operator::Window(op) => op.finish(),
            Operator::SchemaMutation(op) => op.finish(),
            Operator::Fill(op) => op.finish(),
            Operator::Aggregate(op) => op.finish(),
            Operator::AggregateWindow(op) => OperatorTrait::finish(op),
        }
    }

    fn take_failures(&mut self) -> Vec<(GroupKey, AggWindowError)> {
        match self {
            Operator::Window(op) => op.take_failures(),
            Operator::SchemaMutation(op) => op.take_failures(),
            Operator::Fill(op) => op.take_failures(),
            Operator::Aggregate(op) => op.take_failures(),
            Operator::AggregateWindow(op) => op.take_failures(),
        }
    }

    fn operator_type(&self) -> OperatorType {
        match self {
            Operator::Window(op) => op.operator_type(),
            Operator::SchemaMutation(op) => op.operator_type(),
            Operator::Fill(op) => op.operator_type(),
            Operator::Aggregate(op) => op.operator_type(),
            Operator::AggregateWindow(op) => op.operator_type(),
        }
    }
}
