pub mod aggregate_operator;

pub use aggregate_operator::AggregateOperator;
