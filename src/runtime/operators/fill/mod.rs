pub mod fill_operator;

pub use fill_operator::FillOperator;
