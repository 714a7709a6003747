pub mod config;
pub mod window_operator;

pub use config::WindowSpec;
pub use window_operator::WindowOperator;
