pub mod aggregate;
pub mod aggregate_window;
pub mod fill;
pub mod operator;
pub mod schema_mutation;
pub mod window;
