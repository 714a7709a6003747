pub mod executor;
pub mod operators;


pub use executor::{execute_plan, run_plan, PlanOutput};
