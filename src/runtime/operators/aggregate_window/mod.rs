pub mod aggregates;
pub mod config;
pub mod fill;
pub mod merge;
pub mod operator;
pub mod scan;
pub mod state;


pub use aggregates::AggregateKind;
pub use config::AggregateWindowSpec;
pub use operator::{AggregateWindowOperator, FlushResult};
pub use state::AggregateWindowState;
