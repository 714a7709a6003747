pub mod aggregate_window_rule;
pub mod optimizer;
pub mod pattern;
pub mod plan;

pub use aggregate_window_rule::AggregateWindowRule;
pub use optimizer::{aggregate_window_rules, apply_rules, OptimizerConfig, PlanOptimizer, PlanRule};
pub use pattern::Pattern;
pub use plan::{
    AggregateSpec, Mutation, PlanGraph, PlanNode, ProcedureKind, ProcedureSpec, SchemaMutationSpec, SourceSpec,
};
