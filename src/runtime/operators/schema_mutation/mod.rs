pub mod schema_mutation_operator;

pub use schema_mutation_operator::SchemaMutationOperator;
