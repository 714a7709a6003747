use std::fmt;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;

use crate::common::table_chunk::TableChunk;
use crate::runtime::operators::aggregate_window::AggregateWindowSpec;
use crate::runtime::operators::window::config::WindowSpec;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Duplicate { column: String, as_name: String },
    Rename { from: String, to: String },
    Drop { columns: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaMutationSpec {
    pub mutations: Vec<Mutation>,
}

impl SchemaMutationSpec {
    pub fn duplicate(column: &str, as_name: &str) -> Self {
        Self {
            mutations: vec![Mutation::Duplicate {
                column: column.to_string(),
                as_name: as_name.to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSpec {
    pub columns: Vec<String>,
}

impl AggregateSpec {
    pub fn new(column: &str) -> Self {
        Self {
            columns: vec![column.to_string()],
        }
    }
}

/// In-memory tables feeding a plan.
#[derive(Debug, Clone, Default)]
pub struct SourceSpec {
    pub tables: Vec<TableChunk>,
}

#[derive(Debug, Clone)]
pub enum ProcedureSpec {
    Source(SourceSpec),
    Window(WindowSpec),
    SchemaMutation(SchemaMutationSpec),
    Fill,
    Count(AggregateSpec),
    Sum(AggregateSpec),
    Mean(AggregateSpec),
    AggregateWindow(AggregateWindowSpec),
    Yield(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcedureKind {
    Source,
    Window,
    SchemaMutation,
    Fill,
    Count,
    Sum,
    Mean,
    AggregateWindow,
    Yield,
}

impl ProcedureSpec {
    pub fn kind(&self) -> ProcedureKind {
        match self {
            ProcedureSpec::Source(_) => ProcedureKind::Source,
            ProcedureSpec::Window(_) => ProcedureKind::Window,
            ProcedureSpec::SchemaMutation(_) => ProcedureKind::SchemaMutation,
            ProcedureSpec::Fill => ProcedureKind::Fill,
            ProcedureSpec::Count(_) => ProcedureKind::Count,
            ProcedureSpec::Sum(_) => ProcedureKind::Sum,
            ProcedureSpec::Mean(_) => ProcedureKind::Mean,
            ProcedureSpec::AggregateWindow(_) => ProcedureKind::AggregateWindow,
            ProcedureSpec::Yield(_) => ProcedureKind::Yield,
        }
    }
}

impl fmt::Display for ProcedureSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcedureSpec::Source(s) => write!(f, "Source({} tables)", s.tables.len()),
            ProcedureSpec::Window(w) => write!(f, "Window(every: {}, period: {}, offset: {})", w.every, w.period, w.offset),
            ProcedureSpec::SchemaMutation(m) => write!(f, "SchemaMutation({:?})", m.mutations),
            ProcedureSpec::Fill => write!(f, "Fill"),
            ProcedureSpec::Count(a) => write!(f, "Count({})", a.columns.join(",")),
            ProcedureSpec::Sum(a) => write!(f, "Sum({})", a.columns.join(",")),
            ProcedureSpec::Mean(a) => write!(f, "Mean({})", a.columns.join(",")),
            ProcedureSpec::AggregateWindow(s) => write!(
                f,
                "AggregateWindow({}, column: {}, every: {}, use_start: {}, force: {})",
                s.aggregate, s.value_column, s.window.every, s.use_start, s.force_aggregate
            ),
            ProcedureSpec::Yield(name) => write!(f, "Yield({})", name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlanNode {
    pub node_id: u32,
    pub spec: ProcedureSpec,
}

/// Dataflow plan. Edges point from producer to consumer.
#[derive(Debug, Clone, Default)]
pub struct PlanGraph {
    graph: StableDiGraph<PlanNode, ()>,
    node_counter: u32,
}

impl PlanGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A straight chain, first spec upstream.
    pub fn linear(specs: Vec<ProcedureSpec>) -> Self {
        let mut plan = Self::new();
        let mut prev: Option<NodeIndex> = None;
        for spec in specs {
            let idx = plan.add_node(spec);
            if let Some(p) = prev {
                plan.add_edge(p, idx);
            }
            prev = Some(idx);
        }
        plan
    }

    pub fn add_node(&mut self, spec: ProcedureSpec) -> NodeIndex {
        let node = PlanNode {
            node_id: self.node_counter,
            spec,
        };
        self.node_counter += 1;
        self.graph.add_node(node)
    }

    pub fn add_edge(&mut self, source: NodeIndex, target: NodeIndex) {
        self.graph.add_edge(source, target, ());
    }

    pub fn remove_node(&mut self, idx: NodeIndex) -> Option<PlanNode> {
        self.graph.remove_node(idx)
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&PlanNode> {
        self.graph.node_weight(idx)
    }

    pub fn spec(&self, idx: NodeIndex) -> Option<&ProcedureSpec> {
        self.node(idx).map(|n| &n.spec)
    }

    pub fn node_indices(&self) -> Vec<NodeIndex> {
        self.graph.node_indices().collect()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Upstream neighbours, in insertion order.
    pub fn predecessors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut preds: Vec<NodeIndex> = self.graph.neighbors_directed(idx, Direction::Incoming).collect();
        preds.reverse();
        preds
    }

    /// Downstream neighbours, in insertion order.
    pub fn successors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut succs: Vec<NodeIndex> = self.graph.neighbors_directed(idx, Direction::Outgoing).collect();
        succs.reverse();
        succs
    }

    /// Nodes in dependency order, or `None` if the plan has a cycle.
    pub fn topological_order(&self) -> Option<Vec<NodeIndex>> {
        petgraph::algo::toposort(&self.graph, None).ok()
    }

    pub fn kinds(&self) -> Vec<ProcedureKind> {
        self.topological_order()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|idx| self.spec(idx).map(ProcedureSpec::kind))
            .collect()
    }
}
