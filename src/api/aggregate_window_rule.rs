use petgraph::stable_graph::NodeIndex;
use tracing::debug;

use crate::api::optimizer::PlanRule;
use crate::api::pattern::Pattern;
use crate::api::plan::{AggregateSpec, Mutation, PlanGraph, ProcedureKind, ProcedureSpec};
use crate::common::error::{AggWindowError, Result};
use crate::common::key::{DEFAULT_START_COLUMN, DEFAULT_STOP_COLUMN, DEFAULT_TIME_COLUMN};
use crate::runtime::operators::aggregate_window::{AggregateKind, AggregateWindowSpec};
use crate::runtime::operators::window::config::WindowSpec;

/// Fuses `window |> agg |> [fill] |> duplicate |> window(every: inf)` into one aggregate window node.
///
/// The two registered variants differ only in whether the fill stage must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateWindowRule {
    require_fill: bool,
}

struct MatchedChain {
    nodes: Vec<NodeIndex>,
    outer: NodeIndex,
    parent: NodeIndex,
    inner: WindowSpec,
    aggregate: AggregateKind,
    column: String,
    use_start: bool,
}

impl AggregateWindowRule {
    pub fn with_fill() -> Self {
        Self { require_fill: true }
    }

    pub fn without_fill() -> Self {
        Self { require_fill: false }
    }

    fn single_pred(plan: &PlanGraph, node: NodeIndex) -> Option<NodeIndex> {
        match plan.predecessors(node).as_slice() {
            [p] => Some(*p),
            _ => None,
        }
    }

    fn match_chain(&self, plan: &PlanGraph, root: NodeIndex) -> Result<Option<MatchedChain>> {
        let missing = || AggWindowError::internal("matched plan node disappeared");

        let Some(dup) = Self::single_pred(plan, root) else { return Ok(None) };
        let below_dup = Self::single_pred(plan, dup).ok_or_else(missing)?;
        let (fill, agg) = if self.require_fill {
            (Some(below_dup), Self::single_pred(plan, below_dup).ok_or_else(missing)?)
        } else {
            (None, below_dup)
        };
        let inner = Self::single_pred(plan, agg).ok_or_else(missing)?;
        let parent = Self::single_pred(plan, inner).ok_or_else(missing)?;

        let mut nodes = vec![root, dup];
        nodes.extend(fill);
        nodes.extend([agg, inner]);
        // intermediate results must not be consumed anywhere else
        if nodes[1..].iter().any(|n| plan.successors(*n).len() != 1) {
            return Ok(None);
        }

        let Some(ProcedureSpec::Window(outer_spec)) = plan.spec(root) else { return Ok(None) };
        if !is_valid_window_inf_spec(outer_spec) {
            return Ok(None);
        }
        let Some(ProcedureSpec::SchemaMutation(mutation)) = plan.spec(dup) else { return Ok(None) };
        let Some(use_start) = is_valid_duplicate_spec(&mutation.mutations) else { return Ok(None) };
        let (aggregate, agg_spec) = match plan.spec(agg) {
            Some(ProcedureSpec::Count(s)) => (AggregateKind::Count, s),
            Some(ProcedureSpec::Sum(s)) => (AggregateKind::Sum, s),
            Some(ProcedureSpec::Mean(s)) => (AggregateKind::Mean, s),
            _ => return Ok(None),
        };
        let Some(column) = is_valid_aggregate_spec(agg_spec) else { return Ok(None) };
        let Some(ProcedureSpec::Window(inner_spec)) = plan.spec(inner) else { return Ok(None) };
        if !is_valid_window_spec(inner_spec) {
            return Ok(None);
        }
        // Without a fill stage, empty windows never reach the output upstream of the fusion.
        if !self.require_fill && inner_spec.create_empty {
            return Ok(None);
        }

        Ok(Some(MatchedChain {
            nodes,
            outer: root,
            parent,
            inner: inner_spec.clone(),
            aggregate,
            column,
            use_start,
        }))
    }
}

fn is_valid_window_inf_spec(spec: &WindowSpec) -> bool {
    spec.has_default_columns() && !spec.create_empty && spec.is_infinite()
}

/// The duplicate must copy the window start or stop into the time column; returns `use_start`.
fn is_valid_duplicate_spec(mutations: &[Mutation]) -> Option<bool> {
    match mutations {
        [Mutation::Duplicate { column, as_name }] if as_name == DEFAULT_TIME_COLUMN => match column.as_str() {
            DEFAULT_START_COLUMN => Some(true),
            DEFAULT_STOP_COLUMN => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn is_valid_aggregate_spec(spec: &AggregateSpec) -> Option<String> {
    match spec.columns.as_slice() {
        [column] => Some(column.clone()),
        _ => None,
    }
}

fn is_valid_window_spec(spec: &WindowSpec) -> bool {
    spec.has_default_columns() && !spec.is_infinite()
}

impl PlanRule for AggregateWindowRule {
    fn name(&self) -> &str {
        if self.require_fill {
            "AggregateWindowCreateEmptyRule"
        } else {
            "AggregateWindowRule"
        }
    }

    fn pattern(&self) -> Pattern {
        let inner = Pattern::kind(ProcedureKind::Window, vec![Pattern::Any]);
        let agg = Pattern::one_of(
            vec![ProcedureKind::Count, ProcedureKind::Sum, ProcedureKind::Mean],
            vec![inner],
        );
        let below_dup = if self.require_fill {
            Pattern::kind(ProcedureKind::Fill, vec![agg])
        } else {
            agg
        };
        Pattern::kind(
            ProcedureKind::Window,
            vec![Pattern::kind(ProcedureKind::SchemaMutation, vec![below_dup])],
        )
    }

    fn rewrite(&self, plan: &mut PlanGraph, node: NodeIndex) -> Result<Option<NodeIndex>> {
        let Some(chain) = self.match_chain(plan, node)? else {
            return Ok(None);
        };
        let spec = AggregateWindowSpec {
            window: chain.inner,
            aggregate: chain.aggregate,
            value_column: chain.column,
            use_start: chain.use_start,
            force_aggregate: self.require_fill,
            bounds: None,
        };
        let fused = ProcedureSpec::AggregateWindow(spec);
        debug!("{} fusing {} plan nodes into {}", self.name(), chain.nodes.len(), fused);

        let successors = plan.successors(chain.outer);
        let fused_idx = plan.add_node(fused);
        plan.add_edge(chain.parent, fused_idx);
        for succ in successors {
            plan.add_edge(fused_idx, succ);
        }
        for n in chain.nodes {
            plan.remove_node(n);
        }
        Ok(Some(fused_idx))
    }
}
