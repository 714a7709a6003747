use petgraph::stable_graph::NodeIndex;

use crate::api::plan::{PlanGraph, ProcedureKind};

/// Shape of a plan fragment, described from its most downstream node upwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// Any node.
    Any,
    /// A node of one of `kinds` whose predecessors match `preds` in order.
    Kind { kinds: Vec<ProcedureKind>, preds: Vec<Pattern> },
}

impl Pattern {
    pub fn kind(kind: ProcedureKind, preds: Vec<Pattern>) -> Self {
        Pattern::Kind { kinds: vec![kind], preds }
    }

    pub fn one_of(kinds: Vec<ProcedureKind>, preds: Vec<Pattern>) -> Self {
        Pattern::Kind { kinds, preds }
    }

    /// Kinds a matching root may have; empty means any.
    pub fn root_kinds(&self) -> &[ProcedureKind] {
        match self {
            Pattern::Any => &[],
            Pattern::Kind { kinds, .. } => kinds,
        }
    }

    pub fn matches(&self, plan: &PlanGraph, node: NodeIndex) -> bool {
        let Some(spec) = plan.spec(node) else {
            return false;
        };
        match self {
            Pattern::Any => true,
            Pattern::Kind { kinds, preds } => {
                if !kinds.contains(&spec.kind()) {
                    return false;
                }
                let actual = plan.predecessors(node);
                actual.len() == preds.len() && preds.iter().zip(actual).all(|(p, n)| p.matches(plan, n))
            }
        }
    }
}
