use std::fmt;
use std::sync::Arc;

use petgraph::stable_graph::NodeIndex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::aggregate_window_rule::AggregateWindowRule;
use crate::api::pattern::Pattern;
use crate::api::plan::PlanGraph;
use crate::common::error::{AggWindowError, Result};

const MAX_PASSES: usize = 1024;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub optimize_aggregate_window: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            optimize_aggregate_window: true,
        }
    }
}

/// A physical plan rewrite triggered by a structural pattern.
pub trait PlanRule: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn pattern(&self) -> Pattern;

    /// Rewrites the fragment rooted at `node`. Returns the replacement node, or `None` to leave the plan untouched.
    fn rewrite(&self, plan: &mut PlanGraph, node: NodeIndex) -> Result<Option<NodeIndex>>;
}

/// Both aggregate window fusion rules; the fill variant is tried first.
pub fn aggregate_window_rules() -> Vec<Arc<dyn PlanRule>> {
    vec![
        Arc::new(AggregateWindowRule::with_fill()),
        Arc::new(AggregateWindowRule::without_fill()),
    ]
}

#[derive(Debug, Default)]
pub struct PlanOptimizer {
    rules: Vec<Arc<dyn PlanRule>>,
}

impl PlanOptimizer {
    pub fn new(config: &OptimizerConfig) -> Self {
        let mut rules = Vec::new();
        if config.optimize_aggregate_window {
            rules.extend(aggregate_window_rules());
        }
        Self { rules }
    }

    pub fn with_rules(rules: Vec<Arc<dyn PlanRule>>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Arc<dyn PlanRule>] {
        &self.rules
    }

    /// Applies rules until no rule fires. Returns the number of rewrites.
    pub fn optimize(&self, plan: &mut PlanGraph) -> Result<usize> {
        let mut rewrites = 0;
        for _ in 0..MAX_PASSES {
            if !self.apply_once(plan)? {
                if rewrites > 0 {
                    info!("plan optimizer applied {} rewrites", rewrites);
                }
                return Ok(rewrites);
            }
            rewrites += 1;
        }
        Err(AggWindowError::internal(format!(
            "plan optimizer did not converge after {} rewrites",
            MAX_PASSES
        )))
    }

    fn apply_once(&self, plan: &mut PlanGraph) -> Result<bool> {
        let order = plan
            .topological_order()
            .ok_or_else(|| AggWindowError::invalid("plan contains a cycle"))?;
        for node in order.into_iter().rev() {
            for rule in &self.rules {
                let pattern = rule.pattern();
                if !pattern.matches(plan, node) {
                    continue;
                }
                if let Some(replacement) = rule.rewrite(plan, node)? {
                    debug!("rule {} rewrote node {:?} into {:?}", rule.name(), node, replacement);
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

/// Runs `rules` over `plan` to a fixpoint.
pub fn apply_rules(plan: &mut PlanGraph, rules: Vec<Arc<dyn PlanRule>>) -> Result<usize> {
    PlanOptimizer::with_rules(rules).optimize(plan)
}
