use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use petgraph::stable_graph::NodeIndex;
use tracing::{debug, info, warn};

use crate::api::optimizer::{OptimizerConfig, PlanOptimizer};
use crate::api::plan::{PlanGraph, ProcedureSpec};
use crate::common::error::AggWindowError;
use crate::common::key::GroupKey;
use crate::common::table_chunk::TableChunk;
use crate::interval::Bounds;
use crate::runtime::operators::operator::{Operator, OperatorTrait};

/// Tables reaching the yields of a plan, and the group keys that were dropped on the way.
#[derive(Debug, Default)]
pub struct PlanOutput {
    pub tables: Vec<TableChunk>,
    pub failures: Vec<(GroupKey, AggWindowError)>,
}

/// Runs `plan` over its in-memory sources.
///
/// `bounds` are the global query bounds used by window nodes and by fused nodes that carry none.
/// A failure confined to one group key drops that key and is listed in `failures`; any other
/// failure aborts the plan.
pub fn execute_plan(plan: &PlanGraph, bounds: Option<Bounds>) -> Result<PlanOutput> {
    let order = plan.topological_order().context("plan contains a cycle")?;
    let mut outputs: HashMap<NodeIndex, Vec<TableChunk>> = HashMap::new();
    let mut result = PlanOutput::default();

    for idx in order {
        let node = plan.node(idx).context("plan node vanished during execution")?;
        let input = match plan.predecessors(idx).as_slice() {
            [] => Vec::new(),
            [pred] => outputs.get(pred).cloned().unwrap_or_default(),
            preds => bail!("node {} has {} inputs; only linear plans can be executed", node.spec, preds.len()),
        };

        let output = match &node.spec {
            ProcedureSpec::Source(source) => source
                .tables
                .iter()
                .map(|t| TableChunk::with_key_columns(t.key.clone(), &t.data_columns()?))
                .collect::<crate::common::Result<Vec<_>>>()
                .context("normalizing source tables")?,
            ProcedureSpec::Yield(name) => {
                debug!("yield {}: {} tables", name, input.len());
                result.tables.extend(input);
                continue;
            }
            spec => run_operator(spec, bounds, input, &mut result.failures).with_context(|| format!("executing {}", spec))?,
        };
        outputs.insert(idx, output);
    }
    Ok(result)
}

fn run_operator(
    spec: &ProcedureSpec,
    bounds: Option<Bounds>,
    input: Vec<TableChunk>,
    failures: &mut Vec<(GroupKey, AggWindowError)>,
) -> Result<Vec<TableChunk>> {
    let Some(mut op) = Operator::from_spec(spec, bounds)? else {
        return Ok(input);
    };
    let num_in = input.len();
    let num_failed = failures.len();
    let mut out = Vec::new();
    for table in input {
        let key = table.key.clone();
        match op.process_table(table) {
            Ok(tables) => out.extend(tables),
            Err(e) => {
                warn!("{} failed for key {}: {}", spec, key, e);
                failures.push((key, e));
            }
        }
    }
    out.extend(op.finish()?);
    failures.extend(op.take_failures());
    debug!(
        "{} ({:?}): {} tables in, {} tables out, {} keys failed",
        spec,
        op.operator_type(),
        num_in,
        out.len(),
        failures.len() - num_failed
    );
    Ok(out)
}

/// Optimizes a copy of `plan` according to `config`, then executes it.
pub fn run_plan(plan: &PlanGraph, config: &OptimizerConfig, bounds: Option<Bounds>) -> Result<PlanOutput> {
    let mut plan = plan.clone();
    let rewrites = PlanOptimizer::new(config).optimize(&mut plan).context("optimizing plan")?;
    info!("executing plan with {} nodes after {} rewrites", plan.len(), rewrites);
    execute_plan(&plan, bounds)
}
