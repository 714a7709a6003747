use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::common::error::{AggWindowError, Result};
use crate::common::key::DEFAULT_VALUE_COLUMN;
use crate::interval::{Bounds, Window};
use crate::runtime::operators::aggregate_window::aggregates::AggregateKind;
use crate::runtime::operators::window::config::WindowSpec;

/// Configuration of the fused window-aggregate operator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateWindowSpec {
    pub window: WindowSpec,
    pub aggregate: AggregateKind,
    pub value_column: String,
    /// Represent each window by its start instead of its stop.
    pub use_start: bool,
    /// Materialize every window in bounds, including empty ones.
    pub force_aggregate: bool,
    pub bounds: Option<Bounds>,
}

impl Default for AggregateWindowSpec {
    fn default() -> Self {
        Self {
            window: WindowSpec::default(),
            aggregate: AggregateKind::Count,
            value_column: DEFAULT_VALUE_COLUMN.to_string(),
            use_start: false,
            force_aggregate: false,
            bounds: None,
        }
    }
}

impl AggregateWindowSpec {
    pub fn new(window: WindowSpec, aggregate: AggregateKind, value_column: &str) -> Self {
        Self {
            window,
            aggregate,
            value_column: value_column.to_string(),
            ..Default::default()
        }
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_use_start(mut self, use_start: bool) -> Self {
        self.use_start = use_start;
        self
    }

    pub fn with_force_aggregate(mut self, force_aggregate: bool) -> Self {
        self.force_aggregate = force_aggregate;
        self
    }

    /// Whether windows without rows are emitted.
    pub fn fills_empty(&self) -> bool {
        self.window.create_empty || self.force_aggregate
    }

    pub fn validate(&self) -> Result<(Window, Bounds)> {
        let window = self.window.window()?;
        let bounds = self
            .bounds
            .ok_or_else(|| AggWindowError::invalid("nil bounds passed to window; use range to set the window range"))?;
        if bounds.start > bounds.stop {
            return Err(AggWindowError::invalid(format!("bounds start is after stop: {}", bounds)));
        }
        Ok((window, bounds))
    }

    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        let spec: Self = serde_json::from_str(s).context("parsing aggregate window spec from json")?;
        spec.validate().context("validating aggregate window spec")?;
        Ok(spec)
    }

    pub fn from_yaml_str(s: &str) -> anyhow::Result<Self> {
        let spec: Self = serde_yaml::from_str(s).context("parsing aggregate window spec from yaml")?;
        spec.validate().context("validating aggregate window spec")?;
        Ok(spec)
    }
}
