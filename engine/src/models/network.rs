//! Directed transport links between nodes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_true() -> bool {
    true
}

fn default_unbounded() -> f64 {
    f64::INFINITY
}

/// A directed transport arc between two nodes
///
/// Identity is the (from_node, to_node) pair; valid configurations never
/// contain two links with the same pair, and links only ever point
/// downstream (material → factory → warehouse → store). Topology is the
/// loader's responsibility; the engine only checks referential integrity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportLink {
    pub from_node: String,
    pub to_node: String,

    #[serde(default)]
    pub transportation_cost_fixed: f64,
    #[serde(default)]
    pub transportation_cost_variable: f64,

    /// Transit days between order placement and arrival
    #[serde(default)]
    pub lead_time: u32,

    /// Daily shipping capacity across this arc (unbounded by default)
    #[serde(default = "default_unbounded")]
    pub capacity_per_day: f64,

    /// Whether shipments may exceed `capacity_per_day` (surcharged) or are
    /// truncated at the cap
    #[serde(default = "default_true")]
    pub allow_over_capacity: bool,

    #[serde(default)]
    pub over_capacity_fixed_cost: f64,
    #[serde(default)]
    pub over_capacity_variable_cost: f64,

    /// Per-item minimum order quantity on this arc
    #[serde(default)]
    pub moq: BTreeMap<String, f64>,

    /// Per-item order multiple on this arc
    #[serde(default)]
    pub order_multiple: BTreeMap<String, f64>,
}

impl TransportLink {
    pub fn new(from_node: impl Into<String>, to_node: impl Into<String>) -> Self {
        Self {
            from_node: from_node.into(),
            to_node: to_node.into(),
            transportation_cost_fixed: 0.0,
            transportation_cost_variable: 0.0,
            lead_time: 0,
            capacity_per_day: f64::INFINITY,
            allow_over_capacity: true,
            over_capacity_fixed_cost: 0.0,
            over_capacity_variable_cost: 0.0,
            moq: BTreeMap::new(),
            order_multiple: BTreeMap::new(),
        }
    }

    pub fn with_lead_time(mut self, days: u32) -> Self {
        self.lead_time = days;
        self
    }

    pub fn moq_for(&self, item: &str) -> f64 {
        self.moq.get(item).copied().unwrap_or(0.0)
    }

    pub fn order_multiple_for(&self, item: &str) -> f64 {
        self.order_multiple.get(item).copied().unwrap_or(0.0)
    }
}
