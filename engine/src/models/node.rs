//! Network node variants
//!
//! The four echelons share a common attribute block (`NodeCommon`) and add
//! variant-specific policy parameters. Dispatch is by variant tag: the
//! day-stepper matches on `Node` rather than inspecting types at runtime.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_true() -> bool {
    true
}

fn default_unbounded() -> f64 {
    f64::INFINITY
}

fn default_lead_time() -> u32 {
    1
}

fn default_service_level() -> f64 {
    0.95
}

/// Echelon tag, also the tier key used in cost bucketing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Store,
    Warehouse,
    Factory,
    Material,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Store => "store",
            NodeType::Warehouse => "warehouse",
            NodeType::Factory => "factory",
            NodeType::Material => "material",
        }
    }
}

/// Attributes shared by all node variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeCommon {
    pub name: String,

    /// Item → opening stock; also defines which items the node manages
    #[serde(default)]
    pub initial_stock: BTreeMap<String, f64>,

    /// Production lead time for factories; unused by other variants
    #[serde(default = "default_lead_time")]
    pub lead_time: u32,

    /// Review period R in days (0 = continuous review)
    #[serde(default)]
    pub review_period_days: u32,

    #[serde(default)]
    pub storage_cost_fixed: f64,
    #[serde(default)]
    pub storage_cost_variable: BTreeMap<String, f64>,

    /// Whether unmet downstream demand is re-queued as a backorder shipment
    #[serde(default = "default_true")]
    pub backorder_enabled: bool,

    /// If true, unmet end-customer demand is discarded instead of queued
    #[serde(default)]
    pub lost_sales: bool,

    #[serde(default)]
    pub stockout_cost_per_unit: f64,
    #[serde(default)]
    pub backorder_cost_per_unit_per_day: f64,

    /// Storage capacity bounding quantity *added* in a single day, not
    /// cumulative stock
    #[serde(default = "default_unbounded")]
    pub storage_capacity: f64,
    #[serde(default = "default_true")]
    pub allow_storage_over_capacity: bool,
    #[serde(default)]
    pub storage_over_capacity_fixed_cost: f64,
    #[serde(default)]
    pub storage_over_capacity_variable_cost: f64,
}

impl NodeCommon {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            initial_stock: BTreeMap::new(),
            lead_time: 1,
            review_period_days: 0,
            storage_cost_fixed: 0.0,
            storage_cost_variable: BTreeMap::new(),
            backorder_enabled: true,
            lost_sales: false,
            stockout_cost_per_unit: 0.0,
            backorder_cost_per_unit_per_day: 0.0,
            storage_capacity: f64::INFINITY,
            allow_storage_over_capacity: true,
            storage_over_capacity_fixed_cost: 0.0,
            storage_over_capacity_variable_cost: 0.0,
        }
    }
}

/// Retail endpoint facing end-customer demand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreNode {
    #[serde(flatten)]
    pub common: NodeCommon,

    #[serde(default = "default_service_level")]
    pub service_level: f64,

    #[serde(default)]
    pub moq: BTreeMap<String, f64>,
    #[serde(default)]
    pub order_multiple: BTreeMap<String, f64>,
}

/// Distribution tier between factories and stores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseNode {
    #[serde(flatten)]
    pub common: NodeCommon,

    #[serde(default = "default_service_level")]
    pub service_level: f64,

    #[serde(default)]
    pub moq: BTreeMap<String, f64>,
    #[serde(default)]
    pub order_multiple: BTreeMap<String, f64>,
}

/// Raw material supplier with per-item unit costs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialNode {
    #[serde(flatten)]
    pub common: NodeCommon,

    /// Item → purchase cost per unit, charged when shipping to a factory
    #[serde(default)]
    pub material_cost: BTreeMap<String, f64>,
}

/// Production site
///
/// Finished goods follow the service-level policy against the aggregated
/// downstream demand profile; component resupply follows an independent
/// reorder-point policy (`reorder_point` / `order_up_to_level`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactoryNode {
    #[serde(flatten)]
    pub common: NodeCommon,

    /// Finished goods this factory can produce
    pub producible_products: Vec<String>,

    #[serde(default = "default_service_level")]
    pub service_level: f64,

    #[serde(default = "default_unbounded")]
    pub production_capacity: f64,
    #[serde(default)]
    pub production_cost_fixed: f64,
    #[serde(default)]
    pub production_cost_variable: f64,
    #[serde(default = "default_true")]
    pub allow_production_over_capacity: bool,
    #[serde(default)]
    pub production_over_capacity_fixed_cost: f64,
    #[serde(default)]
    pub production_over_capacity_variable_cost: f64,

    /// Component item → reorder point
    #[serde(default)]
    pub reorder_point: BTreeMap<String, f64>,
    /// Component item → order-up-to level
    #[serde(default)]
    pub order_up_to_level: BTreeMap<String, f64>,

    #[serde(default)]
    pub moq: BTreeMap<String, f64>,
    #[serde(default)]
    pub order_multiple: BTreeMap<String, f64>,
}

/// A supply network node, dispatched by variant tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node_type", rename_all = "snake_case")]
pub enum Node {
    Store(StoreNode),
    Warehouse(WarehouseNode),
    Material(MaterialNode),
    Factory(FactoryNode),
}

impl Node {
    pub fn common(&self) -> &NodeCommon {
        match self {
            Node::Store(n) => &n.common,
            Node::Warehouse(n) => &n.common,
            Node::Material(n) => &n.common,
            Node::Factory(n) => &n.common,
        }
    }

    pub fn name(&self) -> &str {
        &self.common().name
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            Node::Store(_) => NodeType::Store,
            Node::Warehouse(_) => NodeType::Warehouse,
            Node::Material(_) => NodeType::Material,
            Node::Factory(_) => NodeType::Factory,
        }
    }

    /// Target service level, for variants that replenish by service level
    pub fn service_level(&self) -> Option<f64> {
        match self {
            Node::Store(n) => Some(n.service_level),
            Node::Warehouse(n) => Some(n.service_level),
            Node::Factory(n) => Some(n.service_level),
            Node::Material(_) => None,
        }
    }

    /// Node-level minimum order quantity for an item
    pub fn moq_for(&self, item: &str) -> f64 {
        let map = match self {
            Node::Store(n) => &n.moq,
            Node::Warehouse(n) => &n.moq,
            Node::Factory(n) => &n.moq,
            Node::Material(_) => return 0.0,
        };
        map.get(item).copied().unwrap_or(0.0)
    }

    /// Node-level order multiple for an item
    pub fn order_multiple_for(&self, item: &str) -> f64 {
        let map = match self {
            Node::Store(n) => &n.order_multiple,
            Node::Warehouse(n) => &n.order_multiple,
            Node::Factory(n) => &n.order_multiple,
            Node::Material(_) => return 0.0,
        };
        map.get(item).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_tagged_deserialization() {
        let json = r#"{
            "node_type": "store",
            "name": "S1",
            "initial_stock": {"P1": 100.0},
            "service_level": 0.9
        }"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(node.name(), "S1");
        assert_eq!(node.node_type(), NodeType::Store);
        assert_eq!(node.service_level(), Some(0.9));
        assert_eq!(node.common().initial_stock.get("P1"), Some(&100.0));
    }

    #[test]
    fn test_node_common_defaults() {
        let json = r#"{"node_type": "material", "name": "M1"}"#;
        let node: Node = serde_json::from_str(json).unwrap();
        let common = node.common();
        assert!(common.backorder_enabled);
        assert!(!common.lost_sales);
        assert!(common.storage_capacity.is_infinite());
        assert_eq!(common.lead_time, 1);
        assert_eq!(node.service_level(), None);
        assert_eq!(node.moq_for("X"), 0.0);
    }

    #[test]
    fn test_factory_policy_maps() {
        let json = r#"{
            "node_type": "factory",
            "name": "F1",
            "producible_products": ["P1"],
            "reorder_point": {"C1": 50.0},
            "order_up_to_level": {"C1": 200.0}
        }"#;
        let node: Node = serde_json::from_str(json).unwrap();
        match &node {
            Node::Factory(f) => {
                assert_eq!(f.reorder_point.get("C1"), Some(&50.0));
                assert_eq!(f.order_up_to_level.get("C1"), Some(&200.0));
                assert!(f.allow_production_over_capacity);
            }
            _ => panic!("expected factory"),
        }
    }
}
