//! Demand profile aggregation
//!
//! Stores carry the configured customer demand directly. Upstream nodes see
//! the sum of their immediate downstream profiles: means add, variances add
//! (independence assumption), so the standard deviation is the root of the
//! summed variances, not the sum of standard deviations.

use std::collections::BTreeMap;

use crate::models::{Node, NodeType, SimulationConfig};

/// Gaussian daily demand seen by one (node, item) pair
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DemandProfile {
    pub mean: f64,
    pub variance: f64,
}

impl DemandProfile {
    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }

    fn add(&mut self, mean: f64, variance: f64) {
        self.mean += mean;
        self.variance += variance;
    }
}

/// Node name → item name → aggregated profile
pub type ProfileMap = BTreeMap<String, BTreeMap<String, DemandProfile>>;

/// Replenishment walk priority; downstream tiers order before upstream so
/// that a day's orders propagate up the chain within that same day
pub fn tier_priority(node_type: NodeType) -> u8 {
    match node_type {
        NodeType::Store => 0,
        NodeType::Warehouse => 1,
        NodeType::Factory => 2,
        NodeType::Material => 3,
    }
}

/// Node names sorted by (tier priority, name)
pub fn replenishment_order(config: &SimulationConfig) -> Vec<String> {
    let mut order: Vec<(u8, String)> = config
        .nodes
        .iter()
        .map(|node| (tier_priority(node.node_type()), node.name().to_string()))
        .collect();
    order.sort();
    order.into_iter().map(|(_, name)| name).collect()
}

/// Aggregate customer demand up the network
///
/// Material nodes are skipped: they replenish by reorder point, not by
/// service level, so no profile is needed for them.
pub fn build_demand_profiles(config: &SimulationConfig) -> ProfileMap {
    let mut profiles: ProfileMap = BTreeMap::new();

    // Stores: direct customer demand, duplicates merged additively.
    for demand in &config.customer_demand {
        profiles
            .entry(demand.store_name.clone())
            .or_default()
            .entry(demand.product_name.clone())
            .or_default()
            .add(demand.demand_mean, demand.demand_std_dev.powi(2));
    }

    // Upstream tiers in downstream-first order so each node sums profiles
    // that are already complete.
    let mut nodes: Vec<&Node> = config.nodes.iter().collect();
    nodes.sort_by_key(|node| (tier_priority(node.node_type()), node.name().to_string()));

    for node in nodes {
        if matches!(node.node_type(), NodeType::Store | NodeType::Material) {
            continue;
        }
        let mut aggregated: BTreeMap<String, DemandProfile> = BTreeMap::new();
        for link in &config.network {
            if link.from_node != node.name() {
                continue;
            }
            if let Some(downstream) = profiles.get(&link.to_node) {
                for (item, profile) in downstream {
                    aggregated
                        .entry(item.clone())
                        .or_default()
                        .add(profile.mean, profile.variance);
                }
            }
        }
        if !aggregated.is_empty() {
            profiles.insert(node.name().to_string(), aggregated);
        }
    }

    profiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CustomerDemand, FactoryNode, NodeCommon, StoreNode, TransportLink, WarehouseNode,
    };
    use std::collections::BTreeMap as Map;

    fn store(name: &str) -> Node {
        Node::Store(StoreNode {
            common: NodeCommon::new(name),
            service_level: 0.95,
            moq: Map::new(),
            order_multiple: Map::new(),
        })
    }

    fn warehouse(name: &str) -> Node {
        Node::Warehouse(WarehouseNode {
            common: NodeCommon::new(name),
            service_level: 0.95,
            moq: Map::new(),
            order_multiple: Map::new(),
        })
    }

    fn factory(name: &str) -> Node {
        Node::Factory(FactoryNode {
            common: NodeCommon::new(name),
            producible_products: vec!["P1".to_string()],
            service_level: 0.95,
            production_capacity: f64::INFINITY,
            production_cost_fixed: 0.0,
            production_cost_variable: 0.0,
            allow_production_over_capacity: true,
            production_over_capacity_fixed_cost: 0.0,
            production_over_capacity_variable_cost: 0.0,
            reorder_point: Map::new(),
            order_up_to_level: Map::new(),
            moq: Map::new(),
            order_multiple: Map::new(),
        })
    }

    fn two_store_config() -> SimulationConfig {
        SimulationConfig {
            planning_horizon: 10,
            nodes: vec![factory("F1"), warehouse("W1"), store("S1"), store("S2")],
            network: vec![
                TransportLink::new("F1", "W1"),
                TransportLink::new("W1", "S1"),
                TransportLink::new("W1", "S2"),
            ],
            customer_demand: vec![
                CustomerDemand::new("S1", "P1", 10.0, 3.0),
                CustomerDemand::new("S2", "P1", 20.0, 4.0),
            ],
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_warehouse_aggregates_variances_not_std_devs() {
        let profiles = build_demand_profiles(&two_store_config());
        let w1 = &profiles["W1"]["P1"];
        assert_eq!(w1.mean, 30.0);
        // sqrt(3^2 + 4^2) = 5, not 3 + 4 = 7
        assert!((w1.std_dev() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_factory_sees_warehouse_profile() {
        let profiles = build_demand_profiles(&two_store_config());
        let f1 = &profiles["F1"]["P1"];
        assert_eq!(f1.mean, 30.0);
        assert!((f1.variance - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_duplicate_store_demand_merges() {
        let mut config = two_store_config();
        config
            .customer_demand
            .push(CustomerDemand::new("S1", "P1", 5.0, 0.0));
        let profiles = build_demand_profiles(&config);
        assert_eq!(profiles["S1"]["P1"].mean, 15.0);
    }

    #[test]
    fn test_replenishment_order_is_downstream_first() {
        let order = replenishment_order(&two_store_config());
        assert_eq!(order, vec!["S1", "S2", "W1", "F1"]);
    }
}
