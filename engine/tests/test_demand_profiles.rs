//! Demand aggregation across a two-tier distribution tree

use std::collections::BTreeMap;

use supply_simulator_core_rs::profiles::{build_demand_profiles, replenishment_order};
use supply_simulator_core_rs::{
    CustomerDemand, FactoryNode, Node, NodeCommon, Product, SimulationConfig, StoreNode,
    TransportLink, WarehouseNode,
};

fn store(name: &str) -> Node {
    let mut common = NodeCommon::new(name);
    common.initial_stock.insert("FG".to_string(), 10.0);
    Node::Store(StoreNode {
        common,
        service_level: 0.95,
        moq: BTreeMap::new(),
        order_multiple: BTreeMap::new(),
    })
}

fn warehouse(name: &str) -> Node {
    let mut common = NodeCommon::new(name);
    common.initial_stock.insert("FG".to_string(), 50.0);
    Node::Warehouse(WarehouseNode {
        common,
        service_level: 0.9,
        moq: BTreeMap::new(),
        order_multiple: BTreeMap::new(),
    })
}

fn factory(name: &str) -> Node {
    Node::Factory(FactoryNode {
        common: NodeCommon::new(name),
        producible_products: vec!["FG".to_string()],
        service_level: 0.9,
        production_capacity: f64::INFINITY,
        production_cost_fixed: 0.0,
        production_cost_variable: 0.0,
        allow_production_over_capacity: true,
        production_over_capacity_fixed_cost: 0.0,
        production_over_capacity_variable_cost: 0.0,
        reorder_point: BTreeMap::new(),
        order_up_to_level: BTreeMap::new(),
        moq: BTreeMap::new(),
        order_multiple: BTreeMap::new(),
    })
}

fn tree_config() -> SimulationConfig {
    SimulationConfig {
        planning_horizon: 10,
        products: vec![Product::new("FG")],
        nodes: vec![
            factory("F1"),
            warehouse("W1"),
            warehouse("W2"),
            store("S1"),
            store("S2"),
            store("S3"),
        ],
        network: vec![
            TransportLink::new("F1", "W1"),
            TransportLink::new("F1", "W2"),
            TransportLink::new("W1", "S1"),
            TransportLink::new("W1", "S2"),
            TransportLink::new("W2", "S3"),
        ],
        customer_demand: vec![
            CustomerDemand::new("S1", "FG", 10.0, 3.0),
            CustomerDemand::new("S2", "FG", 20.0, 4.0),
            CustomerDemand::new("S3", "FG", 5.0, 12.0),
        ],
        ..SimulationConfig::default()
    }
}

#[test]
fn test_warehouses_aggregate_their_own_stores_only() {
    let profiles = build_demand_profiles(&tree_config());

    let w1 = &profiles["W1"]["FG"];
    assert_eq!(w1.mean, 30.0);
    assert!((w1.std_dev() - 5.0).abs() < 1e-12);

    let w2 = &profiles["W2"]["FG"];
    assert_eq!(w2.mean, 5.0);
    assert!((w2.std_dev() - 12.0).abs() < 1e-12);
}

#[test]
fn test_factory_aggregates_both_warehouses() {
    let profiles = build_demand_profiles(&tree_config());
    let f1 = &profiles["F1"]["FG"];
    assert_eq!(f1.mean, 35.0);
    // var = 9 + 16 + 144
    assert!((f1.variance - 169.0).abs() < 1e-12);
    assert!((f1.std_dev() - 13.0).abs() < 1e-12);
}

#[test]
fn test_unsupplied_node_has_no_profile() {
    let mut config = tree_config();
    // Detach W2 from its store: its aggregate becomes empty.
    config.network.retain(|l| l.to_node != "S3");
    let profiles = build_demand_profiles(&config);
    assert!(profiles.get("W2").is_none());
    let f1 = &profiles["F1"]["FG"];
    assert_eq!(f1.mean, 30.0);
}

#[test]
fn test_walk_order_visits_downstream_tiers_first() {
    let order = replenishment_order(&tree_config());
    assert_eq!(order, vec!["S1", "S2", "S3", "W1", "W2", "F1"]);
}
