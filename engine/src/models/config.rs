//! Simulation configuration and validation

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use super::demand::CustomerDemand;
use super::network::TransportLink;
use super::node::Node;
use super::product::Product;

fn default_schema_version() -> String {
    "1.0".to_string()
}

/// Errors detected by [`SimulationConfig::validate`]
///
/// Validation is fail-fast at construction; once a simulation starts it
/// never rejects the configuration again.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("planning_horizon must be at least 1 day")]
    ZeroHorizon,

    #[error("duplicate node name: {0}")]
    DuplicateNode(String),

    #[error("duplicate product name: {0}")]
    DuplicateProduct(String),

    #[error("link references unknown node: {0}")]
    UnknownLinkNode(String),

    #[error("duplicate link: {from} -> {to}")]
    DuplicateLink { from: String, to: String },

    #[error("customer demand references unknown store: {0}")]
    UnknownDemandStore(String),

    #[error("customer demand target {0} is not a store")]
    DemandTargetNotStore(String),

    #[error("customer demand for {store}/{item} has negative std dev {value}")]
    NegativeStdDev {
        store: String,
        item: String,
        value: f64,
    },

    #[error("node {node} has service_level {value} outside [0, 1]")]
    ServiceLevelOutOfRange { node: String, value: f64 },

    #[error("factory {factory} lists unknown producible product: {product}")]
    UnknownProducibleProduct { factory: String, product: String },
}

/// Complete input to one simulation run
///
/// # Example
///
/// ```
/// use supply_simulator_core_rs::models::{
///     CustomerDemand, Node, NodeCommon, Product, SimulationConfig, StoreNode,
/// };
/// use std::collections::BTreeMap;
///
/// let mut common = NodeCommon::new("S1");
/// common.initial_stock.insert("P1".to_string(), 100.0);
/// let config = SimulationConfig {
///     planning_horizon: 5,
///     products: vec![Product::new("P1")],
///     nodes: vec![Node::Store(StoreNode {
///         common,
///         service_level: 0.95,
///         moq: BTreeMap::new(),
///         order_multiple: BTreeMap::new(),
///     })],
///     customer_demand: vec![CustomerDemand::new("S1", "P1", 10.0, 0.0)],
///     ..SimulationConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Number of days to simulate
    pub planning_horizon: u32,

    #[serde(default)]
    pub products: Vec<Product>,

    #[serde(default)]
    pub nodes: Vec<Node>,

    #[serde(default)]
    pub network: Vec<TransportLink>,

    #[serde(default)]
    pub customer_demand: Vec<CustomerDemand>,

    /// Seed for the demand stream; `None` seeds from the wall clock
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            planning_horizon: 1,
            products: Vec::new(),
            nodes: Vec::new(),
            network: Vec::new(),
            customer_demand: Vec::new(),
            random_seed: None,
        }
    }
}

impl SimulationConfig {
    /// Check structural integrity before the engine accepts the config
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.planning_horizon == 0 {
            return Err(ConfigError::ZeroHorizon);
        }

        let mut product_names = BTreeSet::new();
        for product in &self.products {
            if !product_names.insert(product.name.as_str()) {
                return Err(ConfigError::DuplicateProduct(product.name.clone()));
            }
        }

        let mut node_names = BTreeSet::new();
        for node in &self.nodes {
            if !node_names.insert(node.name()) {
                return Err(ConfigError::DuplicateNode(node.name().to_string()));
            }
            if let Some(level) = node.service_level() {
                if !(0.0..=1.0).contains(&level) {
                    return Err(ConfigError::ServiceLevelOutOfRange {
                        node: node.name().to_string(),
                        value: level,
                    });
                }
            }
            if let Node::Factory(factory) = node {
                for product in &factory.producible_products {
                    if !product_names.contains(product.as_str()) {
                        return Err(ConfigError::UnknownProducibleProduct {
                            factory: factory.common.name.clone(),
                            product: product.clone(),
                        });
                    }
                }
            }
        }

        let mut arcs = BTreeSet::new();
        for link in &self.network {
            if !node_names.contains(link.from_node.as_str()) {
                return Err(ConfigError::UnknownLinkNode(link.from_node.clone()));
            }
            if !node_names.contains(link.to_node.as_str()) {
                return Err(ConfigError::UnknownLinkNode(link.to_node.clone()));
            }
            if !arcs.insert((link.from_node.as_str(), link.to_node.as_str())) {
                return Err(ConfigError::DuplicateLink {
                    from: link.from_node.clone(),
                    to: link.to_node.clone(),
                });
            }
        }

        for demand in &self.customer_demand {
            let node = self
                .nodes
                .iter()
                .find(|n| n.name() == demand.store_name)
                .ok_or_else(|| ConfigError::UnknownDemandStore(demand.store_name.clone()))?;
            if !matches!(node, Node::Store(_)) {
                return Err(ConfigError::DemandTargetNotStore(demand.store_name.clone()));
            }
            if demand.demand_std_dev < 0.0 {
                return Err(ConfigError::NegativeStdDev {
                    store: demand.store_name.clone(),
                    item: demand.product_name.clone(),
                    value: demand.demand_std_dev,
                });
            }
        }

        Ok(())
    }

    /// Look up a product by name
    pub fn product(&self, name: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.name == name)
    }

    /// Look up a node by name
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name() == name)
    }
}
