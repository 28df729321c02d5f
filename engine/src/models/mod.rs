//! Domain types for the supply chain simulation
//!
//! - `node`: the four network node variants (store/warehouse/material/factory)
//! - `network`: directed transport links between nodes
//! - `product`: sellable items and their (configuration-only) BOMs
//! - `demand`: per-store Gaussian customer demand definitions
//! - `config`: the complete simulation input plus fail-fast validation
//! - `snapshot`: immutable per-day output records

pub mod config;
pub mod demand;
pub mod network;
pub mod node;
pub mod product;
pub mod snapshot;

pub use config::{ConfigError, SimulationConfig};
pub use demand::CustomerDemand;
pub use network::TransportLink;
pub use node::{FactoryNode, MaterialNode, Node, NodeCommon, NodeType, StoreNode, WarehouseNode};
pub use product::{BomItem, Product};
pub use snapshot::{DailySnapshot, ItemDayRecord};
