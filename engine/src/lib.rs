//! Supply Chain Simulator Core - Rust Engine
//!
//! Discrete-time, multi-echelon supply chain simulation with deterministic
//! execution and an audit-grade cost trace.
//!
//! # Architecture
//!
//! - **models**: Domain types (nodes, links, products, demand, config)
//! - **profiles**: Demand aggregation up the network
//! - **policy**: Replenishment policies and order sizing constraints
//! - **engine**: The day-stepper simulation loop
//! - **costs**: Cost trace, daily P&L, reconciliation
//! - **jobs**: FIFO job queue with a worker pool
//! - **rng**: Deterministic random number generation
//! - **digest**: SHA256 digests over run outputs
//!
//! # Critical Invariants
//!
//! 1. Stock quantities never go negative
//! 2. All randomness is deterministic (seeded RNG)
//! 3. The cost trace replays to the exact daily P&L (1e-6 tolerance)

// Module declarations
pub mod costs;
pub mod digest;
pub mod engine;
pub mod jobs;
pub mod models;
pub mod policy;
pub mod profiles;
pub mod rng;
pub mod stats;

// Re-exports for convenience
pub use costs::{
    CostAccount, CostEntry, CostEventKind, DailyProfitLoss, FlowCosts, PenaltyCosts,
    ReconciliationError, StockCosts,
};
pub use digest::{config_digest, result_digest};
pub use engine::{ShortageItem, Simulation, SimulationSummary};
pub use jobs::{JobError, JobManager, JobRecord, JobStatus};
pub use models::{
    ConfigError, CustomerDemand, DailySnapshot, FactoryNode, ItemDayRecord, MaterialNode, Node,
    NodeCommon, NodeType, Product, SimulationConfig, StoreNode, TransportLink, WarehouseNode,
};
pub use rng::RngManager;
