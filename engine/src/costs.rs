//! Cost accounting: trace entries, daily P&L, and reconciliation
//!
//! Every monetary amount the engine produces is emitted twice: once as an
//! append-only trace entry tagged with its P&L account, and once folded
//! into the daily profit-and-loss aggregate. Reconciliation replays the
//! trace and checks the two agree per day and per account.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::NodeType;

/// Tolerance for trace-versus-aggregate comparison
pub const RECONCILE_EPSILON: f64 = 1e-6;

// ============================================================================
// Accounts
// ============================================================================

/// P&L bucket a trace entry settles into
///
/// The account is the exact aggregate field, so replaying the trace
/// reconstructs the P&L without any further classification logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostAccount {
    Revenue,
    MaterialCost,
    MaterialTransportFixed,
    MaterialTransportVariable,
    WarehouseTransportFixed,
    WarehouseTransportVariable,
    StoreTransportFixed,
    StoreTransportVariable,
    ProductionFixed,
    ProductionVariable,
    MaterialStorageFixed,
    MaterialStorageVariable,
    FactoryStorageFixed,
    FactoryStorageVariable,
    WarehouseStorageFixed,
    WarehouseStorageVariable,
    StoreStorageFixed,
    StoreStorageVariable,
    PenaltyStockout,
    PenaltyBackorder,
}

impl CostAccount {
    /// Transport bucket for a shipment leaving a node of the given type
    ///
    /// Arc tiers follow the canonical chain: material→factory shipments are
    /// material transport, factory→warehouse are warehouse transport,
    /// warehouse→store are store transport.
    pub fn transport(origin: NodeType, fixed: bool) -> Self {
        match (origin, fixed) {
            (NodeType::Material, true) => CostAccount::MaterialTransportFixed,
            (NodeType::Material, false) => CostAccount::MaterialTransportVariable,
            (NodeType::Factory, true) => CostAccount::WarehouseTransportFixed,
            (NodeType::Factory, false) => CostAccount::WarehouseTransportVariable,
            (NodeType::Warehouse | NodeType::Store, true) => CostAccount::StoreTransportFixed,
            (NodeType::Warehouse | NodeType::Store, false) => CostAccount::StoreTransportVariable,
        }
    }

    /// Storage bucket for a node of the given type
    pub fn storage(node_type: NodeType, fixed: bool) -> Self {
        match (node_type, fixed) {
            (NodeType::Material, true) => CostAccount::MaterialStorageFixed,
            (NodeType::Material, false) => CostAccount::MaterialStorageVariable,
            (NodeType::Factory, true) => CostAccount::FactoryStorageFixed,
            (NodeType::Factory, false) => CostAccount::FactoryStorageVariable,
            (NodeType::Warehouse, true) => CostAccount::WarehouseStorageFixed,
            (NodeType::Warehouse, false) => CostAccount::WarehouseStorageVariable,
            (NodeType::Store, true) => CostAccount::StoreStorageFixed,
            (NodeType::Store, false) => CostAccount::StoreStorageVariable,
        }
    }
}

/// What physically happened to generate a trace entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostEventKind {
    Sale,
    MaterialPurchase,
    TransportFixed,
    TransportVariable,
    TransportOverageFixed,
    TransportOverageVariable,
    ProductionFixed,
    ProductionVariable,
    ProductionOverageFixed,
    ProductionOverageVariable,
    StorageFixed,
    StorageVariable,
    StorageOverageFixed,
    StorageOverageVariable,
    StockoutPenalty,
    BackorderPenalty,
}

/// One append-only cost trace row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEntry {
    pub day: u32,
    pub node: String,
    /// Item the amount is attributable to; `None` for node-level charges
    pub item: Option<String>,
    pub event: CostEventKind,
    pub quantity: f64,
    pub unit_cost: f64,
    pub amount: f64,
    pub account: CostAccount,
}

// ============================================================================
// Daily P&L
// ============================================================================

/// Transport and production cost taxonomy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowCosts {
    pub material_transport_fixed: f64,
    pub material_transport_variable: f64,
    pub warehouse_transport_fixed: f64,
    pub warehouse_transport_variable: f64,
    pub store_transport_fixed: f64,
    pub store_transport_variable: f64,
    pub production_fixed: f64,
    pub production_variable: f64,
}

impl FlowCosts {
    pub fn total(&self) -> f64 {
        self.material_transport_fixed
            + self.material_transport_variable
            + self.warehouse_transport_fixed
            + self.warehouse_transport_variable
            + self.store_transport_fixed
            + self.store_transport_variable
            + self.production_fixed
            + self.production_variable
    }
}

/// Storage cost taxonomy, one fixed/variable pair per tier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockCosts {
    pub material_storage_fixed: f64,
    pub material_storage_variable: f64,
    pub factory_storage_fixed: f64,
    pub factory_storage_variable: f64,
    pub warehouse_storage_fixed: f64,
    pub warehouse_storage_variable: f64,
    pub store_storage_fixed: f64,
    pub store_storage_variable: f64,
}

impl StockCosts {
    pub fn total(&self) -> f64 {
        self.material_storage_fixed
            + self.material_storage_variable
            + self.factory_storage_fixed
            + self.factory_storage_variable
            + self.warehouse_storage_fixed
            + self.warehouse_storage_variable
            + self.store_storage_fixed
            + self.store_storage_variable
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PenaltyCosts {
    pub stockout: f64,
    pub backorder: f64,
}

impl PenaltyCosts {
    pub fn total(&self) -> f64 {
        self.stockout + self.backorder
    }
}

/// Aggregated profit and loss for one day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyProfitLoss {
    pub day: u32,
    pub revenue: f64,
    pub material_cost: f64,
    pub flow_costs: FlowCosts,
    pub stock_costs: StockCosts,
    pub penalty_costs: PenaltyCosts,
    pub total_cost: f64,
    pub profit: f64,
}

impl DailyProfitLoss {
    pub fn new(day: u32) -> Self {
        Self {
            day,
            ..Default::default()
        }
    }

    /// Fold a trace amount into its account bucket
    pub fn add_account(&mut self, account: CostAccount, amount: f64) {
        match account {
            CostAccount::Revenue => self.revenue += amount,
            CostAccount::MaterialCost => self.material_cost += amount,
            CostAccount::MaterialTransportFixed => self.flow_costs.material_transport_fixed += amount,
            CostAccount::MaterialTransportVariable => {
                self.flow_costs.material_transport_variable += amount
            }
            CostAccount::WarehouseTransportFixed => {
                self.flow_costs.warehouse_transport_fixed += amount
            }
            CostAccount::WarehouseTransportVariable => {
                self.flow_costs.warehouse_transport_variable += amount
            }
            CostAccount::StoreTransportFixed => self.flow_costs.store_transport_fixed += amount,
            CostAccount::StoreTransportVariable => {
                self.flow_costs.store_transport_variable += amount
            }
            CostAccount::ProductionFixed => self.flow_costs.production_fixed += amount,
            CostAccount::ProductionVariable => self.flow_costs.production_variable += amount,
            CostAccount::MaterialStorageFixed => self.stock_costs.material_storage_fixed += amount,
            CostAccount::MaterialStorageVariable => {
                self.stock_costs.material_storage_variable += amount
            }
            CostAccount::FactoryStorageFixed => self.stock_costs.factory_storage_fixed += amount,
            CostAccount::FactoryStorageVariable => {
                self.stock_costs.factory_storage_variable += amount
            }
            CostAccount::WarehouseStorageFixed => {
                self.stock_costs.warehouse_storage_fixed += amount
            }
            CostAccount::WarehouseStorageVariable => {
                self.stock_costs.warehouse_storage_variable += amount
            }
            CostAccount::StoreStorageFixed => self.stock_costs.store_storage_fixed += amount,
            CostAccount::StoreStorageVariable => self.stock_costs.store_storage_variable += amount,
            CostAccount::PenaltyStockout => self.penalty_costs.stockout += amount,
            CostAccount::PenaltyBackorder => self.penalty_costs.backorder += amount,
        }
    }

    /// Amount currently booked against one account
    pub fn account_total(&self, account: CostAccount) -> f64 {
        match account {
            CostAccount::Revenue => self.revenue,
            CostAccount::MaterialCost => self.material_cost,
            CostAccount::MaterialTransportFixed => self.flow_costs.material_transport_fixed,
            CostAccount::MaterialTransportVariable => self.flow_costs.material_transport_variable,
            CostAccount::WarehouseTransportFixed => self.flow_costs.warehouse_transport_fixed,
            CostAccount::WarehouseTransportVariable => self.flow_costs.warehouse_transport_variable,
            CostAccount::StoreTransportFixed => self.flow_costs.store_transport_fixed,
            CostAccount::StoreTransportVariable => self.flow_costs.store_transport_variable,
            CostAccount::ProductionFixed => self.flow_costs.production_fixed,
            CostAccount::ProductionVariable => self.flow_costs.production_variable,
            CostAccount::MaterialStorageFixed => self.stock_costs.material_storage_fixed,
            CostAccount::MaterialStorageVariable => self.stock_costs.material_storage_variable,
            CostAccount::FactoryStorageFixed => self.stock_costs.factory_storage_fixed,
            CostAccount::FactoryStorageVariable => self.stock_costs.factory_storage_variable,
            CostAccount::WarehouseStorageFixed => self.stock_costs.warehouse_storage_fixed,
            CostAccount::WarehouseStorageVariable => self.stock_costs.warehouse_storage_variable,
            CostAccount::StoreStorageFixed => self.stock_costs.store_storage_fixed,
            CostAccount::StoreStorageVariable => self.stock_costs.store_storage_variable,
            CostAccount::PenaltyStockout => self.penalty_costs.stockout,
            CostAccount::PenaltyBackorder => self.penalty_costs.backorder,
        }
    }

    /// Compute `total_cost` and `profit` from the buckets
    pub fn finalize(&mut self) {
        self.total_cost = self.material_cost
            + self.flow_costs.total()
            + self.stock_costs.total()
            + self.penalty_costs.total();
        self.profit = self.revenue - self.total_cost;
    }
}

const ALL_ACCOUNTS: [CostAccount; 20] = [
    CostAccount::Revenue,
    CostAccount::MaterialCost,
    CostAccount::MaterialTransportFixed,
    CostAccount::MaterialTransportVariable,
    CostAccount::WarehouseTransportFixed,
    CostAccount::WarehouseTransportVariable,
    CostAccount::StoreTransportFixed,
    CostAccount::StoreTransportVariable,
    CostAccount::ProductionFixed,
    CostAccount::ProductionVariable,
    CostAccount::MaterialStorageFixed,
    CostAccount::MaterialStorageVariable,
    CostAccount::FactoryStorageFixed,
    CostAccount::FactoryStorageVariable,
    CostAccount::WarehouseStorageFixed,
    CostAccount::WarehouseStorageVariable,
    CostAccount::StoreStorageFixed,
    CostAccount::StoreStorageVariable,
    CostAccount::PenaltyStockout,
    CostAccount::PenaltyBackorder,
];

// ============================================================================
// Reconciliation
// ============================================================================

/// Disagreement between the cost trace and the daily P&L aggregates
#[derive(Debug, Error)]
pub enum ReconciliationError {
    #[error("trace references day {0} outside the simulated horizon")]
    DayOutOfRange(u32),

    #[error(
        "day {day} account {account:?}: aggregate {aggregate} != trace total {trace} \
         (delta {delta})"
    )]
    AccountMismatch {
        day: u32,
        account: CostAccount,
        aggregate: f64,
        trace: f64,
        delta: f64,
    },
}

/// Rebuild per-day P&L aggregates from the trace alone
///
/// Days are 1-based throughout the outputs, matching snapshot numbering.
pub fn recompute_daily_pl(
    trace: &[CostEntry],
    horizon: u32,
) -> Result<Vec<DailyProfitLoss>, ReconciliationError> {
    let mut days: Vec<DailyProfitLoss> = (1..=horizon).map(DailyProfitLoss::new).collect();
    for entry in trace {
        let index = (entry.day as usize)
            .checked_sub(1)
            .ok_or(ReconciliationError::DayOutOfRange(entry.day))?;
        let slot = days
            .get_mut(index)
            .ok_or(ReconciliationError::DayOutOfRange(entry.day))?;
        slot.add_account(entry.account, entry.amount);
    }
    for day in &mut days {
        day.finalize();
    }
    Ok(days)
}

/// Check every day and account of `aggregates` against the replayed trace
pub fn reconcile(
    aggregates: &[DailyProfitLoss],
    trace: &[CostEntry],
) -> Result<(), ReconciliationError> {
    let replayed = recompute_daily_pl(trace, aggregates.len() as u32)?;
    for (aggregate, from_trace) in aggregates.iter().zip(&replayed) {
        for account in ALL_ACCOUNTS {
            let a = aggregate.account_total(account);
            let t = from_trace.account_total(account);
            let delta = (a - t).abs();
            if delta > RECONCILE_EPSILON {
                return Err(ReconciliationError::AccountMismatch {
                    day: aggregate.day,
                    account,
                    aggregate: a,
                    trace: t,
                    delta,
                });
            }
        }
    }
    Ok(())
}
