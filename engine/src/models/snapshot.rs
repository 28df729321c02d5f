//! Per-day simulation output records

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flow and state totals for one (node, item) pair on one day
///
/// `demand` is normalized to `sales + shortage` so that fill-rate style
/// metrics derived from the snapshot are internally consistent even when
/// backorder servicing changes what was requested versus what was filled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemDayRecord {
    pub start_stock: f64,
    pub end_stock: f64,
    /// Units received from shipments and production completions
    pub incoming: f64,
    /// Normalized demand observed at this node (`sales + shortage`)
    pub demand: f64,
    pub sales: f64,
    pub shortage: f64,
    pub produced: f64,
    pub consumption: f64,
    /// Replenishment quantity placed upstream today
    pub ordered_quantity: f64,
    /// Demand discarded under lost-sales handling
    pub lost_order: f64,
    /// Pending outgoing backorder shipments plus queued customer backorders
    pub backorder_balance: f64,
}

/// Immutable end-of-day state for every node and item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySnapshot {
    /// 0-based simulation day
    pub day: u32,
    /// Node name → item name → record
    pub nodes: BTreeMap<String, BTreeMap<String, ItemDayRecord>>,
}

impl DailySnapshot {
    pub fn new(day: u32) -> Self {
        Self {
            day,
            nodes: BTreeMap::new(),
        }
    }

    /// Record for a (node, item) pair, if the node carried the item
    pub fn record(&self, node: &str, item: &str) -> Option<&ItemDayRecord> {
        self.nodes.get(node).and_then(|items| items.get(item))
    }
}
