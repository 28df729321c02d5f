//! Forward-scheduled events and the per-day event bucket

use std::collections::BTreeMap;

// ============================================================================
// Scheduled events
// ============================================================================

/// A shipment scheduled to arrive on a future day
#[derive(Debug, Clone, PartialEq)]
pub struct Shipment {
    pub item: String,
    pub quantity: f64,
    pub origin: String,
    pub destination: String,
    /// Re-queued shortfall of an earlier shipment, counted as a network
    /// backorder until delivered
    pub is_backorder: bool,
}

/// A production run scheduled to complete on a future day
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionOrder {
    pub item: String,
    pub quantity: f64,
    pub factory: String,
}

/// Sparse calendar of events keyed by day; a day's bucket is drained once
/// processed so the map never grows past the undelivered tail
pub type Schedule<T> = BTreeMap<u32, Vec<T>>;

/// Remove and return every bucket due on or before `day`, in day order
pub fn drain_due<T>(schedule: &mut Schedule<T>, day: u32) -> Vec<T> {
    let due_days: Vec<u32> = schedule.range(..=day).map(|(d, _)| *d).collect();
    let mut drained = Vec::new();
    for d in due_days {
        if let Some(mut bucket) = schedule.remove(&d) {
            drained.append(&mut bucket);
        }
    }
    drained
}

// ============================================================================
// Per-day event bucket
// ============================================================================

/// Flow counters for one (node, item) pair within a single day
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemFlows {
    pub incoming: f64,
    pub demand: f64,
    pub sales: f64,
    pub shortage: f64,
    pub produced: f64,
    pub consumption: f64,
    pub ordered: f64,
    pub lost_order: f64,
}

/// Ephemeral aggregation of everything that happened during one day
///
/// Rebuilt at the top of each day; the snapshot and cost accounting phases
/// read it, nothing persists it.
#[derive(Debug, Default)]
pub struct DayBook {
    /// (node, item) → flow counters
    pub node_items: BTreeMap<(String, String), ItemFlows>,
    /// (origin, destination, item) → quantity shipped
    pub transport: BTreeMap<(String, String, String), f64>,
    /// (origin, destination) → quantity shipped beyond arc capacity
    pub transport_overage: BTreeMap<(String, String), f64>,
    /// node → quantity received beyond storage capacity
    pub storage_overage: BTreeMap<String, f64>,
}

impl DayBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flows_mut(&mut self, node: &str, item: &str) -> &mut ItemFlows {
        self.node_items
            .entry((node.to_string(), item.to_string()))
            .or_default()
    }

    pub fn flows(&self, node: &str, item: &str) -> Option<&ItemFlows> {
        self.node_items
            .get(&(node.to_string(), item.to_string()))
    }

    pub fn add_transport(&mut self, origin: &str, destination: &str, item: &str, quantity: f64) {
        *self
            .transport
            .entry((origin.to_string(), destination.to_string(), item.to_string()))
            .or_default() += quantity;
    }

    pub fn add_transport_overage(&mut self, origin: &str, destination: &str, quantity: f64) {
        *self
            .transport_overage
            .entry((origin.to_string(), destination.to_string()))
            .or_default() += quantity;
    }

    pub fn add_storage_overage(&mut self, node: &str, quantity: f64) {
        *self.storage_overage.entry(node.to_string()).or_default() += quantity;
    }

    /// Items a node touched today, whether or not it holds static stock
    pub fn items_for(&self, node: &str) -> Vec<&str> {
        self.node_items
            .keys()
            .filter(|(n, _)| n == node)
            .map(|(_, item)| item.as_str())
            .collect()
    }
}
