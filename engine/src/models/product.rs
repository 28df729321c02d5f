//! Product catalog types

use serde::{Deserialize, Serialize};

/// One component line of an assembly bill of materials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomItem {
    pub item_name: String,
    pub quantity_per: f64,
}

/// A sellable or producible item
///
/// `assembly_bom` is configuration only: the production phase schedules
/// finished goods without consuming components (component resupply is
/// policy-driven via factory reorder points, independent of actual
/// consumption). This asymmetry is intentional and load-bearing for
/// behavior parity; do not add consumption here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,

    /// Revenue per unit sold at a store (0 = no revenue recorded)
    #[serde(default)]
    pub sales_price: f64,

    #[serde(default)]
    pub assembly_bom: Vec<BomItem>,
}

impl Product {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sales_price: 0.0,
            assembly_bom: Vec::new(),
        }
    }

    pub fn with_sales_price(mut self, price: f64) -> Self {
        self.sales_price = price;
        self
    }
}
