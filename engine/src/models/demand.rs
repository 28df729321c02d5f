//! Customer demand definitions

use serde::{Deserialize, Serialize};

/// Daily Gaussian demand for one (store, item) pair
///
/// The caller is expected to have merged multiple records for the same
/// pair into one before building the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerDemand {
    pub store_name: String,
    pub product_name: String,
    pub demand_mean: f64,
    pub demand_std_dev: f64,
}

impl CustomerDemand {
    pub fn new(
        store_name: impl Into<String>,
        product_name: impl Into<String>,
        demand_mean: f64,
        demand_std_dev: f64,
    ) -> Self {
        Self {
            store_name: store_name.into(),
            product_name: product_name.into(),
            demand_mean,
            demand_std_dev,
        }
    }
}
