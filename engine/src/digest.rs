//! Result digests
//!
//! A run's outputs hash to a single SHA256 hex string, used to compare runs
//! cheaply: two runs with the same configuration and seed must produce the
//! same digest. All output structures serialize through ordered maps, so
//! plain JSON serialization is already canonical.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::costs::DailyProfitLoss;
use crate::models::DailySnapshot;

/// SHA256 hex digest over the snapshot and P&L outputs of a run
pub fn result_digest(
    snapshots: &[DailySnapshot],
    profit_loss: &[DailyProfitLoss],
) -> Result<String, serde_json::Error> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(snapshots)?);
    hasher.update(serde_json::to_vec(profit_loss)?);
    Ok(format!("{:x}", hasher.finalize()))
}

/// SHA256 hex digest of any serializable configuration
pub fn config_digest<T: Serialize>(config: &T) -> Result<String, serde_json::Error> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(config)?);
    Ok(format!("{:x}", hasher.finalize()))
}
