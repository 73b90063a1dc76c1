//! Per-owner storage statistics derived from catalog state.

use serde::Serialize;

/// Logical vs physical usage for one owner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StorageStats {
    /// Bytes of distinct content the owner holds; what quota charges.
    pub total_storage_used: u64,
    /// Bytes as if nothing were deduplicated.
    pub original_storage_used: u64,
    /// `original - total`, clamped at zero.
    pub storage_savings: u64,
    /// Savings as a percentage of the logical figure, rounded to two
    /// decimals; 0.0 when nothing has been uploaded.
    pub savings_percentage: f64,
}

impl StorageStats {
    pub fn from_usage(original_storage_used: u64, total_storage_used: u64) -> Self {
        let storage_savings = original_storage_used.saturating_sub(total_storage_used);
        let savings_percentage = if original_storage_used == 0 {
            0.0
        } else {
            let pct = storage_savings as f64 / original_storage_used as f64 * 100.0;
            (pct * 100.0).round() / 100.0
        };
        Self {
            total_storage_used,
            original_storage_used,
            storage_savings,
            savings_percentage,
        }
    }
}
