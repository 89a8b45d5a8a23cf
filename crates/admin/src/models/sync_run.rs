//! Catalog sync run history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cobbler_core::{SyncRunId, SyncStatus};

/// Counters for one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub products: u32,
    pub variants: u32,
    pub images: u32,
    pub collections: u32,
    /// Variants without a value for every option category.
    pub skipped_variants: u32,
    /// Products whose transaction rolled back.
    pub failed_products: u32,
    /// Collections whose transaction rolled back.
    #[serde(default)]
    pub failed_collections: u32,
    /// Stale synced variants removed.
    pub pruned_variants: u64,
}

/// A recorded sync run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncRun {
    pub id: SyncRunId,
    pub status: SyncStatus,
    pub triggered_by: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub report: Option<SyncReport>,
    pub error: Option<String>,
}
