//! Aggregate Stats View
//!
//! Derived, read-only projection: local tracker counts plus the last totals the
//! service reported. Never persisted; recomputed on every read.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::batch::{ItemStatus, SubmittedItem};
use crate::service::ServerStats;

/// Registry totals as of the last successful refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTotals {
    pub total_records: u64,
    pub csv_entries: u64,
    pub refreshed_at: DateTime<Utc>,
}

impl ServerTotals {
    pub fn from_stats(stats: &ServerStats) -> Self {
        Self {
            total_records: stats.total_records,
            csv_entries: stats.csv_entries,
            refreshed_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub local_total: usize,
    pub local_pending: usize,
    pub local_processing: usize,
    pub local_success: usize,
    pub local_error: usize,
    /// `None` until the first refresh succeeds
    pub server: Option<ServerTotals>,
}

impl AggregateStats {
    pub fn compute(items: &[SubmittedItem], server: Option<&ServerTotals>) -> Self {
        let mut stats = AggregateStats {
            local_total: items.len(),
            server: server.cloned(),
            ..Default::default()
        };

        for item in items {
            match item.status {
                ItemStatus::Pending => stats.local_pending += 1,
                ItemStatus::Processing => stats.local_processing += 1,
                ItemStatus::Success => stats.local_success += 1,
                ItemStatus::Error => stats.local_error += 1,
            }
        }

        stats
    }

    /// Whether every local item has reached a terminal state
    pub fn is_settled(&self) -> bool {
        self.local_pending == 0 && self.local_processing == 0
    }
}
