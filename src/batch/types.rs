//! Batch item types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::service::{CleanupStatus, RecordId};

// ============================================================================
// Constants
// ============================================================================

/// Error recorded on items the service response did not account for
pub const NO_RESULT_MESSAGE: &str = "no result returned for this file";

/// Error recorded when the service gave an unrecognised per-file status
pub const UNKNOWN_STATUS_MESSAGE: &str = "service returned an unrecognised status";

/// Error recorded when the service marked a file failed without saying why
pub const UNSPECIFIED_FAILURE_MESSAGE: &str = "upload failed";

// ============================================================================
// Keys
// ============================================================================

/// Client-generated identity of one submitted item.
///
/// Sent as `client_ref` with the file; distinct from the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(Uuid);

impl ItemKey {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(Self)
    }
}

impl Default for ItemKey {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity of one `submit_batch` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(Uuid);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// Item State
// ============================================================================

/// Lifecycle of one submitted file.
///
/// `Pending -> Processing -> {Success, Error}`; the last two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Processing,
    Success,
    Error,
}

impl ItemStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }

    fn can_become(self, next: ItemStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Success)
                | (Self::Processing, Self::Error)
        )
    }
}

/// Rejected state change
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("item {key} cannot move from {from:?} to {to:?}")]
pub struct InvalidTransition {
    pub key: ItemKey,
    pub from: ItemStatus,
    pub to: ItemStatus,
}

/// Tracker for one file of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedItem {
    pub key: ItemKey,
    pub batch_id: BatchId,
    pub filename: String,
    pub size: usize,
    pub hash: Option<String>,
    pub record_id: Option<RecordId>,
    /// Ledger transaction reference
    pub chain_ref: Option<String>,
    pub status: ItemStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl SubmittedItem {
    pub fn new(batch_id: BatchId, filename: impl Into<String>, size: usize) -> Self {
        Self {
            key: ItemKey::new(),
            batch_id,
            filename: filename.into(),
            size,
            hash: None,
            record_id: None,
            chain_ref: None,
            status: ItemStatus::Pending,
            error: None,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    fn transition(&mut self, to: ItemStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_become(to) {
            return Err(InvalidTransition {
                key: self.key,
                from: self.status,
                to,
            });
        }
        self.status = to;
        if to.is_terminal() {
            self.resolved_at = Some(Utc::now());
        }
        Ok(())
    }

    pub fn begin_processing(&mut self) -> Result<(), InvalidTransition> {
        self.transition(ItemStatus::Processing)
    }

    pub fn succeed(
        &mut self,
        hash: Option<String>,
        record_id: Option<RecordId>,
        chain_ref: Option<String>,
    ) -> Result<(), InvalidTransition> {
        self.transition(ItemStatus::Success)?;
        self.hash = hash;
        self.record_id = record_id;
        self.chain_ref = chain_ref;
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), InvalidTransition> {
        self.transition(ItemStatus::Error)?;
        self.error = Some(message.into());
        Ok(())
    }

    pub fn is_unresolved(&self) -> bool {
        !self.status.is_terminal()
    }
}

// ============================================================================
// Reports
// ============================================================================

/// Summary of one `submit_batch` call that got a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub batch_id: BatchId,
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Items the response never mentioned (now failed with `NO_RESULT_MESSAGE`)
    pub unresolved: usize,
    /// Outcomes that matched no item of the batch
    pub unmatched_outcomes: usize,
    /// Counts as claimed by the service
    pub server_success_count: usize,
    pub server_fail_count: usize,
    pub cleanup_status: CleanupStatus,
}

/// Result of `clear_batch`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    Cleared(usize),
    Declined,
}
