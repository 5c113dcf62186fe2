//! Batch Registration Module
//!
//! Tracks files submitted for registration as a batch:
//! - Optimistic per-file trackers, visible before the response arrives
//! - Correlation of per-file outcomes back onto trackers
//! - Batch-wide failure when no usable response arrives

mod orchestrator;
mod reconcile;
mod types;

pub use orchestrator::BatchOrchestrator;
pub use reconcile::{fail_batch, reconcile, Reconciliation};
pub use types::{
    BatchId, BatchReport, ClearOutcome, InvalidTransition, ItemKey, ItemStatus, SubmittedItem,
    NO_RESULT_MESSAGE, UNKNOWN_STATUS_MESSAGE, UNSPECIFIED_FAILURE_MESSAGE,
};
