//! Reconciliation of batch responses against optimistic trackers
//!
//! Matching rules, per outcome:
//! 1. An echoed `client_ref` resolves the unresolved item with that key.
//! 2. Without an echo, the outcome resolves the first unresolved item of the
//!    batch with the same file name.
//! 3. Anything else is counted as unmatched.
//!
//! Items still unresolved afterwards are failed with `NO_RESULT_MESSAGE`.

use std::collections::{HashMap, VecDeque};

use super::types::{
    BatchId, ItemKey, SubmittedItem, NO_RESULT_MESSAGE, UNKNOWN_STATUS_MESSAGE,
    UNSPECIFIED_FAILURE_MESSAGE,
};
use crate::service::{FileOutcome, OutcomeStatus};

/// Counts produced by one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub succeeded: usize,
    pub failed: usize,
    pub unresolved: usize,
    pub unmatched_outcomes: usize,
}

/// Apply `outcomes` to the items of `batch_id` inside `items`
pub fn reconcile(
    items: &mut [SubmittedItem],
    batch_id: BatchId,
    outcomes: Vec<FileOutcome>,
) -> Reconciliation {
    let mut by_key: HashMap<ItemKey, usize> = HashMap::new();
    let mut by_name: HashMap<String, VecDeque<usize>> = HashMap::new();

    for (index, item) in items.iter().enumerate() {
        if item.batch_id == batch_id && item.is_unresolved() {
            by_key.insert(item.key, index);
            by_name.entry(item.filename.clone()).or_default().push_back(index);
        }
    }

    let mut summary = Reconciliation::default();

    for outcome in outcomes {
        let target = match outcome.client_ref.as_deref() {
            Some(raw) => ItemKey::parse(raw)
                .and_then(|key| by_key.get(&key).copied())
                .filter(|&index| items[index].is_unresolved()),
            None => by_name.get_mut(&outcome.filename).and_then(|queue| {
                while let Some(index) = queue.pop_front() {
                    if items[index].is_unresolved() {
                        return Some(index);
                    }
                }
                None
            }),
        };

        let Some(index) = target else {
            tracing::warn!(
                batch_id = %batch_id,
                file_name = %outcome.filename,
                client_ref = ?outcome.client_ref,
                "Outcome matched no pending item"
            );
            summary.unmatched_outcomes += 1;
            continue;
        };

        let item = &mut items[index];
        let applied = match outcome.status {
            OutcomeStatus::Success => {
                summary.succeeded += 1;
                item.succeed(outcome.hash, outcome.record_id, outcome.chain_ref)
            }
            OutcomeStatus::Error => {
                summary.failed += 1;
                item.fail(
                    outcome
                        .error
                        .unwrap_or_else(|| UNSPECIFIED_FAILURE_MESSAGE.to_string()),
                )
            }
            OutcomeStatus::Unknown => {
                summary.failed += 1;
                item.fail(
                    outcome
                        .error
                        .unwrap_or_else(|| UNKNOWN_STATUS_MESSAGE.to_string()),
                )
            }
        };

        if let Err(e) = applied {
            tracing::warn!(batch_id = %batch_id, error = %e, "Skipped outcome");
            continue;
        }

        tracing::debug!(
            batch_id = %batch_id,
            item = %item.key,
            file_name = %item.filename,
            status = ?item.status,
            "Item resolved"
        );
    }

    for item in items
        .iter_mut()
        .filter(|item| item.batch_id == batch_id && item.is_unresolved())
    {
        tracing::warn!(
            batch_id = %batch_id,
            item = %item.key,
            file_name = %item.filename,
            "No result returned for item"
        );
        if item.fail(NO_RESULT_MESSAGE).is_ok() {
            summary.unresolved += 1;
        }
    }

    summary
}

/// Fail every unresolved item of `batch_id` with the same message.
///
/// Used when the batch request produced no usable response.
pub fn fail_batch(items: &mut [SubmittedItem], batch_id: BatchId, message: &str) -> usize {
    items
        .iter_mut()
        .filter(|item| item.batch_id == batch_id && item.is_unresolved())
        .filter_map(|item| item.fail(message).ok())
        .count()
}
