//! Batch Upload Orchestrator
//!
//! Multi-file submission path:
//! - Creates one tracker per file (status Processing) before any network I/O
//! - Sends the whole set in a single request
//! - Reconciles the response back onto the trackers
//! - Refreshes aggregate stats, best effort
//!
//! A batch either resolves item by item from a response, or fails as a whole
//! when no usable response arrives.

use std::sync::Arc;

use tokio::sync::RwLock;

use super::reconcile::{fail_batch, reconcile};
use super::types::{BatchId, BatchReport, ClearOutcome, ItemKey, SubmittedItem};
use crate::error::{Error, Result};
use crate::file::LocalFile;
use crate::flight::SingleFlight;
use crate::service::{BatchEntry, IntegrityService};
use crate::session::Session;
use crate::stats::{AggregateStats, ServerTotals};

// ============================================================================
// Orchestrator
// ============================================================================

/// Owns the visible batch and drives submissions against it
#[derive(Clone)]
pub struct BatchOrchestrator {
    inner: Arc<OrchestratorInner>,
}

struct OrchestratorInner {
    service: Arc<dyn IntegrityService>,

    /// Every tracker created since the last clear, in submission order
    items: RwLock<Vec<SubmittedItem>>,

    /// Totals from the last successful stats refresh
    server_totals: RwLock<Option<ServerTotals>>,

    /// Guards submissions and clears
    flight: SingleFlight,
}

impl BatchOrchestrator {
    pub fn new(service: Arc<dyn IntegrityService>) -> Self {
        Self {
            inner: Arc::new(OrchestratorInner {
                service,
                items: RwLock::new(Vec::new()),
                server_totals: RwLock::new(None),
                flight: SingleFlight::new("batch operation"),
            }),
        }
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Submit `files` as one batch.
    ///
    /// Per-file failures are reported in the returned `BatchReport` and on the
    /// trackers. An `Err` means the request itself failed; in that case every
    /// tracker of the batch has already been moved to Error with the same
    /// message. `Error::Busy` and a missing session are reported before any
    /// tracker is created.
    pub async fn submit_batch(&self, session: &Session, files: Vec<LocalFile>) -> Result<BatchReport> {
        if files.is_empty() {
            return Err(Error::EmptyBatch);
        }

        let _permit = self.inner.flight.try_acquire()?;

        // Fail fast without a credential; nothing gets tracked
        session.credential()?;

        let batch_id = BatchId::new();
        let mut trackers = Vec::with_capacity(files.len());
        for file in &files {
            let mut item = SubmittedItem::new(batch_id, file.name(), file.size());
            item.begin_processing()?;
            trackers.push(item);
        }
        let keys: Vec<ItemKey> = trackers.iter().map(|item| item.key).collect();

        self.inner.items.write().await.extend(trackers);

        tracing::info!(
            batch_id = %batch_id,
            files = files.len(),
            total_bytes = files.iter().map(LocalFile::size).sum::<usize>(),
            "Submitting batch"
        );

        let entries: Vec<BatchEntry<'_>> = keys
            .iter()
            .zip(&files)
            .map(|(key, file)| BatchEntry {
                client_ref: *key,
                file,
            })
            .collect();

        let service = &self.inner.service;
        let result = session
            .authorized(|credential| async move {
                service.submit_batch(&credential, &entries).await
            })
            .await;

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                let message = err.to_string();
                let failed = {
                    let mut items = self.inner.items.write().await;
                    fail_batch(&mut items, batch_id, &message)
                };
                if err.aborts_batch() {
                    tracing::error!(
                        batch_id = %batch_id,
                        error = %err,
                        failed = failed,
                        "Batch request failed"
                    );
                } else {
                    // Local failure while building the request; nothing was sent
                    tracing::warn!(
                        batch_id = %batch_id,
                        error = %err,
                        failed = failed,
                        "Batch not sent"
                    );
                }
                return Err(err);
            }
        };

        let server_success_count = response.success_count;
        let server_fail_count = response.fail_count;
        let cleanup_status = response.cleanup_status.clone();

        let summary = {
            let mut items = self.inner.items.write().await;
            reconcile(&mut items, batch_id, response.outcomes)
        };

        if summary.succeeded != server_success_count {
            tracing::warn!(
                batch_id = %batch_id,
                reported = server_success_count,
                reconciled = summary.succeeded,
                "Service success count differs from reconciled outcomes"
            );
        }

        let report = BatchReport {
            batch_id,
            submitted: files.len(),
            succeeded: summary.succeeded,
            failed: summary.failed + summary.unresolved,
            unresolved: summary.unresolved,
            unmatched_outcomes: summary.unmatched_outcomes,
            server_success_count,
            server_fail_count,
            cleanup_status,
        };

        tracing::info!(
            batch_id = %batch_id,
            succeeded = report.succeeded,
            failed = report.failed,
            unresolved = report.unresolved,
            cleanup = ?report.cleanup_status,
            "Batch reconciled"
        );

        if let Err(e) = self.refresh_stats(session).await {
            tracing::warn!(batch_id = %batch_id, error = %e, "Stats refresh after batch failed");
        }

        Ok(report)
    }

    // ========================================================================
    // Stats
    // ========================================================================

    /// Pull registry totals from the service. Safe to retry or skip.
    pub async fn refresh_stats(&self, session: &Session) -> Result<AggregateStats> {
        let service = &self.inner.service;
        let stats = session
            .authorized(|credential| async move { service.stats(&credential).await })
            .await?;

        *self.inner.server_totals.write().await = Some(ServerTotals::from_stats(&stats));

        tracing::debug!(
            total_records = stats.total_records,
            csv_entries = stats.csv_entries,
            "Refreshed server stats"
        );

        Ok(self.current_stats().await)
    }

    pub async fn current_stats(&self) -> AggregateStats {
        let items = self.inner.items.read().await;
        let totals = self.inner.server_totals.read().await;
        AggregateStats::compute(&items, totals.as_ref())
    }

    // ========================================================================
    // Query & Clear
    // ========================================================================

    /// Snapshot of every tracker, in submission order
    pub async fn current_batch(&self) -> Vec<SubmittedItem> {
        self.inner.items.read().await.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.flight.is_busy()
    }

    /// Discard every tracker.
    ///
    /// `confirm` receives the number of trackers about to be dropped and must
    /// return `true` for the clear to happen. An empty batch clears without
    /// asking. Rejected with `Error::Busy` while a batch is in flight.
    pub async fn clear_batch<F>(&self, confirm: F) -> Result<ClearOutcome>
    where
        F: FnOnce(usize) -> bool,
    {
        let _permit = self.inner.flight.try_acquire()?;

        let mut items = self.inner.items.write().await;
        if items.is_empty() {
            return Ok(ClearOutcome::Cleared(0));
        }

        let count = items.len();
        if !confirm(count) {
            tracing::debug!(count = count, "Clear declined");
            return Ok(ClearOutcome::Declined);
        }

        items.clear();
        tracing::info!(count = count, "Cleared batch trackers");

        Ok(ClearOutcome::Cleared(count))
    }
}

// ============================================================================
// Tests
// ============================================================================
