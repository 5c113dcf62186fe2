//! Single-file verification
//!
//! Unauthenticated. Each call goes to the service; outcomes are never cached,
//! so verifying the same file twice makes two requests.

use std::sync::Arc;

use crate::error::Result;
use crate::file::LocalFile;
use crate::flight::SingleFlight;
use crate::service::{IntegrityService, VerificationOutcome};

/// Verifies one file at a time against the registry
pub struct VerificationSubmitter {
    service: Arc<dyn IntegrityService>,
    flight: SingleFlight,
}

impl VerificationSubmitter {
    pub fn new(service: Arc<dyn IntegrityService>) -> Self {
        Self {
            service,
            flight: SingleFlight::new("verification"),
        }
    }

    /// Ask the service whether `file` is registered.
    ///
    /// Returns `Error::Busy` while another verification from this submitter is
    /// outstanding.
    pub async fn submit(&self, file: &LocalFile) -> Result<VerificationOutcome> {
        let _permit = self.flight.try_acquire()?;

        tracing::info!(file_name = %file.name(), size = file.size(), "Verifying file");

        match self.service.submit_one(file).await {
            Ok(outcome) => {
                tracing::info!(
                    file_name = %file.name(),
                    matched = outcome.is_match(),
                    hash = %outcome.hash(),
                    "Verification complete"
                );
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!(file_name = %file.name(), error = %e, "Verification failed");
                Err(e)
            }
        }
    }

    pub fn is_busy(&self) -> bool {
        self.flight.is_busy()
    }
}
