//! Remote Service Module
//!
//! Contracts for the collaborators the engine talks to:
//! - `IntegrityService`: single-file verification, batch registration, stats
//! - `AuthService`: login, registration, token checks, logout
//!
//! `HttpService` implements both against the service's REST API.

mod http;
mod provider;
mod types;

pub use http::HttpService;
pub use provider::{AuthService, BatchEntry, IntegrityService};
#[cfg(test)]
pub(crate) use provider::{MockBatch, MockService};
pub use types::{
    BatchUploadResponse, CleanupStatus, FileOutcome, HealthStatus, Identity, MatchedRecord,
    OutcomeStatus, RecordId, RegistrationRequest, ServerStats, VerificationOutcome,
    MALFORMED_OUTCOME_MESSAGE,
};
