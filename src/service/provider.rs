//! Service contracts
//!
//! The engine only sees these traits. `HttpService` is the production
//! implementation; tests plug in in-memory fakes.

use async_trait::async_trait;

use super::types::{
    BatchUploadResponse, HealthStatus, RegistrationRequest, ServerStats, VerificationOutcome,
};
use crate::batch::ItemKey;
use crate::error::Result;
use crate::file::LocalFile;
use crate::session::SessionCredential;

/// One file of a batch upload together with its correlation key
#[derive(Debug, Clone, Copy)]
pub struct BatchEntry<'a> {
    pub client_ref: ItemKey,
    pub file: &'a LocalFile,
}

/// Verification and registration endpoints
#[async_trait]
pub trait IntegrityService: Send + Sync {
    /// Liveness probe
    async fn health(&self) -> Result<HealthStatus>;

    /// Verify one file against the registry. Unauthenticated.
    async fn submit_one(&self, file: &LocalFile) -> Result<VerificationOutcome>;

    /// Register every file of a batch in a single request
    async fn submit_batch(
        &self,
        credential: &SessionCredential,
        entries: &[BatchEntry<'_>],
    ) -> Result<BatchUploadResponse>;

    /// Registry-wide totals
    async fn stats(&self, credential: &SessionCredential) -> Result<ServerStats>;
}

/// Credential issuance endpoints
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Exchange a username and password for a bearer credential
    async fn login(&self, username: &str, password: &str) -> Result<SessionCredential>;

    /// Create an account; returns the new identity id
    async fn register(&self, request: &RegistrationRequest) -> Result<String>;

    /// Check a credential; returns the identity id it belongs to
    async fn verify_token(&self, credential: &SessionCredential) -> Result<String>;

    async fn logout(&self, credential: &SessionCredential) -> Result<()>;
}

// ============================================================================
// Test Double
// ============================================================================

#[cfg(test)]
pub use mock::{MockBatch, MockService};
