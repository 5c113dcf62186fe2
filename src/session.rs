//! Session Context
//!
//! Holds the bearer credential for one authenticated operator:
//! - Created by `Session::login` (or restored from a saved credential)
//! - Attached to every authenticated call through `Session::authorized`
//! - Torn down by `logout`, or the moment the service rejects it
//!
//! A rejected credential is never reused; the caller has to log in again.

use std::future::Future;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::error::{AuthError, Error, Result};
use crate::service::{AuthService, Identity, RegistrationRequest};

// ============================================================================
// Credential
// ============================================================================

/// Opaque bearer token plus the identity it was issued to
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential {
    token: String,
    token_type: String,
    identity: Identity,
    issued_at: DateTime<Utc>,
}

impl SessionCredential {
    pub fn new(token: impl Into<String>, identity: Identity) -> Self {
        Self::with_token_type(token, "bearer", identity)
    }

    pub fn with_token_type(
        token: impl Into<String>,
        token_type: impl Into<String>,
        identity: Identity,
    ) -> Self {
        Self {
            token: token.into(),
            token_type: token_type.into(),
            identity,
            issued_at: Utc::now(),
        }
    }

    pub fn bearer_token(&self) -> &str {
        &self.token
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }
}

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredential")
            .field("token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("identity", &self.identity)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

// ============================================================================
// Session
// ============================================================================

#[derive(Debug, Clone)]
enum SessionState {
    Active(SessionCredential),
    Invalidated { reason: String },
    LoggedOut,
}

/// Explicit session value threaded through authenticated operations
#[derive(Debug)]
pub struct Session {
    state: RwLock<SessionState>,
}

impl Session {
    /// Log in and open a session.
    ///
    /// Every failure is an `Error::Auth`: a service that cannot be reached or
    /// answers with an error becomes `AuthError::Unreachable`.
    pub async fn login(auth: &dyn AuthService, username: &str, password: &str) -> Result<Self> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::BadCredentials.into());
        }

        let credential = auth.login(username, password).await.map_err(|err| match err {
            Error::Transport(msg) | Error::Server(msg) => AuthError::Unreachable(msg).into(),
            other => other,
        })?;

        tracing::info!(
            username = %credential.identity().username,
            identity_id = %credential.identity().id,
            "Session opened"
        );

        Ok(Self::from_credential(credential))
    }

    /// Resume a session from a credential obtained earlier
    pub fn from_credential(credential: SessionCredential) -> Self {
        Self {
            state: RwLock::new(SessionState::Active(credential)),
        }
    }

    /// Create an operator account. Does not open a session.
    pub async fn register(auth: &dyn AuthService, request: &RegistrationRequest) -> Result<String> {
        validate_registration(request)?;
        let id = auth.register(request).await?;
        tracing::info!(username = %request.username, identity_id = %id, "Registered operator");
        Ok(id)
    }

    /// The live credential, or `AuthError::NoSession`
    pub fn credential(&self) -> Result<SessionCredential> {
        match &*self.state.read() {
            SessionState::Active(credential) => Ok(credential.clone()),
            SessionState::Invalidated { .. } | SessionState::LoggedOut => {
                Err(AuthError::NoSession.into())
            }
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(&*self.state.read(), SessionState::Active(_))
    }

    pub fn identity(&self) -> Option<Identity> {
        match &*self.state.read() {
            SessionState::Active(credential) => Some(credential.identity().clone()),
            _ => None,
        }
    }

    /// Why the session was invalidated, if it was
    pub fn invalidation_reason(&self) -> Option<String> {
        match &*self.state.read() {
            SessionState::Invalidated { reason } => Some(reason.clone()),
            _ => None,
        }
    }

    /// Drop the credential after the service refused it
    pub fn invalidate(&self, reason: &str) {
        let mut state = self.state.write();
        let username = match &*state {
            SessionState::Active(credential) => credential.identity().username.clone(),
            _ => return,
        };

        *state = SessionState::Invalidated {
            reason: reason.to_string(),
        };
        tracing::warn!(username = %username, reason = %reason, "Session credential invalidated");
    }

    /// Run an authenticated call with the current credential.
    ///
    /// Fails with `AuthError::NoSession` without calling out when there is no
    /// live credential. A rejection from the call invalidates the session.
    pub async fn authorized<T, F, Fut>(&self, call: F) -> Result<T>
    where
        F: FnOnce(SessionCredential) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let credential = self.credential()?;
        match call(credential).await {
            Err(err) if err.is_rejection() => {
                self.invalidate(&err.to_string());
                Err(err)
            }
            other => other,
        }
    }

    /// Ask the service whether the credential is still good.
    ///
    /// `Ok(false)` means it was rejected and the session is now invalid.
    pub async fn verify(&self, auth: &dyn AuthService) -> Result<bool> {
        match self.authorized(|credential| async move { auth.verify_token(&credential).await }).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_rejection() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Notify the service (best effort) and discard the credential
    pub async fn logout(&self, auth: &dyn AuthService) {
        let credential = match self.credential() {
            Ok(credential) => credential,
            Err(_) => {
                *self.state.write() = SessionState::LoggedOut;
                return;
            }
        };

        if let Err(e) = auth.logout(&credential).await {
            tracing::warn!(error = %e, "Remote logout failed; discarding credential anyway");
        }

        *self.state.write() = SessionState::LoggedOut;
        tracing::info!(username = %credential.identity().username, "Session closed");
    }
}

/// Same rules the service enforces, checked before any round trip
fn validate_registration(request: &RegistrationRequest) -> Result<()> {
    if request.username.chars().count() < 3 {
        return Err(Error::InvalidRegistration(
            "Username must be at least 3 characters".to_string(),
        ));
    }
    if request.password.chars().count() < 6 {
        return Err(Error::InvalidRegistration(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    if !request.email.contains('@') {
        return Err(Error::InvalidRegistration("Invalid email".to_string()));
    }
    if request.full_name.chars().count() < 2 {
        return Err(Error::InvalidRegistration("Full name required".to_string()));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
