//! Integrity Client
//!
//! Client engine for a file integrity registration and verification service.
//!
//! # Modules
//!
//! - `verify`: Unauthenticated single-file verification
//! - `batch`: Authenticated multi-file registration with per-file tracking
//! - `session`: Bearer credential lifecycle
//! - `stats`: Local and registry-wide counts
//! - `service`: Service contracts and the HTTP implementation

pub mod batch;
pub mod config;
pub mod error;
pub mod file;
pub mod service;
pub mod session;
pub mod stats;
pub mod verify;

mod flight;

pub use batch::{BatchOrchestrator, BatchReport, ClearOutcome, ItemStatus, SubmittedItem};
pub use config::ClientConfig;
pub use error::{AuthError, Error, Result};
pub use file::LocalFile;
pub use service::{HttpService, VerificationOutcome};
pub use session::{Session, SessionCredential};
pub use stats::AggregateStats;
pub use verify::VerificationSubmitter;
