//! Wire types for the verification and authentication service

use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Identifiers
// ============================================================================

/// Registry record identifier.
///
/// The service emits it as a JSON number or string; it is kept opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => RecordId(n.to_string()),
            Raw::Text(s) => RecordId(s),
        })
    }
}

/// Treats `null`, missing and `""` alike
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) if s.is_empty() => Ok(None),
        Some(v) => T::deserialize(v).map(Some).map_err(serde::de::Error::custom),
    }
}

// ============================================================================
// Single-File Verification
// ============================================================================

/// Raw body of `POST /verify`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub(crate) enum VerifyResponse {
    Original {
        matched_file: String,
        hash: String,
        #[serde(rename = "recordId")]
        record_id: RecordId,
        block_num: u64,
        timestamp: i64,
        hash_verified: String,
    },
    NoMatch {
        hash: String,
        #[serde(default)]
        message: String,
    },
    Error {
        error: String,
    },
}

/// Registry entry that matched a submitted file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedRecord {
    /// Name the file was registered under
    pub matched_file: String,
    pub hash: String,
    pub record_id: RecordId,
    /// Block in which the record was anchored
    pub block_number: u64,
    /// Anchoring time, seconds since the epoch
    pub timestamp: i64,
    /// Hash read back from the ledger
    pub verification_hash: String,
}

/// Result of verifying one file against the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerificationOutcome {
    Matched(MatchedRecord),
    NotMatched { hash: String, message: String },
}

impl VerificationOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched(_))
    }

    /// Hash the service computed for the submitted content
    pub fn hash(&self) -> &str {
        match self {
            Self::Matched(record) => &record.hash,
            Self::NotMatched { hash, .. } => hash,
        }
    }

    pub fn matched_file(&self) -> Option<&str> {
        match self {
            Self::Matched(record) => Some(&record.matched_file),
            Self::NotMatched { .. } => None,
        }
    }
}

// ============================================================================
// Batch Upload
// ============================================================================

/// Per-file status reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Error,
    /// Missing or unrecognised
    #[default]
    #[serde(other)]
    Unknown,
}

/// One entry of `uploaded_files`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOutcome {
    pub filename: String,

    /// Correlation key echoed back, when the service supports it
    #[serde(default, deserialize_with = "empty_as_none")]
    pub client_ref: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub hash: Option<String>,

    #[serde(rename = "recordId", default, deserialize_with = "empty_as_none")]
    pub record_id: Option<RecordId>,

    /// Ledger transaction reference
    #[serde(rename = "tx_hash", default, deserialize_with = "empty_as_none")]
    pub chain_ref: Option<String>,

    #[serde(default)]
    pub status: OutcomeStatus,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub error: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub file_type: Option<String>,
}

impl FileOutcome {
    pub fn success(filename: &str, hash: &str, record_id: RecordId, chain_ref: &str) -> Self {
        Self {
            filename: filename.to_string(),
            client_ref: None,
            hash: Some(hash.to_string()),
            record_id: Some(record_id),
            chain_ref: Some(chain_ref.to_string()),
            status: OutcomeStatus::Success,
            error: None,
            file_type: None,
        }
    }

    pub fn failure(filename: &str, error: &str) -> Self {
        Self {
            filename: filename.to_string(),
            client_ref: None,
            hash: None,
            record_id: None,
            chain_ref: None,
            status: OutcomeStatus::Error,
            error: Some(error.to_string()),
            file_type: None,
        }
    }

    pub fn with_client_ref(mut self, client_ref: impl Into<String>) -> Self {
        self.client_ref = Some(client_ref.into());
        self
    }

    /// Decode one `uploaded_files` entry.
    ///
    /// An entry that does not fit the schema still yields an Error outcome for
    /// whatever `filename` and `client_ref` it carries, so only its own item
    /// fails. Without either it matches no item.
    fn from_entry(entry: serde_json::Value) -> Self {
        match FileOutcome::deserialize(&entry) {
            Ok(outcome) => outcome,
            Err(e) => {
                let text = |field: &str| {
                    entry
                        .get(field)
                        .and_then(serde_json::Value::as_str)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                };
                let filename = text("filename").unwrap_or_default();
                tracing::warn!(file_name = %filename, error = %e, "Malformed upload outcome");

                let mut outcome = FileOutcome::failure(
                    &filename,
                    &format!("{}: {}", MALFORMED_OUTCOME_MESSAGE, e),
                );
                outcome.client_ref = text("client_ref");
                outcome
            }
        }
    }
}

/// Error prefix recorded for an outcome entry that could not be decoded
pub const MALFORMED_OUTCOME_MESSAGE: &str = "malformed outcome from service";

fn lenient_outcomes<'de, D>(deserializer: D) -> Result<Vec<FileOutcome>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?;
    Ok(entries
        .unwrap_or_default()
        .into_iter()
        .map(FileOutcome::from_entry)
        .collect())
}

/// What the service did with its temporary upload folder
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CleanupStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Other(String),
}

impl From<String> for CleanupStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => Self::Pending,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Other(value),
        }
    }
}

impl From<CleanupStatus> for String {
    fn from(value: CleanupStatus) -> Self {
        match value {
            CleanupStatus::Pending => "pending".to_string(),
            CleanupStatus::Completed => "completed".to_string(),
            CleanupStatus::Failed => "failed".to_string(),
            CleanupStatus::Other(s) => s,
        }
    }
}

/// Body of `POST /admin/upload`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchUploadResponse {
    /// Per-file outcomes, in no guaranteed order. Entries are decoded one by
    /// one; see `FileOutcome::from_entry`.
    #[serde(rename = "uploaded_files", default, deserialize_with = "lenient_outcomes")]
    pub outcomes: Vec<FileOutcome>,
    #[serde(default)]
    pub total: usize,
    #[serde(rename = "successful", default)]
    pub success_count: usize,
    #[serde(rename = "failed", default)]
    pub fail_count: usize,
    #[serde(default)]
    pub cleanup_status: CleanupStatus,
}

// ============================================================================
// Stats & Health
// ============================================================================

/// Body of `GET /admin/stats`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStats {
    #[serde(default)]
    pub total_records: u64,
    #[serde(default)]
    pub csv_entries: u64,
    #[serde(default)]
    pub upload_folder: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
}

// ============================================================================
// Authentication
// ============================================================================

/// Public profile of an authenticated operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub(crate) enum LoginResponse {
    Success {
        access_token: String,
        #[serde(default = "default_token_type")]
        token_type: String,
        admin: Identity,
    },
    Error {
        error: String,
    },
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Fields required to create an operator account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub(crate) enum RegisterResponse {
    Success {
        #[serde(default)]
        message: String,
        admin_id: String,
    },
    Error {
        error: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenCheckResponse {
    pub status: String,
    #[serde(default)]
    pub admin_id: Option<String>,
}

/// FastAPI-style error body
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorDetail {
    pub detail: serde_json::Value,
}

impl ErrorDetail {
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
