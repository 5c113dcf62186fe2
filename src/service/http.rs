//! HTTP implementation of the service contracts

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::provider::{AuthService, BatchEntry, IntegrityService};
use super::types::{
    BatchUploadResponse, ErrorDetail, HealthStatus, LoginResponse, MatchedRecord,
    RegisterResponse, RegistrationRequest, ServerStats, TokenCheckResponse, VerificationOutcome,
    VerifyResponse,
};
use crate::config::ApiConfig;
use crate::error::{AuthError, Error, Result};
use crate::file::LocalFile;
use crate::session::SessionCredential;

/// reqwest-backed client for the verification service.
///
/// Timeouts are enforced here and reach the engine as `Error::Transport`.
#[derive(Clone)]
pub struct HttpService {
    client: Client,
    base_url: String,
}

impl HttpService {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn file_part(file: &LocalFile) -> Result<Part> {
        Part::bytes(file.content().to_vec())
            .file_name(file.name().to_string())
            .mime_str(file.mime_type())
            .map_err(|e| Error::InvalidFile(format!("{}: {}", file.name(), e)))
    }
}

/// Turn a non-success response into an error message, preferring `detail`
async fn failure_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<ErrorDetail>(&body)
        .map(|d| d.message())
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("{}", status))
}

/// Decode a response to an authenticated call; `401` becomes a rejection
async fn read_authorized<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        let message = failure_message(response).await;
        return Err(AuthError::Rejected(message).into());
    }
    read_json(response).await
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let message = failure_message(response).await;
        return Err(Error::Server(format!("{} ({})", message, status.as_u16())));
    }
    Ok(response.json::<T>().await?)
}

#[async_trait]
impl IntegrityService for HttpService {
    async fn health(&self) -> Result<HealthStatus> {
        let response = self.client.get(self.url("/health")).send().await?;
        read_json(response).await
    }

    async fn submit_one(&self, file: &LocalFile) -> Result<VerificationOutcome> {
        let form = Form::new().part("file", Self::file_part(file)?);

        tracing::debug!(file_name = %file.name(), size = file.size(), "Submitting file for verification");

        let response = self
            .client
            .post(self.url("/verify"))
            .multipart(form)
            .send()
            .await?;

        match read_json::<VerifyResponse>(response).await? {
            VerifyResponse::Original {
                matched_file,
                hash,
                record_id,
                block_num,
                timestamp,
                hash_verified,
            } => Ok(VerificationOutcome::Matched(MatchedRecord {
                matched_file,
                hash,
                record_id,
                block_number: block_num,
                timestamp,
                verification_hash: hash_verified,
            })),
            VerifyResponse::NoMatch { hash, message } => {
                Ok(VerificationOutcome::NotMatched { hash, message })
            }
            VerifyResponse::Error { error } => Err(Error::Server(error)),
        }
    }

    async fn submit_batch(
        &self,
        credential: &SessionCredential,
        entries: &[BatchEntry<'_>],
    ) -> Result<BatchUploadResponse> {
        let mut form = Form::new();
        for entry in entries {
            form = form
                .part("files", Self::file_part(entry.file)?)
                .text("client_ref", entry.client_ref.to_string());
        }

        let response = self
            .client
            .post(self.url("/admin/upload"))
            .bearer_auth(credential.bearer_token())
            .multipart(form)
            .send()
            .await?;

        read_authorized(response).await
    }

    async fn stats(&self, credential: &SessionCredential) -> Result<ServerStats> {
        let response = self
            .client
            .get(self.url("/admin/stats"))
            .bearer_auth(credential.bearer_token())
            .send()
            .await?;

        let stats: ServerStats = read_authorized(response).await?;
        if stats.status.as_deref() == Some("error") {
            return Err(Error::Server(
                stats.error.unwrap_or_else(|| "stats unavailable".to_string()),
            ));
        }
        Ok(stats)
    }
}

#[async_trait]
impl AuthService for HttpService {
    async fn login(&self, username: &str, password: &str) -> Result<SessionCredential> {
        let response = self
            .client
            .post(self.url("/admin/login"))
            .query(&[("username", username), ("password", password)])
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => return Err(AuthError::BadCredentials.into()),
            StatusCode::FORBIDDEN => return Err(AuthError::AccountInactive.into()),
            _ => {}
        }

        match read_json::<LoginResponse>(response).await? {
            LoginResponse::Success {
                access_token,
                token_type,
                admin,
            } => Ok(SessionCredential::with_token_type(access_token, token_type, admin)),
            LoginResponse::Error { error } => Err(Error::Server(error)),
        }
    }

    async fn register(&self, request: &RegistrationRequest) -> Result<String> {
        let response = self
            .client
            .post(self.url("/admin/register"))
            .query(request)
            .send()
            .await?;

        if response.status() == StatusCode::BAD_REQUEST {
            return Err(Error::InvalidRegistration(failure_message(response).await));
        }

        match read_json::<RegisterResponse>(response).await? {
            RegisterResponse::Success { message, admin_id } => {
                tracing::info!(admin_id = %admin_id, "{}", message);
                Ok(admin_id)
            }
            RegisterResponse::Error { error } => Err(Error::Server(error)),
        }
    }

    async fn verify_token(&self, credential: &SessionCredential) -> Result<String> {
        let response = self
            .client
            .get(self.url("/admin/verify-token"))
            .bearer_auth(credential.bearer_token())
            .send()
            .await?;

        let check: TokenCheckResponse = read_authorized(response).await?;
        if check.status != "valid" {
            return Err(AuthError::Rejected(format!("token status {}", check.status)).into());
        }
        Ok(check
            .admin_id
            .unwrap_or_else(|| credential.identity().id.clone()))
    }

    async fn logout(&self, credential: &SessionCredential) -> Result<()> {
        let response = self
            .client
            .post(self.url("/admin/logout"))
            .bearer_auth(credential.bearer_token())
            .send()
            .await?;

        let _: serde_json::Value = read_authorized(response).await?;
        Ok(())
    }
}
