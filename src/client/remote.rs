//! Remote Progress Client
//!
//! Async client for the remote progress store, an opaque key-value service
//! keyed by team name.
//!
//! - read: `GET <base>?action=read&teamName=<name>` answers
//!   `{"found": bool, "progress": <record or JSON string>}`
//! - write: `POST <base>` with
//!   `{"action": "update", "teamName", "progress": <JSON string>, "timestamp"}`
//!   answers `{"success": bool, "message"?}` or `{"error": "..."}`
//!
//! The remote is advisory: every failure comes back as a [`RemoteError`]
//! and callers treat a failed read as "not found" and a failed write as
//! dropped. Nothing here retries.

use crate::client::config::Config;
use crate::shared::progress::ProgressRecord;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Remote store failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// No remote URL configured; no request was attempted
    #[error("remote progress store is not configured")]
    Unconfigured,
    /// Empty team name; no request was attempted
    #[error("a team name is required for remote progress operations")]
    MissingIdentity,
    /// Transport failure or timeout
    #[error("network error: {0}")]
    Network(String),
    /// Non-success HTTP status
    #[error("request failed: {status} - {body}")]
    Status { status: u16, body: String },
    /// Response body that does not match the protocol
    #[error("malformed response: {0}")]
    Malformed(String),
    /// The store answered with an error or did not acknowledge the write
    #[error("remote store rejected the request: {0}")]
    Rejected(String),
    /// The record could not be encoded
    #[error("failed to encode progress: {0}")]
    Encode(String),
}

#[derive(Debug, Deserialize)]
struct ReadResponse {
    #[serde(default)]
    found: bool,
    #[serde(default)]
    progress: Option<RemoteProgress>,
    #[serde(default)]
    error: Option<String>,
}

/// Some deployments store the record as a JSON string, others inline it
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RemoteProgress {
    Encoded(String),
    Record(ProgressRecord),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    action: &'static str,
    team_name: &'a str,
    progress: String,
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the remote progress store
#[derive(Debug, Clone)]
pub struct RemoteProgressClient {
    endpoint: Option<Url>,
    client: Client,
}

impl RemoteProgressClient {
    pub fn new(config: &Config) -> Self {
        let endpoint = config.remote_url().and_then(|url| match Url::parse(url) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("Ignoring invalid remote URL '{}': {}", url, e);
                None
            }
        });
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });

        Self { endpoint, client }
    }

    /// Whether a remote URL is configured
    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Fetch the stored record for `identity`; `Ok(None)` when not found
    pub async fn fetch(&self, identity: &str) -> Result<Option<ProgressRecord>, RemoteError> {
        if identity.trim().is_empty() {
            return Err(RemoteError::MissingIdentity);
        }
        let endpoint = self.endpoint()?;

        tracing::debug!("Fetching remote progress for '{}'", identity);
        let response = self
            .client
            .get(endpoint.clone())
            .query(&[("action", "read"), ("teamName", identity)])
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let body = Self::read_body(response).await?;
        let parsed: ReadResponse = serde_json::from_str(&body)
            .map_err(|e| RemoteError::Malformed(format!("Failed to parse response: {}", e)))?;

        if let Some(error) = parsed.error {
            return Err(RemoteError::Rejected(error));
        }
        if !parsed.found {
            tracing::debug!("No remote progress for '{}'", identity);
            return Ok(None);
        }

        let record = match parsed.progress {
            Some(RemoteProgress::Record(record)) => record,
            Some(RemoteProgress::Encoded(json)) => serde_json::from_str(&json)
                .map_err(|e| RemoteError::Malformed(format!("Failed to parse progress: {}", e)))?,
            None => {
                return Err(RemoteError::Malformed(
                    "record marked found but carries no progress".to_string(),
                ))
            }
        };

        Ok(Some(record))
    }

    /// Upsert `record` under its team name
    pub async fn write(&self, record: &ProgressRecord) -> Result<(), RemoteError> {
        if record.identity.trim().is_empty() {
            return Err(RemoteError::MissingIdentity);
        }
        let endpoint = self.endpoint()?;

        let request = UpdateRequest {
            action: "update",
            team_name: &record.identity,
            progress: serde_json::to_string(record).map_err(|e| RemoteError::Encode(e.to_string()))?,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let response = self
            .client
            .post(endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let body = Self::read_body(response).await?;
        let parsed: WriteResponse = serde_json::from_str(&body)
            .map_err(|e| RemoteError::Malformed(format!("Failed to parse response: {}", e)))?;

        if let Some(error) = parsed.error {
            return Err(RemoteError::Rejected(error));
        }
        if !parsed.success {
            return Err(RemoteError::Rejected(
                parsed
                    .message
                    .unwrap_or_else(|| "update was not acknowledged".to_string()),
            ));
        }

        tracing::debug!(
            "Remote progress stored for '{}'{}",
            record.identity,
            parsed.message.map(|m| format!(": {}", m)).unwrap_or_default()
        );
        Ok(())
    }

    fn endpoint(&self) -> Result<&Url, RemoteError> {
        self.endpoint.as_ref().ok_or(RemoteError::Unconfigured)
    }

    async fn read_body(response: Response) -> Result<String, RemoteError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}
