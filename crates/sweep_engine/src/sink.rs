//! Client for the remote sink: an append-only HTTP endpoint that stores
//! delivered subdomain records.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use sweep_core::{Source, SubdomainRecord, SyncOutcome, Timestamp};
use url::Url;

const ADD_SUBDOMAINS_ACTION: &str = "add_subdomains";
/// Non-2xx bodies are kept in the error only up to this many characters.
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkSettings {
    pub endpoint: Option<Url>,
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Confirmed delivery of (a prefix of) one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkAck {
    pub added: usize,
    pub total_requested: usize,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SinkHealth {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("no sink endpoint configured")]
    NotConfigured,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("sink timed out")]
    Timeout,
    #[error("sink answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed sink response: {0}")]
    Protocol(String),
    #[error("sink rejected batch: {0}")]
    Rejected(String),
}

impl SinkError {
    /// Every sink error takes the same retry path in the queue.
    pub fn into_outcome(self) -> SyncOutcome {
        SyncOutcome::Failed {
            reason: self.to_string(),
        }
    }
}

#[async_trait::async_trait]
pub trait RemoteSink: Send + Sync {
    async fn add_subdomains(&self, records: &[SubdomainRecord]) -> Result<SinkAck, SinkError>;
    async fn health(&self) -> Result<SinkHealth, SinkError>;
}

#[derive(Serialize)]
struct AddSubdomainsRequest<'a> {
    action: &'static str,
    subdomains: Vec<WireRecord<'a>>,
}

#[derive(Serialize)]
struct WireRecord<'a> {
    domain: &'a str,
    source: Source,
    timestamp: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin: Option<&'a str>,
}

impl<'a> From<&'a SubdomainRecord> for WireRecord<'a> {
    fn from(record: &'a SubdomainRecord) -> Self {
        Self {
            domain: &record.domain,
            source: record.source,
            timestamp: record.timestamp,
            origin: record.origin.as_deref(),
        }
    }
}

#[derive(Deserialize)]
struct AddSubdomainsResponse {
    success: bool,
    #[serde(default)]
    added: Option<usize>,
    #[serde(default)]
    total_requested: Option<usize>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct HttpSink {
    client: reqwest::Client,
    endpoint: Option<Url>,
}

impl HttpSink {
    pub fn new(settings: &SinkSettings) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| SinkError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
        })
    }

    fn endpoint(&self) -> Result<&Url, SinkError> {
        self.endpoint.as_ref().ok_or(SinkError::NotConfigured)
    }

    async fn read_body(response: reqwest::Response) -> Result<Vec<u8>, SinkError> {
        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            let body: String = String::from_utf8_lossy(&bytes)
                .chars()
                .take(MAX_ERROR_BODY_CHARS)
                .collect();
            return Err(SinkError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl RemoteSink for HttpSink {
    async fn add_subdomains(&self, records: &[SubdomainRecord]) -> Result<SinkAck, SinkError> {
        let endpoint = self.endpoint()?;
        let request = AddSubdomainsRequest {
            action: ADD_SUBDOMAINS_ACTION,
            subdomains: records.iter().map(WireRecord::from).collect(),
        };
        let body =
            serde_json::to_vec(&request).map_err(|err| SinkError::Protocol(err.to_string()))?;

        let response = self
            .client
            .post(endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let bytes = Self::read_body(response).await?;

        let parsed: AddSubdomainsResponse =
            serde_json::from_slice(&bytes).map_err(|err| SinkError::Protocol(err.to_string()))?;
        if !parsed.success {
            return Err(SinkError::Rejected(
                parsed.error.unwrap_or_else(|| "unspecified error".to_string()),
            ));
        }
        let added = parsed
            .added
            .ok_or_else(|| SinkError::Protocol("success without `added`".to_string()))?;
        Ok(SinkAck {
            added,
            total_requested: parsed.total_requested.unwrap_or(records.len()),
            timestamp: parsed.timestamp,
        })
    }

    async fn health(&self) -> Result<SinkHealth, SinkError> {
        let endpoint = self.endpoint()?;
        let response = self
            .client
            .get(endpoint.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let bytes = Self::read_body(response).await?;
        serde_json::from_slice(&bytes).map_err(|err| SinkError::Protocol(err.to_string()))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> SinkError {
    if err.is_timeout() {
        SinkError::Timeout
    } else {
        SinkError::Transport(err.to_string())
    }
}

pub(crate) mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
