//! HTTP binding of the transport contract.
//!
//! Talks JSON to the sync relay. Device identity travels in the
//! `X-Device-ID` header; the session's bearer token is attached when
//! present. The base URL is configurable so tests can point at a local
//! mock server.

use crate::error::{SyncError, SyncResult};
use crate::session::SessionProvider;
use crate::transport::{RegistrationInfo, RegistrationReceipt, SyncTransport, UploadReceipt};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use slate_types::{CrdtKey, DeviceId, EntityKind, SyncMessageDto};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Base URL of the sync relay (e.g. `https://sync.slate.app`).
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sync.slate.app".to_string(),
            timeout_secs: 30,
        }
    }
}

/// The relay's upload response envelope.
#[derive(Debug, Deserialize)]
struct UploadEnvelope {
    code: i32,
    #[serde(default)]
    message: String,
    data: Option<UploadData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadData {
    accepted_count: usize,
    #[serde(default)]
    rejected_keys: Vec<CrdtKey>,
}

/// HTTP client for the sync relay.
pub struct HttpTransport {
    config: HttpTransportConfig,
    client: Client,
    session: Option<Arc<dyn SessionProvider>>,
}

impl HttpTransport {
    /// Creates a transport for the given relay.
    pub fn new(config: HttpTransportConfig) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SyncError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            client,
            session: None,
        })
    }

    /// Attaches a session provider whose token is sent as a bearer header.
    #[must_use]
    pub fn with_session(mut self, session: Arc<dyn SessionProvider>) -> Self {
        self.session = Some(session);
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn decorate(&self, builder: RequestBuilder, device_id: &DeviceId) -> RequestBuilder {
        let builder = builder.header("X-Device-ID", device_id.as_str());
        match self.session.as_ref().and_then(|s| s.auth_token()) {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check(response: reqwest::Response) -> SyncResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SyncError::from_status(status.as_u16(), body))
    }

    async fn download(&self, device_id: &DeviceId, path: &str) -> SyncResult<Vec<SyncMessageDto>> {
        let response = self
            .decorate(self.client.get(self.url(path)), device_id)
            .send()
            .await
            .map_err(request_error)?;
        let messages: Vec<SyncMessageDto> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| SyncError::Protocol(format!("invalid download body: {e}")))?;
        debug!("downloaded {} messages from {path}", messages.len());
        Ok(messages)
    }
}

#[async_trait]
impl SyncTransport for HttpTransport {
    async fn register(
        &self,
        device_id: &DeviceId,
        info: &RegistrationInfo,
    ) -> SyncResult<RegistrationReceipt> {
        let response = self
            .decorate(self.client.post(self.url("/sync/device/register")), device_id)
            .json(info)
            .send()
            .await
            .map_err(request_error)?;
        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| SyncError::Protocol(format!("invalid register body: {e}")))
    }

    async fn upload(
        &self,
        device_id: &DeviceId,
        kind: EntityKind,
        messages: &[SyncMessageDto],
    ) -> SyncResult<UploadReceipt> {
        let path = format!("/sync/messages/{kind}");
        let response = self
            .decorate(self.client.post(self.url(&path)), device_id)
            .json(messages)
            .send()
            .await
            .map_err(request_error)?;
        let envelope: UploadEnvelope = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| SyncError::Protocol(format!("invalid upload body: {e}")))?;

        if envelope.code != 0 {
            return Err(SyncError::Rejected(format!(
                "relay code {}: {}",
                envelope.code, envelope.message
            )));
        }
        let data = envelope
            .data
            .ok_or_else(|| SyncError::Protocol("upload response missing data".to_string()))?;
        Ok(UploadReceipt {
            accepted_count: data.accepted_count,
            rejected_keys: data.rejected_keys,
        })
    }

    async fn download_all(
        &self,
        device_id: &DeviceId,
        exclude_origin: bool,
    ) -> SyncResult<Vec<SyncMessageDto>> {
        let path = if exclude_origin {
            "/sync/messages/all/exclude-origin"
        } else {
            "/sync/messages/all"
        };
        self.download(device_id, path).await
    }

    async fn download_by_kind(
        &self,
        device_id: &DeviceId,
        kind: EntityKind,
        exclude_origin: bool,
    ) -> SyncResult<Vec<SyncMessageDto>> {
        let path = if exclude_origin {
            format!("/sync/messages/{kind}/exclude-origin")
        } else {
            format!("/sync/messages/{kind}")
        };
        self.download(device_id, &path).await
    }
}

fn request_error(err: reqwest::Error) -> SyncError {
    if err.is_timeout() || err.is_connect() {
        SyncError::Network(err.to_string())
    } else if let Some(status) = err.status() {
        SyncError::from_status(status.as_u16(), err.to_string())
    } else {
        SyncError::Network(err.to_string())
    }
}
