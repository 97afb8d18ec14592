use super::api::{ApiRequest, Credentials, api_url, encode_body};
use super::error::{SabError, SabResult};
use super::http_errors::HttpErrorInfo;
use super::response::{QueueData, QueueEnvelope, VersionInfo, api_error};
use crate::profile::ProfileValues;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Network timeouts for the shared HTTP client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Whole-request timeout; `None` waits indefinitely
    pub request: Option<Duration>,
    pub connect: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request: Some(Duration::from_secs(60)),
            connect: Duration::from_secs(10),
        }
    }
}

/// Build the reqwest client shared by every profile
pub fn build_http_client(timeouts: Timeouts) -> SabResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("sabremote/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(timeouts.connect)
        .pool_max_idle_per_host(2);
    if let Some(request) = timeouts.request {
        builder = builder.timeout(request);
    }
    Ok(builder.build()?)
}

/// Client bound to one profile's endpoint and credentials
#[derive(Clone)]
pub struct SabClient {
    http: reqwest::Client,
    endpoint: Url,
    credentials: Credentials,
}

impl std::fmt::Debug for SabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SabClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl SabClient {
    pub fn new(http: reqwest::Client, profile: &ProfileValues) -> SabResult<Self> {
        Ok(Self {
            http,
            endpoint: api_url(&profile.url)?,
            credentials: Credentials::from(profile),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// POST one request and return the decoded body.
    ///
    /// JSON bodies are checked for a truthy `error` field. Plain-text bodies are
    /// returned as a string unless they start with `error`.
    pub async fn call(&self, request: &ApiRequest) -> SabResult<Value> {
        let body = encode_body(&self.credentials, request);
        tracing::debug!("POST {} ({})", self.endpoint, request.label());

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            )
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let info = HttpErrorInfo::from_status(status.as_u16());
            tracing::warn!("{} request failed: {}", request.label(), info.format());
            return Err(SabError::Http(info));
        }

        let text = response.text().await?;
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => {
                if let Some(message) = api_error(&value) {
                    tracing::warn!("{} rejected by server: {}", request.label(), message);
                    return Err(SabError::Api(message));
                }
                Ok(value)
            }
            Err(e) if request.expects_json() => Err(SabError::Decode(e)),
            Err(_) => {
                let trimmed = text.trim();
                match trimmed.strip_prefix("error:") {
                    Some(message) => Err(SabError::Api(message.trim().to_string())),
                    None => Ok(Value::String(trimmed.to_string())),
                }
            }
        }
    }

    async fn call_unit(&self, request: ApiRequest) -> SabResult<()> {
        self.call(&request).await.map(|_| ())
    }

    pub async fn fetch_queue(&self) -> SabResult<QueueData> {
        let value = self.call(&ApiRequest::Queue).await?;
        let envelope: QueueEnvelope = serde_json::from_value(value)?;
        Ok(envelope.queue)
    }

    pub async fn version(&self) -> SabResult<String> {
        let value = self.call(&ApiRequest::Version).await?;
        let info: VersionInfo = serde_json::from_value(value)?;
        Ok(info.version)
    }

    pub async fn add_url(
        &self,
        url: &str,
        nzbname: Option<String>,
        category: Option<String>,
    ) -> SabResult<Value> {
        self.call(&ApiRequest::AddUrl {
            url: url.to_string(),
            nzbname,
            category,
        })
        .await
    }

    pub async fn pause_item(&self, nzo_id: &str) -> SabResult<()> {
        self.call_unit(ApiRequest::PauseItem(nzo_id.to_string())).await
    }

    pub async fn resume_item(&self, nzo_id: &str) -> SabResult<()> {
        self.call_unit(ApiRequest::ResumeItem(nzo_id.to_string())).await
    }

    pub async fn delete_item(&self, nzo_id: &str) -> SabResult<()> {
        self.call_unit(ApiRequest::DeleteItem(nzo_id.to_string())).await
    }

    pub async fn move_item(&self, nzo_id: &str, position: usize) -> SabResult<()> {
        self.call_unit(ApiRequest::MoveItem {
            nzo_id: nzo_id.to_string(),
            position,
        })
        .await
    }

    pub async fn set_speed_limit(&self, speed: &str) -> SabResult<()> {
        self.call_unit(ApiRequest::SpeedLimit(speed.to_string())).await
    }

    /// Pause the whole queue; `Some(n)` with n > 0 pauses for n minutes
    pub async fn pause_queue(&self, minutes: Option<u32>) -> SabResult<()> {
        match minutes {
            Some(m) if m > 0 => self.call_unit(ApiRequest::PauseFor(m)).await,
            _ => self.call_unit(ApiRequest::Pause).await,
        }
    }

    pub async fn resume_queue(&self) -> SabResult<()> {
        self.call_unit(ApiRequest::Resume).await
    }
}
