//! The single access point to the shipping API.
//!
//! [`Gateway`] attaches tenant headers, decodes the response envelope, classifies failures
//! and retries network errors and 5xx responses with linear backoff. The wire itself sits
//! behind the [`Transport`] trait so tests can script responses.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Url};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::GatewayError;
use crate::models::{ApiEnvelope, EnvelopeStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
        }
    }
}

/// A file attached to a multipart upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// Sent as multipart form data under the `file` field
    File(UploadFile),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Whatever came back over the wire, before envelope decoding
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Moves one request over the wire. `Err` means no response was received at all.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> std::result::Result<RawResponse, String>;
}

pub struct ReqwestTransport {
    http_client: HttpClient,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> std::result::Result<RawResponse, String> {
        let mut builder = match request.method {
            Method::Get => self.http_client.get(&request.url),
            Method::Post => self.http_client.post(&request.url),
            Method::Patch => self.http_client.patch(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.body(value.to_string()),
            RequestBody::File(file) => {
                let part = reqwest::multipart::Part::bytes(file.bytes.clone())
                    .file_name(file.file_name.clone())
                    .mime_str(&file.mime_type)
                    .map_err(|err| format!("invalid upload MIME type: {}", err))?;
                builder.multipart(reqwest::multipart::Form::new().part("file", part))
            }
        };

        let response = builder.send().await.map_err(|err| err.to_string())?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|err| err.to_string())?;

        Ok(RawResponse { status, body })
    }
}

/// Joins `segments` into an API path ending in `/`. Every segment is percent-encoded, so an
/// identifier such as a tracking code can never address a different endpoint.
pub fn resource_path(segments: &[&str]) -> std::result::Result<String, GatewayError> {
    if let Some(segment) = segments.iter().find(|s| matches!(s.trim(), "" | "." | "..")) {
        return Err(GatewayError::InvalidRequest {
            reason: format!("{:?} is not a valid path segment", segment),
        });
    }

    let mut url = Url::parse("http://localhost/").map_err(|err| GatewayError::InvalidRequest {
        reason: err.to_string(),
    })?;
    url.path_segments_mut()
        .map_err(|_| GatewayError::InvalidRequest {
            reason: "URL cannot carry a path".to_string(),
        })?
        .clear()
        .extend(segments)
        .push("");

    Ok(url.path().to_string())
}

/// Longest single wait between two attempts.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Bounded linear backoff: retry `n` waits `n * base_delay`, at most [`MAX_RETRY_DELAY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay
            .checked_mul(retry)
            .map_or(MAX_RETRY_DELAY, |delay| delay.min(MAX_RETRY_DELAY))
    }
}

pub struct Gateway {
    base_url: String,
    api_key: String,
    tenant_id: String,
    retry: RetryPolicy,
    transport: Box<dyn Transport>,
}

impl Gateway {
    pub fn new(config: &Config) -> Result<Self> {
        let transport = ReqwestTransport::new(config.http_timeout)?;
        Ok(Self::with_transport(config, Box::new(transport)))
    }

    pub fn with_transport(config: &Config, transport: Box<dyn Transport>) -> Self {
        Self {
            base_url: config.api_base_url.clone(),
            api_key: config.api_key.clone(),
            tenant_id: config.tenant_id.clone(),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                base_delay: config.retry_delay,
            },
            transport,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> std::result::Result<ApiEnvelope<T>, GatewayError> {
        let request = self.build(Method::Get, path, RequestBody::Empty);
        self.execute(request).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<ApiEnvelope<T>, GatewayError> {
        let request = self.build(Method::Post, path, json_body(body)?);
        self.execute(request).await
    }

    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<ApiEnvelope<T>, GatewayError> {
        let request = self.build(Method::Patch, path, json_body(body)?);
        self.execute(request).await
    }

    /// Multipart upload. Never retried: a failed upload is left to the user to repeat.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        file: UploadFile,
    ) -> std::result::Result<ApiEnvelope<T>, GatewayError> {
        let request = self.build(Method::Post, path, RequestBody::File(file));
        self.attempt(&request).await
    }

    fn build(&self, method: Method, path: &str, body: RequestBody) -> ApiRequest {
        let mut headers = vec![
            ("X-API-KEY".to_string(), self.api_key.clone()),
            ("X-TENANT-ID".to_string(), self.tenant_id.clone()),
        ];

        // multipart boundaries are set by the transport
        if !matches!(body, RequestBody::File(_)) {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        ApiRequest {
            method,
            url: format!("{}{}", self.base_url, path),
            headers,
            body,
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> std::result::Result<ApiEnvelope<T>, GatewayError> {
        let mut retries = 0;

        loop {
            match self.attempt(&request).await {
                Ok(envelope) => return Ok(envelope),
                Err(err) if err.is_retryable() && retries < self.retry.max_retries => {
                    retries += 1;
                    let delay = self.retry.delay_for(retries);
                    warn!(
                        method = request.method.as_str(),
                        url = %request.url,
                        retry = retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying request"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> std::result::Result<ApiEnvelope<T>, GatewayError> {
        debug!(method = request.method.as_str(), url = %request.url, "sending request");

        let response = self
            .transport
            .send(request)
            .await
            .map_err(GatewayError::Network)?;

        decode(response)
    }
}

#[derive(Deserialize)]
struct RawEnvelope {
    status: EnvelopeStatus,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<String>,
}

fn json_body<B: Serialize + ?Sized>(body: &B) -> std::result::Result<RequestBody, GatewayError> {
    serde_json::to_value(body)
        .map(RequestBody::Json)
        .map_err(|err| GatewayError::InvalidResponse {
            reason: format!("failed to encode request body: {}", err),
        })
}

fn decode<T: DeserializeOwned>(
    response: RawResponse,
) -> std::result::Result<ApiEnvelope<T>, GatewayError> {
    let status = response.status;
    let parsed: Option<Value> = serde_json::from_str(&response.body).ok();

    if !(200..300).contains(&status) {
        let body = parsed.unwrap_or(Value::Null);
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .filter(|message| !message.is_empty())
            .unwrap_or("An error occurred")
            .to_string();
        let code = body.get("code").and_then(Value::as_str).map(str::to_string);
        let data = body.get("data").filter(|data| !data.is_null()).cloned();

        return Err(GatewayError::from_status(status, code, message, data));
    }

    let body = parsed.ok_or_else(|| GatewayError::InvalidResponse {
        reason: format!("HTTP {} response is not JSON", status),
    })?;

    let envelope: RawEnvelope =
        serde_json::from_value(body).map_err(|err| GatewayError::InvalidResponse {
            reason: format!("malformed envelope: {}", err),
        })?;

    if envelope.status == EnvelopeStatus::Error {
        let message = if envelope.message.is_empty() {
            "An error occurred".to_string()
        } else {
            envelope.message
        };
        let data = Some(envelope.data).filter(|data| !data.is_null());
        return Err(GatewayError::Client {
            status,
            code: envelope.code,
            message,
            data,
        });
    }

    let data = serde_json::from_value(envelope.data).map_err(|err| {
        GatewayError::InvalidResponse {
            reason: format!("unexpected data shape: {}", err),
        }
    })?;

    Ok(ApiEnvelope {
        status: envelope.status,
        data,
        message: envelope.message,
        code: envelope.code,
    })
}
