//! Remote API client
//!
//! Implements both [`MediaUploader`] and [`RecordClient`] against the
//! FieldSync HTTP endpoints:
//!
//! - `POST {base}/media` (multipart `file`, `owner_id`, `attachment_id`)
//! - `POST {base}/records` (multipart `data` JSON field)
//! - `DELETE {base}/records/{remote_id}`
//!
//! POSTs are sent once and carry the `Idempotency-Key` header; the server
//! dedupes replays across drains. DELETE goes through the retrying path.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use fieldsync_core::{CreateRecordRequest, MediaUploadRequest, MediaUploader, RecordClient};
use fieldsync_domain::constants::IDEMPOTENCY_KEY_HEADER;
use fieldsync_domain::{FieldSyncError, RemoteConfig, RemoteError};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::http::HttpClient;

const USER_AGENT: &str = concat!("fieldsync/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaUploaded {
    remote_ref: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordCreated {
    remote_id: String,
}

/// Which endpoint produced a status; 408/429 map differently per endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Media,
    Records,
}

/// HTTP implementation of the remote ports.
#[derive(Clone)]
pub struct RemoteApiClient {
    http: HttpClient,
    base_url: Url,
}

impl RemoteApiClient {
    /// Build a client from the `remote` configuration section.
    pub fn new(config: &RemoteConfig) -> Result<Self, FieldSyncError> {
        let base_url = parse_base_url(&config.base_url)?;

        let mut headers = HeaderMap::new();
        if let Some(token) = config.api_token.as_deref().filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| FieldSyncError::Config("remote.api_token contains invalid characters".into()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        info!(base_url = %base_url, "remote api client configured");
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::Local(format!("base url {} cannot hold a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl MediaUploader for RemoteApiClient {
    #[instrument(skip(self, request), fields(owner_id = %request.owner_id, attachment_id = %request.attachment_id))]
    async fn upload_media(&self, request: &MediaUploadRequest) -> Result<String, RemoteError> {
        let bytes = tokio::fs::read(&request.local_ref).await.map_err(|err| {
            warn!(local_ref = %request.local_ref, error = %err, "media file unreadable");
            RemoteError::Local(format!("cannot read {}: {err}", request.local_ref))
        })?;

        let file_name = Path::new(&request.local_ref)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| request.attachment_id.clone());

        let mut part = Part::bytes(bytes).file_name(file_name);
        if let Some(mime) = request.mime_type.as_deref() {
            part = part
                .mime_str(mime)
                .map_err(|err| RemoteError::Local(format!("invalid mime type {mime}: {err}")))?;
        }

        let form = Form::new()
            .text("owner_id", request.owner_id.clone())
            .text("attachment_id", request.attachment_id.clone())
            .part("file", part);

        let url = self.endpoint(&["media"])?;
        debug!(url = %url, size_bytes = request.size_bytes, "uploading media");

        let builder = self
            .http
            .request(Method::POST, url)
            .header(IDEMPOTENCY_KEY_HEADER, request.attempt_id.as_str())
            .multipart(form);

        let response = self.http.send_once(builder).await.map_err(transport_failure)?;
        let body: MediaUploaded = read_json(response, Endpoint::Media).await?;

        debug!(remote_ref = %body.remote_ref, "media uploaded");
        Ok(body.remote_ref)
    }
}

#[async_trait]
impl RecordClient for RemoteApiClient {
    #[instrument(skip(self, request), fields(record_id = %request.record_id))]
    async fn create_record(&self, request: &CreateRecordRequest) -> Result<String, RemoteError> {
        let media: Vec<_> = request
            .media
            .iter()
            .map(|m| json!({ "attachmentId": m.attachment_id, "remoteRef": m.remote_ref }))
            .collect();
        let data = json!({
            "recordId": request.record_id,
            "payload": request.payload,
            "media": media,
        });
        let data = serde_json::to_string(&data)
            .map_err(|err| RemoteError::Local(format!("cannot encode record payload: {err}")))?;

        let part = Part::text(data)
            .mime_str("application/json")
            .map_err(|err| RemoteError::Local(err.to_string()))?;
        let form = Form::new().part("data", part);

        let url = self.endpoint(&["records"])?;
        let builder = self
            .http
            .request(Method::POST, url)
            .header(IDEMPOTENCY_KEY_HEADER, request.idempotency_key.as_str())
            .multipart(form);

        let response = self.http.send_once(builder).await.map_err(transport_failure)?;
        let body: RecordCreated = read_json(response, Endpoint::Records).await?;

        info!(remote_id = %body.remote_id, "remote record created");
        Ok(body.remote_id)
    }

    #[instrument(skip(self))]
    async fn delete_record(&self, remote_id: &str) -> Result<(), RemoteError> {
        let url = self.endpoint(&["records", remote_id])?;
        let response = self
            .http
            .send(self.http.request(Method::DELETE, url))
            .await
            .map_err(transport_failure)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response, Endpoint::Records).await);
        }

        info!("remote record deleted");
        Ok(())
    }
}

fn parse_base_url(raw: &str) -> Result<Url, FieldSyncError> {
    let url = Url::parse(raw.trim())
        .map_err(|err| FieldSyncError::Config(format!("remote.base_url {raw:?} is invalid: {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FieldSyncError::Config(format!(
            "remote.base_url must use http or https, got {other}"
        ))),
    }
}

/// HTTP client failures never reach the server; network ones are retryable.
fn transport_failure(err: FieldSyncError) -> RemoteError {
    match err {
        FieldSyncError::Network(message) => RemoteError::UploadFailed(message),
        other => RemoteError::Local(other.to_string()),
    }
}

async fn read_json<T>(response: Response, endpoint: Endpoint) -> Result<T, RemoteError>
where
    T: for<'de> Deserialize<'de>,
{
    let status = response.status();
    if !status.is_success() {
        return Err(status_error(status, response, endpoint).await);
    }

    response.json::<T>().await.map_err(|err| RemoteError::Server {
        status: status.as_u16(),
        message: format!("unreadable response body: {err}"),
    })
}

async fn status_error(status: StatusCode, response: Response, endpoint: Endpoint) -> RemoteError {
    let body = response.text().await.unwrap_or_default();
    let message = if body.is_empty() {
        status.canonical_reason().unwrap_or("no reason").to_string()
    } else {
        body
    };
    let error = classify_status(status, message, endpoint);
    warn!(status = status.as_u16(), kind = %error.kind(), "remote call failed");
    error
}

fn classify_status(status: StatusCode, message: String, endpoint: Endpoint) -> RemoteError {
    let code = status.as_u16();
    let transient = status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::TOO_MANY_REQUESTS;

    match (transient, endpoint) {
        (true, Endpoint::Media) => RemoteError::UploadFailed(format!("{code}: {message}")),
        (true, Endpoint::Records) => RemoteError::Server { status: code, message },
        (false, _) if status.is_client_error() => RemoteError::Rejected { status: code, message },
        _ => RemoteError::Server { status: code, message },
    }
}
