//! Client for the remote upload server.
//!
//! The server accepts one reading (and optionally the path of an image the
//! device has archived) per request:
//!
//! ```text
//! POST {server_url}/api/upload-image
//! {"temperature": 22.5, "humidity": 55.0, "imagePath": "images/image_20250307_100000.jpg", "machineId": "AgroX-37"}
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::validate_server_url;

/// Path of the upload endpoint on the remote server.
pub const UPLOAD_PATH: &str = "/api/upload-image";

/// Errors from the remote upload server.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The configured server URL is unusable.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The server is not reachable.
    #[error("Upload server not reachable at {url}: {source}")]
    NotReachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("Upload server returned {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The server answered 2xx but reported `success: false`.
    #[error("Upload failed: {0}")]
    Failed(String),

    /// The response body was not the expected JSON.
    #[error("Invalid response from upload server: {0}")]
    InvalidResponse(#[source] reqwest::Error),

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// No response within the upload timeout.
    #[error("Upload timed out after {0:?}")]
    Timeout(Duration),
}

/// Body of an upload request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub temperature: f32,
    pub humidity: f32,
    /// Archive-relative image path, e.g. `images/image_20250307_100000.jpg`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    pub machine_id: String,
}

/// What the server reports back for an accepted upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReceipt {
    pub message: Option<String>,
    /// Where the server published the image, if one was sent.
    pub image_url: Option<String>,
    /// Server-side timestamp, passed through as sent.
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServerResponse {
    #[serde(default)]
    success: bool,
    message: Option<String>,
    error: Option<String>,
    data: Option<ServerData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerData {
    image_url: Option<String>,
    timestamp: Option<String>,
}

/// Sends readings to the remote server.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Send one upload to the server at `server_url`.
    async fn send(
        &self,
        server_url: &str,
        request: &UploadRequest,
    ) -> Result<UploadReceipt, UploadError>;
}

/// [`Uploader`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpUploader {
    client: Client,
    timeout: Duration,
}

impl HttpUploader {
    /// Create an uploader whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, UploadError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(UploadError::Client)?;
        Ok(Self { client, timeout })
    }

    /// Create an uploader with a custom reqwest Client.
    pub fn with_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Full endpoint URL for `server_url`.
pub fn upload_url(server_url: &str) -> Result<String, UploadError> {
    let base = server_url.trim_end_matches('/');
    validate_server_url(base).map_err(UploadError::InvalidUrl)?;
    Ok(format!("{base}{UPLOAD_PATH}"))
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn send(
        &self,
        server_url: &str,
        request: &UploadRequest,
    ) -> Result<UploadReceipt, UploadError> {
        let url = upload_url(server_url)?;
        debug!("Uploading reading to {}", url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UploadError::Timeout(self.timeout)
                } else {
                    UploadError::NotReachable {
                        url: url.clone(),
                        source: e,
                    }
                }
            })?;

        handle_response(response).await
    }
}

async fn handle_response(response: reqwest::Response) -> Result<UploadReceipt, UploadError> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| {
                ["error", "message"]
                    .iter()
                    .find_map(|key| v.get(key).and_then(|e| e.as_str()).map(String::from))
            })
            .unwrap_or_else(|| status.to_string());
        return Err(UploadError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    let body: ServerResponse = response
        .json()
        .await
        .map_err(UploadError::InvalidResponse)?;
    if !body.success {
        return Err(UploadError::Failed(
            body.error
                .or(body.message)
                .unwrap_or_else(|| "Unknown error".to_string()),
        ));
    }

    let (image_url, timestamp) = body
        .data
        .map(|d| (d.image_url, d.timestamp))
        .unwrap_or_default();
    Ok(UploadReceipt {
        message: body.message,
        image_url,
        timestamp,
    })
}
