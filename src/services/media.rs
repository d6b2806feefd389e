//! Range-aware passthrough of media files from the upstream media server.
//!
//! Range syntax is never interpreted here: the client's `Range` header goes
//! upstream verbatim and upstream's status and `Content-Range` come back
//! verbatim. The body is relayed chunk by chunk through [`relay::pipe`].

use std::time::Duration;

use reqwest::header::{HeaderName, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE};
use reqwest::{Client, Response};
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::media::{MediaRequest, StreamedResponse};
use crate::services::relay;
use crate::validation;

pub const DEFAULT_CONTENT_TYPE: &str = "video/mp4";

pub struct MediaProxy {
    client: Client,
    base_url: String,
    token: Option<String>,
    header_timeout: Duration,
    buffer_chunks: usize,
}

impl MediaProxy {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        header_timeout: Duration,
        buffer_chunks: usize,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .connect_timeout(header_timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(MediaProxy {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            header_timeout,
            buffer_chunks,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Self::new(
            config.media_server_url.clone(),
            config.media_server_token.clone(),
            config.upstream_timeout,
            config.relay_buffer_chunks,
        )
    }

    pub fn token_configured(&self) -> bool {
        self.token.is_some()
    }

    /// Issues exactly one upstream request and hands back its status,
    /// headers and a streaming body. 5xx and transport failures become
    /// [`AppError::Upstream`]; everything below 500 passes through.
    pub async fn stream_resource(&self, req: &MediaRequest) -> Result<StreamedResponse, AppError> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| AppError::Configuration("Media server token not configured".into()))?;
        let path = validation::normalize_resource_path(&req.resource_path)?;

        debug!(path = %path, range = ?req.range_header, "Fetching from upstream");

        let mut upstream = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(&[("token", token)]);
        if let Some(range) = &req.range_header {
            upstream = upstream.header(RANGE, range);
        }

        let response = match tokio::time::timeout(self.header_timeout, upstream.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                // Drop the URL so the token never reaches logs or clients
                let e = e.without_url();
                warn!(path = %path, error = %e, "Upstream request failed");
                return Err(AppError::Upstream(e.to_string()));
            }
            Err(_) => {
                warn!(path = %path, timeout = ?self.header_timeout, "Upstream timed out");
                return Err(AppError::Upstream(format!(
                    "no response from media server within {}s",
                    self.header_timeout.as_secs_f32()
                )));
            }
        };

        let status = response.status();
        if status.is_server_error() {
            warn!(path = %path, status = status.as_u16(), "Upstream server error");
            return Err(AppError::Upstream(format!(
                "media server responded with {}",
                status
            )));
        }

        Ok(self.relay(response))
    }

    fn relay(&self, response: Response) -> StreamedResponse {
        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };

        StreamedResponse {
            status: response.status().as_u16(),
            content_type: header(CONTENT_TYPE).unwrap_or_else(|| DEFAULT_CONTENT_TYPE.into()),
            content_length: header(CONTENT_LENGTH),
            content_range: header(CONTENT_RANGE),
            body: relay::pipe(response.bytes_stream(), self.buffer_chunks),
        }
    }
}
