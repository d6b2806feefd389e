use crate::error::AppError;
use crate::models::media::MediaRequest;
use crate::services::media::MediaProxy;
use futures::StreamExt;
use ntex::http::header::{self, HeaderValue};
use ntex::http::StatusCode;
use ntex::util::Bytes;
use ntex::web::{self, HttpRequest, HttpResponse};
use std::sync::Arc;

pub async fn stream_media(
    proxy: web::types::State<Arc<MediaProxy>>,
    path: web::types::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let request = MediaRequest {
        resource_path: path.into_inner(),
        range_header: req
            .headers()
            .get(header::RANGE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
    };

    let upstream = proxy.stream_resource(&request).await?;

    let status = StatusCode::from_u16(upstream.status)
        .map_err(|_| AppError::Upstream(format!("invalid status {}", upstream.status)))?;
    let mut response = HttpResponse::build(status);
    response
        .header(header::CONTENT_TYPE, upstream.content_type)
        .header(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    if let Some(range) = upstream.content_range {
        response.header(header::CONTENT_RANGE, range);
    }
    if let Some(length) = upstream.content_length {
        // Known length: send it as-is instead of re-chunking the relay
        response.header(header::CONTENT_LENGTH, length).no_chunking();
    }

    let body = upstream.body.map(|chunk| chunk.map(into_ntex_bytes));
    Ok(response.streaming(body))
}

/// Hands the chunk's allocation over when reqwest holds the only reference;
/// a chunk sharing a read buffer is copied once.
fn into_ntex_bytes(chunk: bytes::Bytes) -> Bytes {
    Bytes::from(Vec::<u8>::from(chunk))
}
