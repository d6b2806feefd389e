use crate::services::relay::RelayStream;

#[derive(Debug, Clone)]
pub struct MediaRequest {
    pub resource_path: String,
    /// Raw `Range` header value, forwarded untouched.
    pub range_header: Option<String>,
}

/// Upstream response reduced to what the client is allowed to see.
pub struct StreamedResponse {
    pub status: u16,
    pub content_type: String,
    pub content_length: Option<String>,
    pub content_range: Option<String>,
    pub body: RelayStream,
}
