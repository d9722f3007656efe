use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD as B64;
use http::HeaderMap;
use std::error::Error;
use thiserror::Error;

use crate::cache::CacheError;
use crate::classify::ResponseFailure;
use crate::transport::TransportError;

pub type FxError = Box<dyn Error + Send + Sync>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CourierError {
    #[error("build request: {0}")]
    Build(#[from] BuildError),

    #[error("adapter rejected request: {0}")]
    Adapter(FxError),

    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("response: {0}")]
    Response(ResponseFailure),

    #[error("decode error: {source}")]
    Decode { source: FxError, body: String },

    #[error("encode error: {0}")]
    Encode(FxError),

    #[error("retrier aborted after attempt {attempt}: {source}")]
    Retrier { attempt: u32, source: FxError },

    #[error("cancelled")]
    Cancelled,

    #[error("multipart boundary {boundary:?} occurs inside field {field:?}")]
    BoundaryCollision { boundary: String, field: String },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache: {0}")]
    Cache(#[from] CacheError),
}

/// Failures while turning an endpoint into an [`OutgoingRequest`](crate::transport::OutgoingRequest).
///
/// Always terminal: the retry loop never sees them.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BuildError {
    #[error("url is missing")]
    MissingUrl,

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to encode parameters: {0}")]
    EncodingFailed(FxError),

    #[error("invalid header {name:?}")]
    InvalidHeader { name: String },
}

impl CourierError {
    pub fn adapter(error: impl Into<FxError>) -> CourierError {
        CourierError::Adapter(error.into())
    }

    pub fn encode(error: impl Into<FxError>) -> CourierError {
        CourierError::Encode(error.into())
    }

    #[inline]
    pub fn response_failure(&self) -> Option<&ResponseFailure> {
        match self {
            CourierError::Response(f) => Some(f),
            _ => None,
        }
    }
}

impl BuildError {
    pub fn encoding(error: impl Into<FxError>) -> BuildError {
        BuildError::EncodingFailed(error.into())
    }
}

pub fn body_as_text(headers: &HeaderMap, body: &bytes::Bytes, full_len: Option<usize>) -> String {
    const MAX: usize = 8 * 1024;
    let ct = headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let slice = if body.len() > MAX {
        &body[..MAX]
    } else {
        &body[..]
    };
    let total_len = full_len.unwrap_or(body.len());
    if ct.starts_with("application/json") || ct.starts_with("text/") || ct.is_empty() {
        match std::str::from_utf8(slice) {
            Ok(s) => {
                if total_len > slice.len() {
                    format!("{}...", s)
                } else {
                    s.to_owned()
                }
            }
            Err(_) => format!("<non-utf8-text; {} bytes>", slice.len()),
        }
    } else {
        let b64 = B64.encode(slice);
        format!(
            "<non-text; {} bytes; base64:{}{}>",
            total_len,
            &b64[..b64.len().min(1024)],
            if b64.len() > 1024 { "..." } else { "" }
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;
    use http::HeaderValue;
    use http::header::CONTENT_TYPE;

    #[test]
    fn body_preview_is_text_for_json_and_base64_for_binary() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let s = body_as_text(&headers, &Bytes::from_static(b"{\"a\":1}"), None);
        assert_eq!(s, "{\"a\":1}");

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("image/png"));
        let s = body_as_text(&headers, &Bytes::from_static(&[0, 1, 2]), None);
        assert_eq!(s, "<non-text; 3 bytes; base64:AAEC>");
    }

    #[test]
    fn error_messages_name_the_failing_stage() {
        assert_eq!(
            CourierError::Build(BuildError::MissingUrl).to_string(),
            "build request: url is missing"
        );
        assert_eq!(
            CourierError::adapter("nope").to_string(),
            "adapter rejected request: nope"
        );
    }
}
