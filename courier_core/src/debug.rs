use crate::codec::{self, Format};
use crate::transport::{RequestMeta, TransportError};
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode};
use serde::Deserialize;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum DebugLevel {
    #[default]
    None = 0,
    V = 1,
    VV = 2,
}

impl DebugLevel {
    #[inline]
    pub fn is_enabled(self) -> bool {
        self != DebugLevel::None
    }

    #[inline]
    pub fn is_verbose(self) -> bool {
        self >= DebugLevel::V
    }

    #[inline]
    pub fn is_very_verbose(self) -> bool {
        self >= DebugLevel::VV
    }
}

impl core::fmt::Display for DebugLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DebugLevel::None => f.write_str("none"),
            DebugLevel::V => f.write_str("v"),
            DebugLevel::VV => f.write_str("vv"),
        }
    }
}

/// Per-attempt request/response tracing.
///
/// The pipeline only calls a method when `dbg` enables it: `V` for the
/// start/status/failure lines, `VV` for headers and bodies.
pub trait DebugSink: Send + Sync + 'static {
    fn request_start(&self, dbg: DebugLevel, meta: &RequestMeta, method: &Method, url: &str);
    fn request_headers(&self, dbg: DebugLevel, headers: &HeaderMap);
    fn request_body(&self, dbg: DebugLevel, body: &Bytes, format: Format, max_chars: usize);

    fn response_status(&self, dbg: DebugLevel, meta: &RequestMeta, status: StatusCode, url: &str);
    fn response_headers(&self, dbg: DebugLevel, headers: &HeaderMap);
    fn response_body(&self, dbg: DebugLevel, headers: &HeaderMap, body: &Bytes, max_chars: usize);

    fn transport_failed(&self, dbg: DebugLevel, meta: &RequestMeta, url: &str, err: &TransportError);
}

#[derive(Default)]
pub struct NoopDebugSink;
impl DebugSink for NoopDebugSink {
    #[inline]
    fn request_start(&self, _: DebugLevel, _: &RequestMeta, _: &Method, _: &str) {}
    #[inline]
    fn request_headers(&self, _: DebugLevel, _: &HeaderMap) {}
    #[inline]
    fn request_body(&self, _: DebugLevel, _: &Bytes, _: Format, _: usize) {}
    #[inline]
    fn response_status(&self, _: DebugLevel, _: &RequestMeta, _: StatusCode, _: &str) {}
    #[inline]
    fn response_headers(&self, _: DebugLevel, _: &HeaderMap) {}
    #[inline]
    fn response_body(&self, _: DebugLevel, _: &HeaderMap, _: &Bytes, _: usize) {}
    #[inline]
    fn transport_failed(&self, _: DebugLevel, _: &RequestMeta, _: &str, _: &TransportError) {}
}

/// Plain lines on stderr, handy in scripts without a subscriber.
pub struct StderrDebugSink;
impl DebugSink for StderrDebugSink {
    fn request_start(&self, dbg: DebugLevel, meta: &RequestMeta, method: &Method, url: &str) {
        if meta.attempt <= 1 {
            eprintln!("[courier:{}] -> {} {} ({})", dbg, method, url, meta.call_id);
        } else {
            eprintln!(
                "[courier:{}] -> {} {} ({}) attempt={}",
                dbg, method, url, meta.call_id, meta.attempt
            );
        }
    }
    fn request_headers(&self, dbg: DebugLevel, headers: &HeaderMap) {
        eprintln!("[courier:{}] request headers:", dbg);
        for (k, v) in headers.iter() {
            eprintln!("  {}: {}", k, header_value_for_debug(k, v));
        }
    }
    fn request_body(&self, dbg: DebugLevel, body: &Bytes, format: Format, max_chars: usize) {
        let preview = codec::format_bytes_for_debug(format, body.as_ref(), max_chars);
        eprintln!("[courier:{}] request body ({} bytes): {}", dbg, body.len(), preview);
    }

    fn response_status(&self, dbg: DebugLevel, meta: &RequestMeta, status: StatusCode, url: &str) {
        let tag = if status.is_success() { "ok" } else { "error" };
        eprintln!(
            "[courier:{}] <- {} {} ({}) ({})",
            dbg,
            status.as_u16(),
            url,
            meta.call_id,
            tag
        );
    }
    fn response_headers(&self, dbg: DebugLevel, headers: &HeaderMap) {
        eprintln!("[courier:{}] response headers:", dbg);
        for (k, v) in headers.iter() {
            eprintln!("  {}: {}", k, header_value_for_debug(k, v));
        }
    }
    fn response_body(&self, dbg: DebugLevel, headers: &HeaderMap, body: &Bytes, max_chars: usize) {
        let preview = codec::format_bytes_for_debug(response_format(headers), body.as_ref(), max_chars);
        eprintln!("[courier:{}] response body ({} bytes): {}", dbg, body.len(), preview);
    }

    fn transport_failed(&self, dbg: DebugLevel, meta: &RequestMeta, url: &str, err: &TransportError) {
        eprintln!(
            "[courier:{}] <- {} ({}) transport {:?}: {}",
            dbg,
            url,
            meta.call_id,
            err.kind(),
            err
        );
    }
}

/// Forwards everything as `tracing` events under the `courier::http` target.
#[derive(Default)]
pub struct TracingDebugSink;
impl DebugSink for TracingDebugSink {
    fn request_start(&self, dbg: DebugLevel, meta: &RequestMeta, method: &Method, url: &str) {
        tracing::debug!(target: "courier::http", %dbg, call = %meta.call_id, attempt = meta.attempt, %method, url, "request");
    }
    fn request_headers(&self, dbg: DebugLevel, headers: &HeaderMap) {
        tracing::trace!(target: "courier::http", %dbg, headers = %headers_for_debug(headers), "request headers");
    }
    fn request_body(&self, dbg: DebugLevel, body: &Bytes, format: Format, max_chars: usize) {
        let preview = codec::format_bytes_for_debug(format, body.as_ref(), max_chars);
        tracing::trace!(target: "courier::http", %dbg, len = body.len(), body = %preview, "request body");
    }

    fn response_status(&self, dbg: DebugLevel, meta: &RequestMeta, status: StatusCode, url: &str) {
        tracing::debug!(target: "courier::http", %dbg, call = %meta.call_id, attempt = meta.attempt, status = status.as_u16(), url, "response");
    }
    fn response_headers(&self, dbg: DebugLevel, headers: &HeaderMap) {
        tracing::trace!(target: "courier::http", %dbg, headers = %headers_for_debug(headers), "response headers");
    }
    fn response_body(&self, dbg: DebugLevel, headers: &HeaderMap, body: &Bytes, max_chars: usize) {
        let preview = codec::format_bytes_for_debug(response_format(headers), body.as_ref(), max_chars);
        tracing::trace!(target: "courier::http", %dbg, len = body.len(), body = %preview, "response body");
    }

    fn transport_failed(&self, dbg: DebugLevel, meta: &RequestMeta, url: &str, err: &TransportError) {
        tracing::debug!(target: "courier::http", %dbg, call = %meta.call_id, attempt = meta.attempt, url, kind = ?err.kind(), error = %err, "transport failure");
    }
}

fn response_format(headers: &HeaderMap) -> Format {
    let ct = headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    codec::format_for_content_type(ct)
}

fn is_sensitive_header_name(name: &HeaderName) -> bool {
    // HeaderName::as_str() is normalized to lowercase.
    let n = name.as_str();
    matches!(n, "authorization" | "proxy-authorization" | "cookie" | "set-cookie")
        || n.contains("token")
        || n.contains("secret")
        || n.contains("api-key")
        || n.contains("apikey")
        || n.ends_with("-key")
}

fn header_value_for_debug(name: &HeaderName, value: &HeaderValue) -> String {
    if value.is_sensitive() || is_sensitive_header_name(name) {
        "<redacted>".to_string()
    } else {
        value.to_str().unwrap_or("<non-utf8>").to_string()
    }
}

fn headers_for_debug(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(k, v)| format!("{}: {}", k, header_value_for_debug(k, v)))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod test {
    use super::*;
    use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, COOKIE};

    #[test]
    fn redacts_sensitive_headers_by_name() {
        assert!(is_sensitive_header_name(&AUTHORIZATION));
        assert!(is_sensitive_header_name(&COOKIE));
        assert!(is_sensitive_header_name(&HeaderName::from_static("x-session-token")));
        assert!(is_sensitive_header_name(&HeaderName::from_static("x-api-key")));
        assert!(!is_sensitive_header_name(&ACCEPT));

        let secret = HeaderValue::from_static("s3cr3t");
        assert_eq!(header_value_for_debug(&AUTHORIZATION, &secret), "<redacted>");
        assert_eq!(
            header_value_for_debug(&ACCEPT, &HeaderValue::from_static("application/json")),
            "application/json"
        );
    }

    #[test]
    fn sensitive_values_are_redacted_under_any_name() {
        let mut v = HeaderValue::from_static("abc");
        v.set_sensitive(true);
        assert_eq!(
            header_value_for_debug(&HeaderName::from_static("x-custom"), &v),
            "<redacted>"
        );
    }

    #[test]
    fn header_line_joins_and_redacts() {
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        h.insert(AUTHORIZATION, HeaderValue::from_static("Bearer x"));
        let line = headers_for_debug(&h);
        assert!(line.contains("content-type: text/plain"));
        assert!(line.contains("authorization: <redacted>"));
    }

    #[test]
    fn response_preview_format_follows_content_type() {
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_static("image/png"));
        assert_eq!(response_format(&h), Format::Binary);
        h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert_eq!(response_format(&h), Format::Text);
    }
}
