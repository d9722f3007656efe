use crate::codec::json::Json;
use crate::codec::{ContentType, Encodes};
use crate::debug::DebugLevel;
use crate::error::BuildError;
use crate::transport::OutgoingRequest;
use crate::types::UrlPath;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::Method;
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// Turns a call description into a concrete request. Called once per attempt.
pub trait Endpoint: Send + Sync + 'static {
    fn build_request(&self) -> Result<OutgoingRequest, BuildError>;

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn debug_level(&self) -> Option<DebugLevel> {
        None
    }
}

impl Endpoint for OutgoingRequest {
    fn build_request(&self) -> Result<OutgoingRequest, BuildError> {
        Ok(self.clone())
    }
}

pub(crate) fn is_idempotent(m: &Method) -> bool {
    matches!(
        *m,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS
    )
}

#[derive(Clone, Debug)]
enum RouteBody {
    Empty,
    Encoded {
        bytes: Bytes,
        content_type: &'static str,
    },
    /// Encoding failed while the route was assembled; reported by `build_request`.
    Failed(String),
}

/// Stock [`Endpoint`]: base URL, path, query, headers and an optional body.
#[derive(Clone, Debug)]
pub struct Route {
    method: Method,
    base: String,
    path: UrlPath,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: RouteBody,
    timeout: Option<Duration>,
    idempotent: Option<bool>,
    debug_level: Option<DebugLevel>,
}

impl Route {
    /// An empty `base` builds to [`BuildError::MissingUrl`].
    pub fn new(method: Method, base: impl Into<String>) -> Self {
        Self {
            method,
            base: base.into(),
            path: UrlPath::default(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RouteBody::Empty,
            timeout: None,
            idempotent: None,
            debug_level: None,
        }
    }

    pub fn get(base: impl Into<String>) -> Self {
        Self::new(Method::GET, base)
    }

    pub fn post(base: impl Into<String>) -> Self {
        Self::new(Method::POST, base)
    }

    pub fn put(base: impl Into<String>) -> Self {
        Self::new(Method::PUT, base)
    }

    pub fn delete(base: impl Into<String>) -> Self {
        Self::new(Method::DELETE, base)
    }

    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Trusted path literal, may contain `/`.
    pub fn path(mut self, piece: &str) -> Self {
        self.path.push_raw(piece);
        self
    }

    /// Caller-provided value, encoded as exactly one path segment.
    pub fn segment(mut self, value: impl std::fmt::Display) -> Self {
        self.path.push_segment_encoded(&value.to_string());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json<T: Serialize>(self, value: &T) -> Self {
        self.body_with::<Json, T>(value)
    }

    pub fn body_with<C, T>(mut self, value: &T) -> Self
    where
        C: Encodes<T>,
    {
        self.body = match C::encode(value) {
            Ok(bytes) => RouteBody::Encoded {
                bytes,
                content_type: <C as ContentType>::CONTENT_TYPE,
            },
            Err(e) => RouteBody::Failed(e.to_string()),
        };
        self
    }

    /// Raw payload; `content_type` may be empty to send no `Content-Type`.
    pub fn raw(mut self, bytes: impl Into<Bytes>, content_type: &'static str) -> Self {
        self.body = RouteBody::Encoded {
            bytes: bytes.into(),
            content_type,
        };
        self
    }

    pub fn timeout(mut self, d: Duration) -> Self {
        self.timeout = Some(d);
        self
    }

    /// Overrides the method-derived idempotency hint handed to retriers.
    pub fn idempotent(mut self, v: bool) -> Self {
        self.idempotent = Some(v);
        self
    }

    pub fn with_debug_level(mut self, level: DebugLevel) -> Self {
        self.debug_level = Some(level);
        self
    }

    fn url(&self) -> Result<Url, BuildError> {
        let base = self.base.trim();
        if base.is_empty() {
            return Err(BuildError::MissingUrl);
        }
        let mut url = Url::parse(base)?;
        let mut path = UrlPath::new();
        path.push_raw(url.path());
        path.push_raw(self.path.as_str());
        url.set_path(path.as_str());
        if !self.query.is_empty() {
            let mut qp = url.query_pairs_mut();
            for (k, v) in self.query.iter() {
                qp.append_pair(k, v);
            }
        }
        Ok(url)
    }
}

impl Endpoint for Route {
    fn build_request(&self) -> Result<OutgoingRequest, BuildError> {
        let mut req = OutgoingRequest::new(self.method.clone(), self.url()?);
        req.meta.idempotent = self
            .idempotent
            .unwrap_or_else(|| is_idempotent(&self.method));
        req.timeout = self.timeout;

        for (name, value) in self.headers.iter() {
            let invalid = || BuildError::InvalidHeader { name: name.clone() };
            let n = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let v = HeaderValue::from_str(value).map_err(|_| invalid())?;
            req.headers.append(n, v);
        }

        match &self.body {
            RouteBody::Empty => {}
            RouteBody::Encoded {
                bytes,
                content_type,
            } => {
                if !content_type.is_empty() && !req.headers.contains_key(CONTENT_TYPE) {
                    req.headers
                        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
                }
                req.body = Some(bytes.clone());
            }
            RouteBody::Failed(msg) => return Err(BuildError::encoding(msg.clone())),
        }
        Ok(req)
    }

    fn debug_level(&self) -> Option<DebugLevel> {
        self.debug_level
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::{Format, FormatType};
    use http::header::ACCEPT;

    #[test]
    fn route_joins_base_path_segments_and_query() {
        let req = Route::get("https://api.example.com/v1/")
            .path("users")
            .segment("a b/c")
            .query("page", 2)
            .build_request()
            .unwrap();
        assert_eq!(
            req.url.as_str(),
            "https://api.example.com/v1/users/a%20b%2Fc?page=2"
        );
        assert!(req.meta.idempotent);
        assert_eq!(req.meta.attempt, 0);
    }

    #[test]
    fn json_body_sets_content_type_once() {
        let req = Route::post("https://api.example.com")
            .path("items")
            .json(&serde_json::json!({"name": "x"}))
            .build_request()
            .unwrap();
        assert_eq!(req.headers[CONTENT_TYPE], "application/json");
        assert_eq!(req.body.as_deref(), Some(&b"{\"name\":\"x\"}"[..]));
        assert!(!req.meta.idempotent);

        let req = Route::post("https://api.example.com")
            .header("content-type", "application/vnd.custom+json")
            .json(&1)
            .build_request()
            .unwrap();
        assert_eq!(req.headers[CONTENT_TYPE], "application/vnd.custom+json");
    }

    #[test]
    fn missing_and_invalid_urls_fail_to_build() {
        assert!(matches!(
            Route::get("  ").build_request(),
            Err(BuildError::MissingUrl)
        ));
        assert!(matches!(
            Route::get("not a url").build_request(),
            Err(BuildError::InvalidUrl(_))
        ));
    }

    #[test]
    fn bad_header_names_the_offender() {
        let err = Route::get("https://api.example.com")
            .header("bad header", "v")
            .build_request()
            .unwrap_err();
        match err {
            BuildError::InvalidHeader { name } => assert_eq!(name, "bad header"),
            other => panic!("unexpected error: {other:?}"),
        }
        let ok = Route::get("https://api.example.com")
            .header("accept", "text/plain")
            .build_request()
            .unwrap();
        assert_eq!(ok.headers[ACCEPT], "text/plain");
    }

    struct Refuses;
    impl ContentType for Refuses {
        const CONTENT_TYPE: &'static str = "application/x-refuses";
    }
    impl FormatType for Refuses {
        const FORMAT_TYPE: Format = Format::Text;
    }
    impl Encodes<u8> for Refuses {
        type Error = std::io::Error;
        fn encode(_: &u8) -> Result<Bytes, Self::Error> {
            Err(std::io::Error::other("cannot encode"))
        }
    }

    #[test]
    fn encoding_failure_surfaces_at_build_time() {
        let err = Route::post("https://api.example.com")
            .body_with::<Refuses, u8>(&1)
            .build_request()
            .unwrap_err();
        assert!(matches!(err, BuildError::EncodingFailed(_)));
    }
}
