use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct RequestMeta {
    /// Identity of the logical call; shared by every attempt of one retry loop.
    pub call_id: Uuid,
    pub idempotent: bool,
    /// 1-based once the pipeline owns the request, 0 while the endpoint builds it.
    pub attempt: u32,
}

impl Default for RequestMeta {
    fn default() -> Self {
        Self {
            call_id: Uuid::nil(),
            idempotent: false,
            attempt: 0,
        }
    }
}

/// One concrete attempt. Rebuilt from the endpoint for every attempt.
#[derive(Clone, Debug)]
pub struct OutgoingRequest {
    pub meta: RequestMeta,
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl OutgoingRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            meta: RequestMeta::default(),
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }

    #[inline]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// A response whose body has been read to the end.
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub meta: RequestMeta,
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Body,
    Other,
}

#[derive(Debug)]
pub struct TransportError {
    kind: TransportErrorKind,
    source: crate::error::FxError,
}

impl TransportError {
    #[inline]
    pub fn new(e: impl Into<crate::error::FxError>) -> Self {
        Self::with_kind(TransportErrorKind::Other, e)
    }

    #[inline]
    pub fn with_kind(kind: TransportErrorKind, e: impl Into<crate::error::FxError>) -> Self {
        Self {
            kind,
            source: e.into(),
        }
    }

    #[inline]
    pub fn timeout(e: impl Into<crate::error::FxError>) -> Self {
        Self::with_kind(TransportErrorKind::Timeout, e)
    }

    #[inline]
    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    #[inline]
    pub fn is_timeout(&self) -> bool {
        self.kind == TransportErrorKind::Timeout
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl Error for TransportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.source)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            TransportErrorKind::Timeout
        } else if e.is_connect() {
            TransportErrorKind::Connect
        } else if e.is_body() || e.is_decode() {
            TransportErrorKind::Body
        } else {
            TransportErrorKind::Other
        };
        Self::with_kind(kind, e)
    }
}

pub trait TransportBody: Send + 'static {
    fn next_chunk<'a>(
        &'a mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Bytes>, TransportError>> + Send + 'a>>;
}

pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub content_length: Option<u64>,
    pub body: Box<dyn TransportBody>,
}

/// Receives `(bytes_sent, bytes_total)` while a request body is written.
#[derive(Clone)]
pub struct UploadObserver(Arc<dyn Fn(u64, u64) + Send + Sync>);

impl UploadObserver {
    pub fn new(f: impl Fn(u64, u64) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    #[inline]
    pub fn sent(&self, bytes_sent: u64, bytes_total: u64) {
        (self.0)(bytes_sent, bytes_total)
    }
}

impl fmt::Debug for UploadObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UploadObserver")
    }
}

/// Injectable transport layer.
///
/// Contract:
/// - Must honor `OutgoingRequest` fields (url/headers/body/timeout); an expired
///   timeout is reported as a [`TransportErrorKind::Timeout`] error.
/// - When `upload` is set and the request has a body, reports cumulative bytes
///   sent through it.
/// - Must not leak a concrete HTTP client type in its public surface.
pub trait Transport: Send + Sync + 'static {
    fn send<'a>(
        &'a self,
        req: &'a OutgoingRequest,
        upload: Option<UploadObserver>,
    ) -> Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + 'a>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send<'a>(
        &'a self,
        req: &'a OutgoingRequest,
        upload: Option<UploadObserver>,
    ) -> Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + 'a>> {
        (**self).send(req, upload)
    }
}

pub use reqwest_transport::ReqwestTransport;

mod reqwest_transport {
    use super::*;
    use http::header::CONTENT_LENGTH;

    const UPLOAD_CHUNK: usize = 64 * 1024;

    #[derive(Clone, Default)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        #[inline]
        pub fn new(client: reqwest::Client) -> Self {
            Self { client }
        }

        #[inline]
        pub fn client(&self) -> &reqwest::Client {
            &self.client
        }
    }

    struct ReqwestBody {
        resp: reqwest::Response,
    }

    impl TransportBody for ReqwestBody {
        fn next_chunk<'a>(
            &'a mut self,
        ) -> Pin<Box<dyn Future<Output = Result<Option<Bytes>, TransportError>> + Send + 'a>>
        {
            Box::pin(async move { self.resp.chunk().await.map_err(TransportError::from) })
        }
    }

    fn observed_body(body: Bytes, observer: UploadObserver) -> reqwest::Body {
        let total = body.len() as u64;
        let chunks: Vec<Bytes> = (0..body.len())
            .step_by(UPLOAD_CHUNK)
            .map(|start| body.slice(start..(start + UPLOAD_CHUNK).min(body.len())))
            .collect();
        let mut sent = 0u64;
        let stream = futures_util::stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len() as u64;
            observer.sent(sent, total);
            Ok::<_, std::io::Error>(chunk)
        }));
        reqwest::Body::wrap_stream(stream)
    }

    impl Transport for ReqwestTransport {
        fn send<'a>(
            &'a self,
            req: &'a OutgoingRequest,
            upload: Option<UploadObserver>,
        ) -> Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + 'a>>
        {
            Box::pin(async move {
                let mut rb = self
                    .client
                    .request(req.method.clone(), req.url.clone())
                    .headers(req.headers.clone());
                match (req.body.clone(), upload) {
                    (Some(b), Some(observer)) => {
                        rb = rb
                            .header(CONTENT_LENGTH, b.len())
                            .body(observed_body(b, observer));
                    }
                    (Some(b), None) => rb = rb.body(b),
                    (None, _) => {}
                }
                if let Some(t) = req.timeout {
                    rb = rb.timeout(t);
                }
                let resp = rb.send().await.map_err(TransportError::from)?;
                let status = resp.status();
                let headers = resp.headers().clone();
                let content_length = resp.content_length();
                Ok(TransportResponse {
                    status,
                    headers,
                    content_length,
                    body: Box::new(ReqwestBody { resp }),
                })
            })
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn upload_observer_forwards_counts() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let obs = UploadObserver::new(move |done, total| sink.lock().unwrap().push((done, total)));
        obs.sent(10, 20);
        obs.clone().sent(20, 20);
        assert_eq!(*seen.lock().unwrap(), vec![(10, 20), (20, 20)]);
    }

    #[test]
    fn transport_error_keeps_kind() {
        let e = TransportError::timeout("timed out after 10s");
        assert!(e.is_timeout());
        assert_eq!(e.to_string(), "timed out after 10s");
        assert_eq!(TransportError::new("boom").kind(), TransportErrorKind::Other);
    }
}
