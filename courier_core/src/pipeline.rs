use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_TYPE, HeaderValue, IF_RANGE, RANGE};
use http::{HeaderMap, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use crate::adapter::Adapter;
use crate::classify::{ResponseOutcome, classify};
use crate::codec::json::Json;
use crate::codec::{self, Decodes};
use crate::config::{DEFAULT_TIMEOUT_MS, PipelineConfig};
use crate::debug::{DebugLevel, DebugSink, TracingDebugSink};
use crate::endpoint::Endpoint;
use crate::error::{BuildError, CourierError, body_as_text};
use crate::multipart::{MultipartEncoder, MultipartForm};
use crate::policy::{Policy, ensure_accept};
use crate::request::{CallHandle, PendingCall};
use crate::retry::{Retrier, RetryContext, RetryDecision};
use crate::timeout::TimeoutOverride;
use crate::transfer::{
    Direction, ProgressFn, TransferHandle, TransferId, TransferOutput, TransferResult,
    TransferTracker,
};
use crate::transport::{
    OutgoingRequest, RawResponse, ReqwestTransport, Transport, TransportBody, TransportError,
    UploadObserver,
};

const DEBUG_BODY_MAX_CHARS: usize = 32 * 1024;
const ERROR_PREVIEW_BYTES: usize = 8 * 1024;

/// Per-call knobs carried from [`PendingCall`] into the retry loop.
#[derive(Clone, Debug)]
pub(crate) struct CallOptions {
    pub(crate) call_id: Uuid,
    pub(crate) debug_level: Option<DebugLevel>,
    pub(crate) timeout: TimeoutOverride,
    /// Decoder content type for Accept injection; empty for raw calls.
    pub(crate) accept: &'static str,
}

impl CallOptions {
    pub(crate) fn new(call_id: Uuid) -> Self {
        Self {
            call_id,
            debug_level: None,
            timeout: TimeoutOverride::Inherit,
            accept: "",
        }
    }
}

struct Inner<T> {
    transport: T,
    policy: Policy,
    adapter: Option<Arc<dyn Adapter>>,
    retrier: Option<Arc<dyn Retrier>>,
    debug_level: DebugLevel,
    debug_sink: Arc<dyn DebugSink>,
    transfers: Arc<TransferTracker>,
    last_call: Mutex<Option<CancellationToken>>,
}

/// Executes endpoints through adapt → dispatch → retry, and runs transfers.
///
/// Cheap to clone; clones share transport, policies and transfer registry.
pub struct RequestPipeline<T: Transport = ReqwestTransport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for RequestPipeline<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

pub struct PipelineBuilder<T: Transport> {
    transport: T,
    policy: Policy,
    adapter: Option<Arc<dyn Adapter>>,
    retrier: Option<Arc<dyn Retrier>>,
    debug_level: DebugLevel,
    debug_sink: Arc<dyn DebugSink>,
}

impl<T: Transport> PipelineBuilder<T> {
    /// Replaces the base policy and debug level with the ones in `cfg`.
    pub fn config(mut self, cfg: &PipelineConfig) -> Result<Self, BuildError> {
        self.policy = cfg.to_policy()?;
        self.debug_level = cfg.debug_level;
        Ok(self)
    }

    pub fn policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn adapter(mut self, adapter: impl Adapter) -> Self {
        self.adapter = Some(Arc::new(adapter));
        self
    }

    pub fn retrier(mut self, retrier: impl Retrier) -> Self {
        self.retrier = Some(Arc::new(retrier));
        self
    }

    pub fn debug_level(mut self, level: DebugLevel) -> Self {
        self.debug_level = level;
        self
    }

    pub fn debug_sink(mut self, sink: impl DebugSink) -> Self {
        self.debug_sink = Arc::new(sink);
        self
    }

    pub fn build(self) -> RequestPipeline<T> {
        RequestPipeline {
            inner: Arc::new(Inner {
                transport: self.transport,
                policy: self.policy,
                adapter: self.adapter,
                retrier: self.retrier,
                debug_level: self.debug_level,
                debug_sink: self.debug_sink,
                transfers: Arc::new(TransferTracker::new()),
                last_call: Mutex::new(None),
            }),
        }
    }
}

impl RequestPipeline<ReqwestTransport> {
    pub fn new() -> Self {
        Self::builder(ReqwestTransport::default()).build()
    }

    pub fn with_reqwest_client(client: reqwest::Client) -> Self {
        Self::builder(ReqwestTransport::new(client)).build()
    }
}

impl Default for RequestPipeline<ReqwestTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> RequestPipeline<T> {
    pub fn builder(transport: T) -> PipelineBuilder<T> {
        let mut policy = Policy::new();
        policy.set_timeout(std::time::Duration::from_millis(DEFAULT_TIMEOUT_MS));
        PipelineBuilder {
            transport,
            policy,
            adapter: None,
            retrier: None,
            debug_level: DebugLevel::default(),
            debug_sink: Arc::new(TracingDebugSink),
        }
    }

    pub fn with_transport(transport: T) -> Self {
        Self::builder(transport).build()
    }

    #[inline]
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    #[inline]
    pub fn policy(&self) -> &Policy {
        &self.inner.policy
    }

    #[inline]
    pub fn debug_level(&self) -> DebugLevel {
        self.inner.debug_level
    }

    #[inline]
    pub fn transfers(&self) -> &Arc<TransferTracker> {
        &self.inner.transfers
    }

    #[inline]
    pub fn request<E: Endpoint>(&self, ep: E) -> PendingCall<'_, E, T> {
        PendingCall::new(self, ep)
    }

    /// Raw completion: the last attempt's response, unclassified.
    pub async fn execute<E: Endpoint>(&self, ep: E) -> Result<RawResponse, CourierError> {
        self.request(ep).execute().await
    }

    /// JSON-decoded completion; `Ok(None)` for a 2xx with an empty body.
    pub async fn execute_typed<R, E>(&self, ep: E) -> Result<Option<R>, CourierError>
    where
        R: DeserializeOwned,
        E: Endpoint,
    {
        self.request(ep).decode::<R>().await
    }

    /// Runs the call on the current tokio runtime and reports through `on_complete`.
    pub fn spawn_execute<E, F>(&self, ep: E, on_complete: F) -> CallHandle
    where
        E: Endpoint,
        F: FnOnce(Result<RawResponse, CourierError>) + Send + 'static,
    {
        let this = self.clone();
        let call = self.request(ep);
        let handle = call.handle();
        let (ep, opts, token) = call.into_parts();
        self.remember_call(&token);
        tokio::spawn(async move {
            let res = this.run(&ep, &opts, &token, None).await;
            on_complete(res);
        });
        handle
    }

    pub fn spawn_typed<R, E, F>(&self, ep: E, on_complete: F) -> CallHandle
    where
        R: DeserializeOwned + Send + 'static,
        E: Endpoint,
        F: FnOnce(Result<Option<R>, CourierError>) + Send + 'static,
    {
        let this = self.clone();
        let call = self.request(ep);
        let handle = call.handle();
        let (ep, mut opts, token) = call.into_parts();
        self.remember_call(&token);
        opts.accept = <Json as codec::ContentType>::CONTENT_TYPE;
        tokio::spawn(async move {
            let res = match this.run(&ep, &opts, &token, None).await {
                Ok(raw) => decode_response::<Json, R>(raw),
                Err(e) => Err(e),
            };
            on_complete(res);
        });
        handle
    }

    /// Cancels the most recently started call only. Prefer [`CallHandle`].
    pub fn cancel(&self) {
        let token = self
            .inner
            .last_call
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(token) = token {
            token.cancel();
        }
    }

    pub(crate) fn remember_call(&self, token: &CancellationToken) {
        *self.inner.last_call.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.clone());
    }

    /// The adapt → dispatch → retry loop. Attempts run strictly one after another.
    pub(crate) async fn run<E: Endpoint + ?Sized>(
        &self,
        ep: &E,
        opts: &CallOptions,
        token: &CancellationToken,
        upload: Option<UploadObserver>,
    ) -> Result<RawResponse, CourierError> {
        let dbg = opts
            .debug_level
            .or_else(|| ep.debug_level())
            .unwrap_or(self.inner.debug_level);
        let mut attempt: u32 = 0;

        loop {
            if token.is_cancelled() {
                tracing::debug!(target: "courier::pipeline", call = %opts.call_id, attempt, "call cancelled before attempt");
                return Err(CourierError::Cancelled);
            }
            attempt += 1;

            let req = self.prepare(ep, opts, attempt)?;

            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(CourierError::Cancelled),
                r = self.dispatch(&req, dbg, upload.clone()) => r,
            };

            let Some(retrier) = self.inner.retrier.as_ref() else {
                return outcome.map_err(CourierError::from);
            };

            let decision = {
                let ctx = RetryContext {
                    request: &req,
                    outcome: outcome.as_ref(),
                    attempt,
                };
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(CourierError::Cancelled),
                    d = retrier.decide(ctx) => d,
                }
            };

            match decision {
                RetryDecision::Proceed => return outcome.map_err(CourierError::from),
                RetryDecision::Retry => {
                    tracing::debug!(target: "courier::pipeline", call = %opts.call_id, attempt, "retry requested");
                    continue;
                }
                RetryDecision::Abort(source) => {
                    tracing::debug!(target: "courier::pipeline", call = %opts.call_id, attempt, error = %source, "retrier aborted call");
                    return Err(CourierError::Retrier { attempt, source });
                }
            }
        }
    }

    /// Build, base policy, per-call overrides, adapter. Failures here are terminal.
    fn prepare<E: Endpoint + ?Sized>(
        &self,
        ep: &E,
        opts: &CallOptions,
        attempt: u32,
    ) -> Result<OutgoingRequest, CourierError> {
        let mut req = ep.build_request()?;
        req.meta.call_id = opts.call_id;
        req.meta.attempt = attempt;
        self.inner.policy.apply(&mut req);
        req.timeout = opts.timeout.apply(req.timeout);
        if req.method != Method::HEAD {
            ensure_accept(&mut req.headers, opts.accept);
        }
        match &self.inner.adapter {
            Some(adapter) => adapter.adapt(req).map_err(CourierError::Adapter),
            None => Ok(req),
        }
    }

    async fn dispatch(
        &self,
        req: &OutgoingRequest,
        dbg: DebugLevel,
        upload: Option<UploadObserver>,
    ) -> Result<RawResponse, TransportError> {
        let sink = &self.inner.debug_sink;
        let url = req.url.as_str();
        if dbg.is_verbose() {
            sink.request_start(dbg, &req.meta, &req.method, url);
        }
        if dbg.is_very_verbose() {
            sink.request_headers(dbg, &req.headers);
            if let Some(body) = req.body.as_ref() {
                sink.request_body(dbg, body, request_format(&req.headers), DEBUG_BODY_MAX_CHARS);
            }
        }

        let sent = async {
            let mut resp = self.inner.transport.send(req, upload).await?;
            let body = read_body_all(resp.body.as_mut()).await?;
            Ok::<_, TransportError>((resp.status, resp.headers, body))
        }
        .await;

        let (status, headers, body) = match sent {
            Ok(parts) => parts,
            Err(e) => {
                if dbg.is_verbose() {
                    sink.transport_failed(dbg, &req.meta, url, &e);
                }
                return Err(e);
            }
        };
        if dbg.is_verbose() {
            sink.response_status(dbg, &req.meta, status, url);
        }
        if dbg.is_very_verbose() {
            sink.response_headers(dbg, &headers);
            sink.response_body(dbg, &headers, &body, DEBUG_BODY_MAX_CHARS);
        }
        Ok(RawResponse {
            meta: req.meta.clone(),
            url: req.url.clone(),
            status,
            headers,
            body,
        })
    }

    /// Encodes `form` as the endpoint's body and sends it through the retry loop.
    ///
    /// Encoding and request-building failures are returned here, before
    /// anything is registered; every later outcome goes to `on_complete`
    /// unless the transfer is cancelled first.
    pub fn upload_multipart<R, E, F>(
        &self,
        form: &MultipartForm,
        ep: E,
        on_progress: Option<ProgressFn>,
        on_complete: F,
    ) -> Result<TransferHandle, CourierError>
    where
        R: DeserializeOwned + Send + 'static,
        E: Endpoint,
        F: FnOnce(Result<Option<R>, CourierError>) + Send + 'static,
    {
        let encoded = MultipartEncoder::new().encode(form)?;
        let content_type = HeaderValue::from_str(&encoded.content_type())
            .map_err(|_| BuildError::InvalidHeader {
                name: CONTENT_TYPE.to_string(),
            })?;
        let ep = MultipartBody {
            inner: ep,
            body: encoded.body,
            content_type,
        };
        let url = ep.build_request()?.url;

        let handle = self.inner.transfers.register(
            url,
            Direction::Upload,
            on_progress,
            Box::new(move |res: TransferResult| {
                on_complete(res.and_then(|out| match out {
                    TransferOutput::Uploaded { body, .. } => {
                        decode_body::<Json, R>(&HeaderMap::new(), body)
                    }
                    TransferOutput::Downloaded { .. } => Ok(None),
                }))
            }),
        );

        let id = handle.id();
        let token = handle.token().clone();
        let tracker = Arc::clone(&self.inner.transfers);
        let observer = {
            let tracker = Arc::clone(&tracker);
            let last = AtomicU64::new(0);
            UploadObserver::new(move |sent, total| {
                // A retried attempt starts counting from zero again.
                let prev = last.swap(sent, Ordering::Relaxed);
                let chunk = if sent >= prev { sent - prev } else { sent };
                tracker.progress_chunk(id, sent, Some(total), chunk);
            })
        };
        let mut opts = CallOptions::new(id.as_uuid());
        opts.accept = <Json as codec::ContentType>::CONTENT_TYPE;
        let this = self.clone();

        tokio::spawn(async move {
            let res = match this.run(&ep, &opts, &token, Some(observer)).await {
                Ok(raw) => match classify(raw.status, &raw.headers, &raw.body) {
                    ResponseOutcome::Success(body) => Ok(TransferOutput::Uploaded {
                        status: raw.status,
                        body: body.unwrap_or_default(),
                    }),
                    ResponseOutcome::Failure(f) => Err(CourierError::Response(f)),
                },
                Err(CourierError::Cancelled) => return,
                Err(e) => Err(e),
            };
            tracker.complete(id, res);
        });
        Ok(handle)
    }

    /// Streams `url` into `destination`, resuming from `resume` when the server
    /// honours the range. Attempt timeouts are not applied: a long body is not
    /// a stalled one.
    pub fn download<F>(
        &self,
        url: Url,
        resume: Option<ResumeData>,
        destination: impl Into<PathBuf>,
        on_progress: Option<ProgressFn>,
        on_complete: F,
    ) -> TransferHandle
    where
        F: FnOnce(TransferResult) + Send + 'static,
    {
        let destination = destination.into();
        let handle = self.inner.transfers.register(
            url.clone(),
            Direction::Download,
            on_progress,
            Box::new(on_complete),
        );
        let id = handle.id();
        let token = handle.token().clone();
        let this = self.clone();
        tokio::spawn(async move {
            let res = this.download_to(id, url, resume, &destination, &token).await;
            if matches!(res, Err(CourierError::Cancelled)) {
                tracing::debug!(target: "courier::transfer", %id, path = %destination.display(), "download cancelled, partial file kept");
                return;
            }
            this.inner.transfers.complete(id, res);
        });
        handle
    }

    async fn download_to(
        &self,
        id: TransferId,
        url: Url,
        resume: Option<ResumeData>,
        destination: &Path,
        token: &CancellationToken,
    ) -> TransferResult {
        let mut req = OutgoingRequest::new(Method::GET, url);
        req.meta.call_id = id.as_uuid();
        req.meta.attempt = 1;
        req.meta.idempotent = true;
        self.inner.policy.apply(&mut req);
        req.timeout = None;

        let offset = resume.as_ref().map(|r| r.offset).unwrap_or(0);
        if let Some(r) = resume.as_ref().filter(|r| r.offset > 0) {
            req.headers.insert(RANGE, r.range_header()?);
            if let Some(etag) = r.etag.as_deref() {
                let v = HeaderValue::from_str(etag).map_err(|_| BuildError::InvalidHeader {
                    name: IF_RANGE.to_string(),
                })?;
                req.headers.insert(IF_RANGE, v);
            }
        }
        let req = match &self.inner.adapter {
            Some(adapter) => adapter.adapt(req).map_err(CourierError::Adapter)?,
            None => req,
        };

        let dbg = self.inner.debug_level;
        if dbg.is_verbose() {
            self.inner
                .debug_sink
                .request_start(dbg, &req.meta, &req.method, req.url.as_str());
        }
        let mut resp = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(CourierError::Cancelled),
            r = self.inner.transport.send(&req, None) => r?,
        };
        if dbg.is_verbose() {
            self.inner
                .debug_sink
                .response_status(dbg, &req.meta, resp.status, req.url.as_str());
        }

        let append = resp.status == StatusCode::PARTIAL_CONTENT && offset > 0;
        if !resp.status.is_success() {
            let preview = read_body_preview(resp.body.as_mut(), ERROR_PREVIEW_BYTES).await?;
            if let ResponseOutcome::Failure(f) = classify(resp.status, &resp.headers, &preview) {
                return Err(CourierError::Response(f));
            }
        }

        let mut file = if append {
            tokio::fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(destination)
                .await?
        } else {
            tokio::fs::File::create(destination).await?
        };
        let mut done = if append { offset } else { 0 };
        let total = resp.content_length.map(|len| len + done);

        loop {
            let chunk = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    file.flush().await?;
                    return Err(CourierError::Cancelled);
                }
                c = resp.body.next_chunk() => c?,
            };
            let Some(chunk) = chunk else { break };
            file.write_all(&chunk).await?;
            done += chunk.len() as u64;
            self.inner
                .transfers
                .progress_chunk(id, done, total, chunk.len() as u64);
        }
        file.flush().await?;
        file.sync_all().await?;

        Ok(TransferOutput::Downloaded {
            path: destination.to_path_buf(),
            bytes: done,
        })
    }
}

/// Where to pick a download back up.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResumeData {
    /// Bytes already on disk.
    pub offset: u64,
    /// Validator sent as `If-Range`; without it the server may resend the whole body.
    pub etag: Option<String>,
}

impl ResumeData {
    pub fn new(offset: u64) -> Self {
        Self { offset, etag: None }
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Offset taken from a partially written file; `None` when nothing is on disk yet.
    pub async fn for_partial_file(path: impl AsRef<Path>) -> std::io::Result<Option<Self>> {
        match tokio::fs::metadata(path).await {
            Ok(m) if m.len() > 0 => Ok(Some(Self::new(m.len()))),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn range_header(&self) -> Result<HeaderValue, BuildError> {
        HeaderValue::from_str(&format!("bytes={}-", self.offset)).map_err(|_| {
            BuildError::InvalidHeader {
                name: RANGE.to_string(),
            }
        })
    }
}

/// Wraps an endpoint so every attempt carries the encoded multipart body.
struct MultipartBody<E> {
    inner: E,
    body: Bytes,
    content_type: HeaderValue,
}

impl<E: Endpoint> Endpoint for MultipartBody<E> {
    fn build_request(&self) -> Result<OutgoingRequest, BuildError> {
        let mut req = self.inner.build_request()?;
        req.headers.insert(CONTENT_TYPE, self.content_type.clone());
        req.body = Some(self.body.clone());
        Ok(req)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn debug_level(&self) -> Option<DebugLevel> {
        self.inner.debug_level()
    }
}

/// Classify, then decode a success body with `C`.
pub(crate) fn decode_response<C, R>(raw: RawResponse) -> Result<Option<R>, CourierError>
where
    C: Decodes<R>,
{
    match classify(raw.status, &raw.headers, &raw.body) {
        ResponseOutcome::Success(None) => Ok(None),
        ResponseOutcome::Success(Some(body)) => decode_body::<C, R>(&raw.headers, body),
        ResponseOutcome::Failure(f) => Err(CourierError::Response(f)),
    }
}

fn decode_body<C, R>(headers: &HeaderMap, body: Bytes) -> Result<Option<R>, CourierError>
where
    C: Decodes<R>,
{
    if body.is_empty() {
        return Ok(None);
    }
    C::decode(&body)
        .map(Some)
        .map_err(|e| CourierError::Decode {
            source: e.into(),
            body: body_as_text(headers, &body, Some(body.len())),
        })
}

fn request_format(headers: &HeaderMap) -> codec::Format {
    let ct = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    codec::format_for_content_type(ct)
}

async fn read_body_preview(
    body: &mut dyn TransportBody,
    max: usize,
) -> Result<Bytes, TransportError> {
    let mut buf = BytesMut::with_capacity(max.min(8 * 1024));
    while buf.len() < max {
        match body.next_chunk().await? {
            Some(chunk) => {
                let remaining = max - buf.len();
                if chunk.len() <= remaining {
                    buf.extend_from_slice(&chunk);
                } else {
                    buf.extend_from_slice(&chunk[..remaining]);
                    break;
                }
            }
            None => break,
        }
    }
    Ok(buf.freeze())
}

async fn read_body_all(body: &mut dyn TransportBody) -> Result<Bytes, TransportError> {
    let mut buf = BytesMut::with_capacity(8 * 1024);
    while let Some(chunk) = body.next_chunk().await? {
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::text::Text;

    fn raw(status: u16, body: &'static [u8]) -> RawResponse {
        RawResponse {
            meta: Default::default(),
            url: Url::parse("https://api.example.com/").unwrap(),
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::from_static(body),
        }
    }

    #[test]
    fn decode_response_maps_outcomes() {
        let v: Option<String> = decode_response::<Text, String>(raw(200, b"hi")).unwrap();
        assert_eq!(v.as_deref(), Some("hi"));

        let v: Option<String> = decode_response::<Text, String>(raw(204, b"")).unwrap();
        assert!(v.is_none());

        let err = decode_response::<Text, String>(raw(500, b"")).unwrap_err();
        assert!(err.response_failure().is_some());
    }

    #[test]
    fn decode_failure_is_terminal_and_keeps_body() {
        let err = decode_response::<Json, Vec<u32>>(raw(200, b"{oops")).unwrap_err();
        match err {
            CourierError::Decode { body, .. } => assert_eq!(body, "{oops"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn range_header_is_open_ended() {
        let r = ResumeData::new(1024).with_etag("\"v1\"");
        assert_eq!(r.range_header().unwrap(), "bytes=1024-");
        assert_eq!(r.etag.as_deref(), Some("\"v1\""));
    }

    #[tokio::test]
    async fn partial_file_resume_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part.bin");
        assert_eq!(ResumeData::for_partial_file(&path).await.unwrap(), None);
        tokio::fs::write(&path, b"").await.unwrap();
        assert_eq!(ResumeData::for_partial_file(&path).await.unwrap(), None);
        tokio::fs::write(&path, b"12345").await.unwrap();
        assert_eq!(
            ResumeData::for_partial_file(&path).await.unwrap(),
            Some(ResumeData::new(5))
        );
    }
}
