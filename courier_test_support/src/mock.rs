use bytes::Bytes;
use courier_core::transport::*;
use http::{HeaderMap, Method, StatusCode};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub meta: RequestMeta,
    pub method: Method,
    pub url: url::Url,
    pub headers: http::HeaderMap,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

#[derive(Clone, Debug)]
pub struct MockReply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Body is handed out in this many chunks.
    pub chunks: usize,
    /// Reported `Content-Length`; the body length when unset.
    pub content_length: Option<Option<u64>>,
    /// Time before the response head arrives.
    pub delay: Option<Duration>,
}

impl MockReply {
    fn with_content_type(status: StatusCode, ct: &'static str, body: Bytes) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::CONTENT_TYPE, http::HeaderValue::from_static(ct));
        Self {
            status,
            headers,
            body,
            chunks: 1,
            content_length: None,
            delay: None,
        }
    }

    pub fn ok_json(body: Bytes) -> Self {
        Self::with_content_type(StatusCode::OK, "application/json", body)
    }

    pub fn ok_text(body: Bytes) -> Self {
        Self::with_content_type(StatusCode::OK, "text/plain", body)
    }

    pub fn json(status: StatusCode, body: Bytes) -> Self {
        Self::with_content_type(status, "application/json", body)
    }

    pub fn ok_bytes(body: Bytes) -> Self {
        Self::with_content_type(StatusCode::OK, "application/octet-stream", body)
    }

    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            chunks: 1,
            content_length: None,
            delay: None,
        }
    }

    pub fn with_header(mut self, name: http::header::HeaderName, value: http::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn in_chunks(mut self, n: usize) -> Self {
        self.chunks = n.max(1);
        self
    }

    pub fn unknown_length(mut self) -> Self {
        self.content_length = Some(None);
        self
    }

    pub fn delayed(mut self, d: Duration) -> Self {
        self.delay = Some(d);
        self
    }
}

#[derive(Clone, Debug)]
enum MockStep {
    Reply(MockReply),
    Fail(TransportErrorKind, String),
}

struct ChunkedBody {
    chunks: VecDeque<Bytes>,
}

impl ChunkedBody {
    fn split(body: Bytes, n: usize) -> Self {
        let mut chunks = VecDeque::new();
        if body.is_empty() {
            return Self { chunks };
        }
        let size = body.len().div_ceil(n);
        let mut start = 0;
        while start < body.len() {
            let end = (start + size).min(body.len());
            chunks.push_back(body.slice(start..end));
            start = end;
        }
        Self { chunks }
    }
}

impl TransportBody for ChunkedBody {
    fn next_chunk<'a>(
        &'a mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Bytes>, TransportError>> + Send + 'a>> {
        Box::pin(async move {
            // Give a pending cancellation a chance between chunks.
            tokio::task::yield_now().await;
            Ok(self.chunks.pop_front())
        })
    }
}

#[derive(Debug)]
struct MockState {
    recorded: Mutex<Vec<RecordedRequest>>,
    steps: Mutex<VecDeque<MockStep>>,
    upload_chunk: usize,
}

#[derive(Clone)]
pub struct MockTransport {
    st: Arc<MockState>,
}

pub struct MockHandle {
    st: Arc<MockState>,
    finished: bool,
}

pub struct MockBuilder {
    steps: Vec<MockStep>,
    upload_chunk: usize,
}

impl Default for MockBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBuilder {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            upload_chunk: 16 * 1024,
        }
    }

    pub fn reply(mut self, r: MockReply) -> Self {
        self.steps.push(MockStep::Reply(r));
        self
    }

    pub fn replies(mut self, rs: impl IntoIterator<Item = MockReply>) -> Self {
        self.steps.extend(rs.into_iter().map(MockStep::Reply));
        self
    }

    /// Scripted transport-level failure (no response at all).
    pub fn fail(mut self, kind: TransportErrorKind, msg: impl Into<String>) -> Self {
        self.steps.push(MockStep::Fail(kind, msg.into()));
        self
    }

    /// Upload progress granularity for request bodies.
    pub fn upload_chunk(mut self, bytes: usize) -> Self {
        self.upload_chunk = bytes.max(1);
        self
    }

    pub fn build(self) -> (MockTransport, MockHandle) {
        let st = Arc::new(MockState {
            recorded: Mutex::new(Vec::new()),
            steps: Mutex::new(self.steps.into_iter().collect()),
            upload_chunk: self.upload_chunk,
        });
        (
            MockTransport { st: st.clone() },
            MockHandle {
                st,
                finished: false,
            },
        )
    }
}

pub fn mock() -> MockBuilder {
    MockBuilder::new()
}

impl MockHandle {
    pub fn recorded(&self) -> Vec<RecordedRequest> {
        self.st.recorded.lock().unwrap().clone()
    }

    pub fn recorded_len(&self) -> usize {
        self.st.recorded.lock().unwrap().len()
    }

    pub fn assert_recorded_len(&self, expected: usize) {
        let got = self.recorded_len();
        if got != expected {
            let reqs = self.recorded();
            panic!(
                "recorded request count mismatch\n  expected: {expected}\n  got: {got}\n  recorded:\n{:#?}",
                reqs
            );
        }
    }

    pub fn remaining_replies(&self) -> usize {
        self.st.steps.lock().unwrap().len()
    }

    pub fn assert_no_remaining_replies(&self) {
        let left = self.remaining_replies();
        if left != 0 {
            panic!("mock replies not fully consumed: remaining={left}");
        }
    }

    pub fn finish(mut self) {
        self.assert_no_remaining_replies();
        self.finished = true;
    }

    /// Drop without checking that every scripted step was consumed.
    pub fn forget(mut self) {
        self.finished = true;
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if std::thread::panicking() {
            return;
        }
        let left = self.st.steps.lock().unwrap().len();
        if left != 0 {
            panic!("mock replies not fully consumed (drop): remaining={left}");
        }
    }
}

fn report_upload(body: &Bytes, chunk: usize, observer: &UploadObserver) {
    let total = body.len() as u64;
    let mut sent = 0u64;
    for piece in body.chunks(chunk) {
        sent += piece.len() as u64;
        observer.sent(sent, total);
    }
}

impl Transport for MockTransport {
    fn send<'a>(
        &'a self,
        req: &'a OutgoingRequest,
        upload: Option<UploadObserver>,
    ) -> Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + 'a>> {
        let st = self.st.clone();
        Box::pin(async move {
            st.recorded.lock().unwrap().push(RecordedRequest {
                meta: req.meta.clone(),
                method: req.method.clone(),
                url: req.url.clone(),
                headers: req.headers.clone(),
                body: req.body.clone(),
                timeout: req.timeout,
            });

            let step = {
                let mut g = st.steps.lock().unwrap();
                g.pop_front().unwrap_or_else(|| {
                    let last = st.recorded.lock().unwrap().last().cloned();
                    panic!(
                        "MockTransport: no more scripted replies, but send() was called.\nlast_request={:#?}",
                        last
                    );
                })
            };

            if let (Some(body), Some(observer)) = (req.body.as_ref(), upload.as_ref()) {
                report_upload(body, st.upload_chunk, observer);
            }

            let reply = match step {
                MockStep::Reply(r) => r,
                MockStep::Fail(kind, msg) => return Err(TransportError::with_kind(kind, msg)),
            };

            if let Some(delay) = reply.delay {
                match req.timeout {
                    Some(t) if t < delay => {
                        tokio::time::sleep(t).await;
                        return Err(TransportError::timeout(format!(
                            "mock reply delayed {delay:?}, timeout {t:?}"
                        )));
                    }
                    _ => tokio::time::sleep(delay).await,
                }
            }

            let content_length = reply
                .content_length
                .unwrap_or(Some(reply.body.len() as u64));
            Ok(TransportResponse {
                status: reply.status,
                headers: reply.headers,
                content_length,
                body: Box::new(ChunkedBody::split(reply.body, reply.chunks)),
            })
        })
    }
}
